use criterion::{black_box, criterion_group, criterion_main, Criterion};

use synthfs::factory::OperationFactory;
use synthfs::fs_backend::MemoryFileSystem;
use synthfs::operation::ExecContext;
use synthfs::pipeline::Pipeline;
use synthfs::prereq::PrerequisiteResolver;

fn build_pipeline(n: usize) -> (Pipeline, MemoryFileSystem) {
    let fs = MemoryFileSystem::new();
    fs.seed_dir("/batch", 0o755);
    let factory = OperationFactory::new();
    let mut pipeline = Pipeline::new();
    for i in 0..n {
        let path = format!("/batch/file_{i}.txt");
        let op = factory.create_file(path, b"payload".to_vec(), 0o644);
        pipeline.push(op).unwrap();
    }
    let resolver = PrerequisiteResolver::new(&factory);
    pipeline.resolve_prerequisites(&resolver, &fs).unwrap();
    (pipeline, fs)
}

fn bench_resolve(c: &mut Criterion) {
    c.bench_function("pipeline_resolve_1000", |b| {
        b.iter(|| {
            let (mut pipeline, _fs) = build_pipeline(1000);
            pipeline.resolve().unwrap();
            black_box(pipeline.len());
        })
    });
}

fn bench_validate(c: &mut Criterion) {
    let (mut pipeline, fs) = build_pipeline(1000);
    pipeline.resolve().unwrap();
    let ctx = ExecContext::new("bench");
    c.bench_function("pipeline_validate_1000", |b| {
        b.iter(|| {
            pipeline.validate(&ctx, &fs).unwrap();
        })
    });
}

criterion_group!(benches, bench_resolve, bench_validate);
criterion_main!(benches);
