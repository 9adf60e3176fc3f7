//! Ordered collection of operations plus prerequisite resolution and
//! topological sort (§4.2, §4.3, §4.4).

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{Error, Result};
use crate::fs_backend::FileSystem;
use crate::operation::{ExecContext, Operation};
use crate::prereq::PrerequisiteResolver;

#[derive(Default)]
pub struct Pipeline {
    ops: Vec<Box<dyn Operation>>,
    ids: HashSet<String>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline {
            ops: Vec::new(),
            ids: HashSet::new(),
        }
    }

    pub fn push(&mut self, op: Box<dyn Operation>) -> Result<()> {
        if !self.ids.insert(op.id().to_string()) {
            return Err(Error::Dependency(format!("duplicate operation id {}", op.id())));
        }
        self.ops.push(op);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn operations(&self) -> &[Box<dyn Operation>] {
        &self.ops
    }

    /// Walk every operation's declared prerequisites and insert a
    /// synthesized operation ahead of it for each one the resolver can
    /// satisfy automatically, deduplicated by `(kind, path)` within this
    /// pass so two siblings needing the same missing parent directory
    /// share one synthesized `create_directory`.
    pub fn resolve_prerequisites(&mut self, resolver: &PrerequisiteResolver, fs: &dyn FileSystem) -> Result<()> {
        let mut seen: HashSet<(&'static str, std::path::PathBuf)> = HashSet::new();
        let mut prefix: Vec<Box<dyn Operation>> = Vec::new();
        let mut dependency_edges: Vec<(String, String)> = Vec::new();

        for op in &self.ops {
            for prereq in op.prerequisites() {
                if !resolver.can_resolve(&prereq) {
                    continue;
                }
                let (tag, path) = prereq.dedup_key();
                let key = (tag, path.to_path_buf());
                if seen.contains(&key) {
                    continue;
                }
                if let Some(synthesized) = resolver
                    .resolve(&prereq, fs)
                    .map_err(|e| Error::filesystem(op.id(), path, e))?
                {
                    seen.insert(key);
                    dependency_edges.push((op.id().to_string(), synthesized.id().to_string()));
                    prefix.push(synthesized);
                }
            }
        }

        for (dependent_id, dependency_id) in dependency_edges {
            if let Some(dependent) = self.ops.iter_mut().find(|o| o.id() == dependent_id) {
                dependent.add_dependency(dependency_id);
            }
        }

        for op in prefix.into_iter().rev() {
            self.ids.insert(op.id().to_string());
            self.ops.insert(0, op);
        }
        Ok(())
    }

    /// Kahn's algorithm over the dependency graph, breaking ties by
    /// original insertion order so output is deterministic for batches
    /// with no ordering constraints (§4.4).
    pub fn resolve(&mut self) -> Result<()> {
        let order = topological_order(&self.ops)?;
        let mut by_id: HashMap<String, Box<dyn Operation>> =
            std::mem::take(&mut self.ops).into_iter().map(|op| (op.id().to_string(), op)).collect();
        self.ops = order
            .into_iter()
            .map(|id| by_id.remove(&id).expect("id present"))
            .collect();
        Ok(())
    }

    /// Run every operation's `validate` in dependency order, stopping at
    /// the first failure (§4.1 validation policy). Structural only —
    /// existence/conflict prerequisites are left to `execute`, since an
    /// earlier batch member may still create what a later one needs.
    pub fn validate(&self, ctx: &ExecContext, fs: &dyn FileSystem) -> Result<()> {
        for op in &self.ops {
            op.validate(ctx, fs)?;
        }
        Ok(())
    }
}

fn topological_order(ops: &[Box<dyn Operation>]) -> Result<Vec<String>> {
    let index_of: HashMap<&str, usize> = ops.iter().enumerate().map(|(i, op)| (op.id(), i)).collect();
    let mut in_degree: Vec<usize> = vec![0; ops.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); ops.len()];

    for (i, op) in ops.iter().enumerate() {
        for dep in op.dependencies() {
            let Some(&dep_idx) = index_of.get(dep.as_str()) else {
                return Err(Error::Dependency(format!(
                    "operation {} depends on unknown operation {}",
                    op.id(),
                    dep
                )));
            };
            dependents[dep_idx].push(i);
            in_degree[i] += 1;
        }
    }

    let mut queue: VecDeque<usize> = (0..ops.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(ops.len());

    while let Some(idx) = queue.pop_front() {
        order.push(ops[idx].id().to_string());
        for &next in &dependents[idx] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if order.len() != ops.len() {
        let stuck: Vec<&str> = (0..ops.len())
            .filter(|&i| in_degree[i] > 0)
            .map(|i| ops[i].id())
            .collect();
        return Err(Error::Dependency(format!(
            "dependency cycle detected among operations: {}",
            stuck.join(", ")
        )));
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::FsItem;
    use crate::operation::{CreateDirectoryOp, CreateFileOp};

    #[test]
    fn topological_sort_respects_dependencies() {
        let mut a = CreateDirectoryOp::new("a", "/d").with_item(FsItem::directory("/d"));
        let b = CreateFileOp::new("b", "/d/f").with_item(FsItem::file("/d/f", b"x".to_vec()));
        a.add_dependency("b".to_string());
        let mut pipeline = Pipeline::new();
        pipeline.push(Box::new(b)).unwrap();
        pipeline.push(Box::new(a)).unwrap();
        pipeline.resolve().unwrap();
        let ids: Vec<&str> = pipeline.operations().iter().map(|o| o.id()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn cycle_is_rejected() {
        let mut a = CreateDirectoryOp::new("a", "/d").with_item(FsItem::directory("/d"));
        let mut b = CreateDirectoryOp::new("b", "/e").with_item(FsItem::directory("/e"));
        a.add_dependency("b".to_string());
        b.add_dependency("a".to_string());
        let mut pipeline = Pipeline::new();
        pipeline.push(Box::new(a)).unwrap();
        pipeline.push(Box::new(b)).unwrap();
        let err = pipeline.resolve().unwrap_err();
        assert!(matches!(err, Error::Dependency(_)));
    }
}
