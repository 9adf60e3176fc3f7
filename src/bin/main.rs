//! `synthfs`: CLI entry point. Subcommands stage operations into a
//! persisted pending batch (mirroring the teacher's `bk add` / `bk run`
//! job-staging split); `run` drains the pending batch against the real
//! filesystem and reports the result.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use synthfs::config::{ArchiveFormatConfig, CliConfig};
use synthfs::executor::BatchResult;
use synthfs::fs_backend::LocalFileSystem;
use synthfs::item::ArchiveFormat;
use synthfs::Batch;

#[derive(Parser)]
#[command(name = "synthfs", version, about = "Transactional filesystem batch executor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stage a create-file operation.
    AddFile {
        path: PathBuf,
        /// File whose contents are copied into the staged content.
        #[arg(long)]
        from: PathBuf,
        #[arg(long, default_value_t = 0o644)]
        mode: u32,
    },
    /// Stage a create-directory operation.
    AddDir {
        path: PathBuf,
        #[arg(long, default_value_t = 0o755)]
        mode: u32,
    },
    /// Stage a create-symlink operation.
    AddSymlink { path: PathBuf, target: String },
    /// Stage a create-archive operation.
    Archive {
        path: PathBuf,
        #[arg(value_enum)]
        format: CliArchiveFormat,
        sources: Vec<PathBuf>,
    },
    /// Stage an unarchive operation.
    Unarchive {
        archive_path: PathBuf,
        extract_path: PathBuf,
        #[arg(short, long, value_delimiter = ',')]
        patterns: Option<Vec<String>>,
    },
    /// Stage a copy operation.
    Copy { src: PathBuf, dst: PathBuf },
    /// Stage a move operation.
    Mv { src: PathBuf, dst: PathBuf },
    /// Stage a delete operation.
    Delete { path: PathBuf },
    /// Execute and clear the staged batch.
    Run {
        /// Compute backups so the batch can be undone afterward. Defaults
        /// to the persisted config's `default_restorable` when omitted.
        #[arg(long)]
        restorable: bool,
        /// Defaults to the persisted config's `default_budget_mb` when
        /// omitted.
        #[arg(long)]
        max_backup_mb: Option<f64>,
        /// Print the run summary as JSON instead of the human-readable form.
        #[arg(long)]
        json: bool,
    },
    /// Print the currently staged batch without running it.
    List,
    /// Discard the currently staged batch.
    Clear,
    /// Inspect or update the persisted CLI defaults.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the currently persisted defaults.
    Show,
    /// Update one or more persisted defaults; unset flags are left as-is.
    Set {
        #[arg(long)]
        budget_mb: Option<f64>,
        #[arg(long)]
        restorable: Option<bool>,
        #[arg(long, value_enum)]
        archive_format: Option<CliArchiveFormat>,
    },
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum CliArchiveFormat {
    TarGz,
    Zip,
}

impl From<CliArchiveFormat> for ArchiveFormat {
    fn from(value: CliArchiveFormat) -> Self {
        match value {
            CliArchiveFormat::TarGz => ArchiveFormat::TarGz,
            CliArchiveFormat::Zip => ArchiveFormat::Zip,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum PendingOp {
    CreateFile { path: PathBuf, from: PathBuf, mode: u32 },
    CreateDir { path: PathBuf, mode: u32 },
    CreateSymlink { path: PathBuf, target: String },
    Archive { path: PathBuf, format: PendingArchiveFormat, sources: Vec<PathBuf> },
    Unarchive { archive_path: PathBuf, extract_path: PathBuf, patterns: Option<Vec<String>> },
    Copy { src: PathBuf, dst: PathBuf },
    Move { src: PathBuf, dst: PathBuf },
    Delete { path: PathBuf },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum PendingArchiveFormat {
    TarGz,
    Zip,
}

impl From<ArchiveFormat> for PendingArchiveFormat {
    fn from(value: ArchiveFormat) -> Self {
        match value {
            ArchiveFormat::TarGz => PendingArchiveFormat::TarGz,
            ArchiveFormat::Zip => PendingArchiveFormat::Zip,
        }
    }
}

impl From<PendingArchiveFormat> for ArchiveFormat {
    fn from(value: PendingArchiveFormat) -> Self {
        match value {
            PendingArchiveFormat::TarGz => ArchiveFormat::TarGz,
            PendingArchiveFormat::Zip => ArchiveFormat::Zip,
        }
    }
}

const PENDING_BATCH_NAME: &str = "pending_batch.toml";

fn pending_batch_file() -> PathBuf {
    synthfs::config::config_file().with_file_name(PENDING_BATCH_NAME)
}

fn load_pending() -> Vec<PendingOp> {
    std::fs::read_to_string(pending_batch_file())
        .ok()
        .and_then(|s| toml::from_str::<PendingBatchFile>(&s).ok())
        .map(|f| f.ops)
        .unwrap_or_default()
}

fn save_pending(ops: &[PendingOp]) -> Result<()> {
    let file_path = pending_batch_file();
    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let body = PendingBatchFile { ops: ops.to_vec() };
    let toml_str = toml::to_string_pretty(&body).context("serializing pending batch to TOML")?;
    std::fs::write(&file_path, toml_str).with_context(|| format!("writing {}", file_path.display()))
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PendingBatchFile {
    ops: Vec<PendingOp>,
}

fn stage(op: PendingOp) -> Result<()> {
    let mut ops = load_pending();
    ops.push(op);
    save_pending(&ops)
}

fn main() -> Result<()> {
    synthfs::logging::init();
    let cli = Cli::parse();

    let command = match cli.command {
        Some(command) => command,
        None => {
            eprintln!("synthfs requires a subcommand. See 'synthfs --help' for usage.");
            process::exit(64); // EX_USAGE
        }
    };

    match command {
        Commands::AddFile { path, from, mode } => stage(PendingOp::CreateFile { path, from, mode })?,
        Commands::AddDir { path, mode } => stage(PendingOp::CreateDir { path, mode })?,
        Commands::AddSymlink { path, target } => stage(PendingOp::CreateSymlink { path, target })?,
        Commands::Archive { path, format, sources } => stage(PendingOp::Archive {
            path,
            format: ArchiveFormat::from(format).into(),
            sources,
        })?,
        Commands::Unarchive { archive_path, extract_path, patterns } => {
            stage(PendingOp::Unarchive { archive_path, extract_path, patterns })?
        }
        Commands::Copy { src, dst } => stage(PendingOp::Copy { src, dst })?,
        Commands::Mv { src, dst } => stage(PendingOp::Move { src, dst })?,
        Commands::Delete { path } => stage(PendingOp::Delete { path })?,
        Commands::List => {
            for op in load_pending() {
                println!("{op:?}");
            }
        }
        Commands::Clear => {
            let _ = std::fs::remove_file(pending_batch_file());
        }
        Commands::Run { restorable, max_backup_mb, json } => {
            let ops = load_pending();
            if ops.is_empty() {
                eprintln!("nothing staged; use add-file/add-dir/copy/... first");
                process::exit(0);
            }
            let config = CliConfig::load();
            let restorable = restorable || config.default_restorable;
            let max_backup_mb = max_backup_mb.unwrap_or(config.default_budget_mb);

            let fs = LocalFileSystem::new();
            let mut batch = Batch::with_filesystem(&fs);
            for op in ops {
                batch = apply_pending(batch, op)?;
            }
            let report = if restorable {
                batch.run_restorable_with_budget(max_backup_mb)?
            } else {
                batch.run()?
            };

            if json {
                let summary = BatchResult::from(&report);
                println!("{}", serde_json::to_string_pretty(&summary).context("serializing run summary to JSON")?);
            } else {
                let executed = report.executed_ids();
                println!("executed {} operations", executed.len());
                for id in &executed {
                    println!("  {id}");
                }
                if !report.success {
                    eprintln!("batch failed:");
                    for e in report.errors() {
                        eprintln!("  {e}");
                    }
                }
            }
            if !report.success {
                process::exit(1);
            }
            let _ = std::fs::remove_file(pending_batch_file());
        }
        Commands::Config { command } => match command {
            ConfigCommand::Show => {
                let config = CliConfig::load();
                println!("{config:#?}");
            }
            ConfigCommand::Set { budget_mb, restorable, archive_format } => {
                let mut config = CliConfig::load();
                if let Some(v) = budget_mb {
                    config.default_budget_mb = v;
                }
                if let Some(v) = restorable {
                    config.default_restorable = v;
                }
                if let Some(v) = archive_format {
                    config.default_archive_format = match v {
                        CliArchiveFormat::TarGz => ArchiveFormatConfig::TarGz,
                        CliArchiveFormat::Zip => ArchiveFormatConfig::Zip,
                    };
                }
                config.write()?;
            }
        },
    }
    Ok(())
}

fn apply_pending<'a>(batch: Batch<'a>, op: PendingOp) -> Result<Batch<'a>> {
    let batch = match op {
        PendingOp::CreateFile { path, from, mode } => {
            let content = std::fs::read(&from).with_context(|| format!("reading {}", from.display()))?;
            batch.create_file(path, content, mode)?
        }
        PendingOp::CreateDir { path, mode } => batch.create_dir(path, mode)?,
        PendingOp::CreateSymlink { path, target } => batch.create_symlink(path, target)?,
        PendingOp::Archive { path, format, sources } => batch.create_archive(path, format.into(), sources)?,
        PendingOp::Unarchive { archive_path, extract_path, patterns } => {
            batch.unarchive(archive_path, extract_path, patterns)?
        }
        PendingOp::Copy { src, dst } => batch.copy(src, dst)?,
        PendingOp::Move { src, dst } => batch.mv(src, dst)?,
        PendingOp::Delete { path } => batch.delete(path)?,
    };
    Ok(batch)
}
