//! Persisted CLI defaults — default backup budget, default restorable
//! flag, last-used archive format — mirroring the way the teacher's
//! `application.rs` persists its job list to a platform config
//! directory in TOML. Ambient CLI convenience, not part of the core
//! engine's public contract.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::item::ArchiveFormat;

const CONFIG_NAME: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default = "default_budget_mb")]
    pub default_budget_mb: f64,
    #[serde(default)]
    pub default_restorable: bool,
    #[serde(default = "default_archive_format")]
    pub default_archive_format: ArchiveFormatConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        CliConfig {
            default_budget_mb: default_budget_mb(),
            default_restorable: false,
            default_archive_format: default_archive_format(),
        }
    }
}

fn default_budget_mb() -> f64 {
    512.0
}

fn default_archive_format() -> ArchiveFormatConfig {
    ArchiveFormatConfig::TarGz
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ArchiveFormatConfig {
    TarGz,
    Zip,
}

impl From<ArchiveFormatConfig> for ArchiveFormat {
    fn from(value: ArchiveFormatConfig) -> Self {
        match value {
            ArchiveFormatConfig::TarGz => ArchiveFormat::TarGz,
            ArchiveFormatConfig::Zip => ArchiveFormat::Zip,
        }
    }
}

impl CliConfig {
    /// Loads the persisted config, falling back to defaults if the file
    /// is missing (never an error — an absent config is normal on first
    /// run).
    pub fn load() -> Self {
        match read_config_file() {
            Ok(config) => config,
            Err(_) => CliConfig::default(),
        }
    }

    pub fn write(&self) -> Result<()> {
        let file_path = config_file();
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }
        let toml_str = toml::to_string_pretty(self).context("serializing CLI config to TOML")?;
        let mut writer = std::io::BufWriter::new(
            fs::File::create(&file_path).with_context(|| format!("creating config file {}", file_path.display()))?,
        );
        writer.write_all(toml_str.as_bytes()).context("writing config file")?;
        writer.flush().context("flushing config file")
    }
}

const PKG_NAME: &str = env!("CARGO_PKG_NAME");

pub fn config_file() -> PathBuf {
    config_dir().join(CONFIG_NAME)
}

fn config_dir() -> PathBuf {
    dirs::config_dir().unwrap_or_else(std::env::temp_dir).join(PKG_NAME)
}

fn read_config_file() -> Result<CliConfig> {
    let file_path = config_file();
    let toml_str = fs::read_to_string(&file_path)
        .with_context(|| format!("reading config file {}", file_path.display()))?;
    toml::from_str(&toml_str).with_context(|| format!("parsing config file {}", file_path.display()))
}
