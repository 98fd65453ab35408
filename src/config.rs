use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

fn default_documents_dir() -> String {
    "Documents".to_string()
}

fn default_metadata_dir() -> String {
    "Metadata".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    #[serde(default)]
    pub report_dir: Option<PathBuf>,
    pub years: Vec<u16>,
    #[serde(default = "default_documents_dir")]
    pub documents_dir: String,
    #[serde(default = "default_metadata_dir")]
    pub metadata_dir: String,
    #[serde(default)]
    pub workers: Option<usize>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(String),
    #[error("Failed to parse config: {0}")]
    Parse(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Read and validate a YAML run configuration.
pub fn load_config(path: &Path) -> Result<RunConfig, ConfigError> {
    let config = read_config(path)?;
    config.validate()?;
    Ok(config)
}

/// Read and parse without validating, for callers that adjust the
/// configuration before checking it.
pub fn read_config(path: &Path) -> Result<RunConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read(format!("{}: {}", path.display(), e)))?;
    serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.years.is_empty() {
            return Err(ConfigError::Invalid("no years to process".into()));
        }
        if let Some(bad) = self.years.iter().find(|y| !(1000..=9999).contains(*y)) {
            return Err(ConfigError::Invalid(format!("year {} is not a 4-digit year", bad)));
        }
        if self.workers == Some(0) {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.documents_dir.trim().is_empty() || self.metadata_dir.trim().is_empty() {
            return Err(ConfigError::Invalid("documents_dir and metadata_dir must be set".into()));
        }
        Ok(())
    }

    /// Configured pool size, else one fewer than the CPU count (the writer
    /// thread takes the last core).
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| num_cpus::get().saturating_sub(1)).max(1)
    }

    pub fn documents_path(&self, year: u16) -> PathBuf {
        self.input_root.join(year.to_string()).join(&self.documents_dir)
    }

    pub fn metadata_path(&self, year: u16) -> PathBuf {
        self.input_root.join(year.to_string()).join(&self.metadata_dir)
    }

    pub fn output_path(&self, year: u16) -> PathBuf {
        self.output_root.join(year.to_string())
    }

    pub fn report_path(&self) -> PathBuf {
        self.report_dir.clone().unwrap_or_else(|| self.output_root.clone())
    }
}
