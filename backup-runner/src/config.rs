//! Configuration management for the backup runner.
//!
//! Loads configuration from a TOML file with environment variable overrides.

use crate::archiver::{ArchiverConfig, OUTPUT_PLACEHOLDER, SOURCES_PLACEHOLDER};
use crate::naming::ArchiveNaming;
use crate::notify::NotifyBackend;
use crate::utils::errors::{BackupError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Overrides `job.destination`.
pub const ENV_DESTINATION: &str = "BACKUP_DESTINATION";
/// Overrides `job.retention`.
pub const ENV_RETENTION: &str = "BACKUP_RETENTION";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub job: JobConfig,

    #[serde(default)]
    pub archive: ArchiveNaming,

    #[serde(default)]
    pub archiver: ArchiverConfig,

    #[serde(default)]
    pub notify: NotifyConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Job name shown in notifications (default: hostname)
    #[serde(default = "default_job_name")]
    pub name: String,

    /// Directories to include, each as its own root in the archive
    pub sources: Vec<PathBuf>,

    /// Directory (local or mounted share) receiving archives and the log
    pub destination: PathBuf,

    /// Number of archives to keep (default: 10)
    #[serde(default = "default_retention")]
    pub retention: usize,

    /// Log file name inside the destination (default: BackupLog.txt)
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Notification backend (log, desktop, none)
    #[serde(default)]
    pub backend: NotifyBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default values
fn default_job_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "backup".to_string())
}

fn default_retention() -> usize {
    10
}

fn default_log_file() -> String {
    "BackupLog.txt".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Everything one orchestrator run needs. Built once per run and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupJobConfig {
    pub name: String,
    pub sources: Vec<PathBuf>,
    pub destination: PathBuf,
    pub naming: ArchiveNaming,
    pub retention: usize,
    pub log_file: String,
}

impl BackupJobConfig {
    pub fn log_path(&self) -> PathBuf {
        self.destination.join(&self.log_file)
    }
}

impl Config {
    /// Load configuration from a TOML file, apply environment overrides and validate.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from `lookup` (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dest) = lookup(ENV_DESTINATION).filter(|v| !v.is_empty()) {
            self.job.destination = PathBuf::from(dest);
        }
        if let Some(raw) = lookup(ENV_RETENTION).filter(|v| !v.is_empty()) {
            self.job.retention = raw.trim().parse().map_err(|_| {
                BackupError::Config(format!("{ENV_RETENTION} must be a positive integer, got '{raw}'"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.job.sources.is_empty() {
            return Err(BackupError::Config("job.sources must list at least one directory".into()));
        }
        if self.job.sources.iter().any(|s| s.as_os_str().is_empty()) {
            return Err(BackupError::Config("job.sources contains an empty path".into()));
        }
        if self.job.destination.as_os_str().is_empty() {
            return Err(BackupError::Config("job.destination must not be empty".into()));
        }
        if self.job.retention == 0 {
            return Err(BackupError::Config("job.retention must be at least 1".into()));
        }
        if self.job.log_file.is_empty() {
            return Err(BackupError::Config("job.log_file must not be empty".into()));
        }
        if self.archive.extension.is_empty() {
            return Err(BackupError::Config("archive.extension must not be empty".into()));
        }
        if self.archiver.program.is_empty() {
            return Err(BackupError::Config("archiver.program must not be empty".into()));
        }
        if !self.archiver.args.iter().any(|a| a.contains(OUTPUT_PLACEHOLDER)) {
            return Err(BackupError::Config(format!(
                "archiver.args must contain {OUTPUT_PLACEHOLDER}"
            )));
        }
        if !self.archiver.args.iter().any(|a| a == SOURCES_PLACEHOLDER) {
            return Err(BackupError::Config(format!(
                "archiver.args must contain {SOURCES_PLACEHOLDER} as its own argument"
            )));
        }
        Ok(())
    }

    pub fn backup_job(&self) -> BackupJobConfig {
        BackupJobConfig {
            name: self.job.name.clone(),
            sources: self.job.sources.clone(),
            destination: self.job.destination.clone(),
            naming: self.archive.clone(),
            retention: self.job.retention,
            log_file: self.job.log_file.clone(),
        }
    }
}
