//! Archiver service: compress N source directories into one archive file.
//!
//! The production implementation spawns an external archiver (7-Zip by
//! default) with an argv built from a template, so every source path reaches
//! the child as a single argument with no shell quoting involved.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Placeholder replaced by the output archive path.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";
/// Placeholder expanded into one argument per source path.
pub const SOURCES_PLACEHOLDER: &str = "{sources}";

/// Keep at most this much of the child's stderr in error messages.
const STDERR_TAIL_BYTES: usize = 2048;

#[derive(Error, Debug)]
pub enum ArchiverError {
    #[error("failed to launch archiver '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("archiver exited with {}: {stderr}", exit_code_label(.code))]
    ExitStatus { code: Option<i32>, stderr: String },

    #[error("archiver timed out after {0:?}")]
    Timeout(Duration),

    #[error("archiver I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("code {c}"),
        None => "signal".to_string(),
    }
}

#[async_trait]
pub trait ArchiverService: Send + Sync {
    /// Compress every path in `sources` (each its own root) into `output`.
    async fn compress(&self, sources: &[PathBuf], output: &Path) -> Result<PathBuf, ArchiverError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiverConfig {
    /// Archiver executable (name on PATH or absolute path)
    #[serde(default = "default_program")]
    pub program: String,

    /// Argument template; must contain `{output}` and `{sources}`
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Kill the archiver after this many seconds (0 = no timeout)
    #[serde(default)]
    pub timeout_secs: u64,
}

fn default_program() -> String {
    "7z".to_string()
}

fn default_args() -> Vec<String> {
    ["a", "-tzip", OUTPUT_PLACEHOLDER, SOURCES_PLACEHOLDER]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            timeout_secs: 0,
        }
    }
}

impl ArchiverConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Expand the argument template. `{output}` may also appear inside a larger
/// token (e.g. `-o{output}`); `{sources}` must be a token of its own.
pub fn build_args(template: &[String], sources: &[PathBuf], output: &Path) -> Vec<String> {
    let output = output.to_string_lossy();
    let mut args = Vec::with_capacity(template.len() + sources.len());

    for token in template {
        if token == SOURCES_PLACEHOLDER {
            args.extend(sources.iter().map(|s| s.to_string_lossy().into_owned()));
        } else {
            args.push(token.replace(OUTPUT_PLACEHOLDER, &output));
        }
    }

    args
}

/// Archiver that runs an external program.
#[derive(Debug, Clone)]
pub struct ProcessArchiver {
    config: ArchiverConfig,
}

impl ProcessArchiver {
    pub fn new(config: ArchiverConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ArchiverService for ProcessArchiver {
    async fn compress(&self, sources: &[PathBuf], output: &Path) -> Result<PathBuf, ArchiverError> {
        let args = build_args(&self.config.args, sources, output);
        debug!(program = %self.config.program, ?args, "Spawning archiver");

        let child = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ArchiverError::Launch {
                program: self.config.program.clone(),
                source,
            })?;

        // Dropping the future on timeout drops the child, which kills it.
        let result = match self.config.timeout() {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| ArchiverError::Timeout(limit))?,
            None => child.wait_with_output().await,
        };
        let result = result?;

        if !result.status.success() {
            return Err(ArchiverError::ExitStatus {
                code: result.status.code(),
                stderr: stderr_tail(&result.stderr),
            });
        }

        info!(archive = %output.display(), "Archiver finished");
        Ok(output.to_path_buf())
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= STDERR_TAIL_BYTES {
        return text.to_string();
    }
    let mut start = text.len() - STDERR_TAIL_BYTES;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}
