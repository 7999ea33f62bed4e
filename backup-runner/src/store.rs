//! Destination store: the directory (local or network share) holding archives
//! and the run log.

use crate::naming::ArchiveNaming;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// An archive discovered at the destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    /// Full path of the archive
    pub path: PathBuf,

    /// Last modified time
    pub modified: DateTime<Utc>,

    /// Size in bytes, when the store reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[async_trait]
pub trait DestinationStore: Send + Sync {
    /// Whether `path` is reachable. Any error reaching it counts as `false`.
    async fn exists(&self, path: &Path) -> bool;

    /// Archives directly under `root` whose file name matches `naming`.
    async fn list(&self, root: &Path, naming: &ArchiveNaming) -> io::Result<Vec<ArchiveEntry>>;

    async fn delete(&self, path: &Path) -> io::Result<()>;

    /// Append `line` plus a trailing newline, creating the file if needed.
    async fn append_line(&self, path: &Path, line: &str) -> io::Result<()>;
}

/// Store backed by the local filesystem (including mounted shares).
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStore;

#[async_trait]
impl DestinationStore for LocalStore {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn list(&self, root: &Path, naming: &ArchiveNaming) -> io::Result<Vec<ArchiveEntry>> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(root).await?;

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if !naming.matches(&path) {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let modified = match metadata.modified() {
                Ok(t) => DateTime::<Utc>::from(t),
                Err(_) => fallback_modified(&path, naming),
            };

            entries.push(ArchiveEntry {
                path,
                modified,
                size: Some(metadata.len()),
            });
        }

        Ok(entries)
    }

    async fn delete(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    async fn append_line(&self, path: &Path, line: &str) -> io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(format!("{line}\n").as_bytes()).await?;
        file.flush().await
    }
}

/// Midnight UTC of the date encoded in the file name, for filesystems that
/// do not report modification times.
fn fallback_modified(path: &Path, naming: &ArchiveNaming) -> DateTime<Utc> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| naming.parse(n))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|| DateTime::<Utc>::from(std::time::UNIX_EPOCH))
}
