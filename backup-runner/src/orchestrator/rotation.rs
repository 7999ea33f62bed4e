//! Retention rotation: keep the newest `retention` archives, delete the rest.

use crate::naming::ArchiveNaming;
use crate::store::{ArchiveEntry, DestinationStore};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPlan {
    /// Newest first
    pub keep: Vec<ArchiveEntry>,
    /// Newest first
    pub delete: Vec<ArchiveEntry>,
}

/// Order entries newest first (ties broken by path, descending) and split
/// them after the first `retention`.
pub fn plan(mut entries: Vec<ArchiveEntry>, retention: usize) -> RotationPlan {
    entries.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| b.path.cmp(&a.path))
    });

    let delete = if entries.len() > retention {
        entries.split_off(retention)
    } else {
        Vec::new()
    };

    RotationPlan { keep: entries, delete }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotationFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RotationReport {
    /// Archives left at the destination
    pub kept: usize,
    pub deleted: Vec<PathBuf>,
    pub failures: Vec<RotationFailure>,
    /// Set when the destination could not be listed; nothing was deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_error: Option<String>,
}

impl RotationReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.list_error.is_none()
    }
}

/// List `root`, then delete everything beyond the newest `retention` archives.
/// Failures are recorded in the report and never abort the pass.
pub async fn rotate(
    store: &dyn DestinationStore,
    root: &Path,
    naming: &ArchiveNaming,
    retention: usize,
) -> RotationReport {
    let entries = match store.list(root, naming).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %root.display(), error = %e, "Could not list destination, skipping rotation");
            return RotationReport {
                list_error: Some(e.to_string()),
                ..RotationReport::default()
            };
        }
    };

    let plan = plan(entries, retention);
    let mut report = RotationReport {
        kept: plan.keep.len(),
        ..RotationReport::default()
    };

    // Oldest first
    for entry in plan.delete.iter().rev() {
        match store.delete(&entry.path).await {
            Ok(()) => {
                info!(path = %entry.path.display(), "Removed old archive");
                report.deleted.push(entry.path.clone());
            }
            Err(e) => {
                warn!(path = %entry.path.display(), error = %e, "Failed to remove old archive");
                report.kept += 1;
                report.failures.push(RotationFailure {
                    path: entry.path.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        kept = report.kept,
        deleted = report.deleted.len(),
        failed = report.failures.len(),
        "Rotation complete"
    );
    report
}
