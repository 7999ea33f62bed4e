//! Backup orchestrator - drives one backup run end to end.
//!
//! Stages, in order:
//! - destination reachability check (hard stop when unreachable)
//! - removal of an archive already written today
//! - compression of all sources into `Backup_<YYYY-MM-DD>.<ext>`
//! - retention rotation
//! - completion record in the destination log, then one notification
//!
//! Only one run per destination may be active at a time. Overlapping runs
//! race on the same-day archive and on rotation; callers must serialize them.

pub mod report;
pub mod rotation;

use crate::archiver::ArchiverService;
use crate::clock::{Clock, SystemClock};
use crate::config::BackupJobConfig;
use crate::notify::{Notification, NotificationSink};
use crate::store::DestinationStore;
use chrono::{DateTime, Local};
use report::{format_duration, log_line, BackupRunResult, Outcome};
use rotation::RotationReport;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

const FAILURE_TITLE: &str = "Backup failed";
const SUCCESS_TITLE: &str = "Backup complete";

pub struct BackupOrchestrator {
    store: Arc<dyn DestinationStore>,
    archiver: Arc<dyn ArchiverService>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl BackupOrchestrator {
    pub fn new(
        store: Arc<dyn DestinationStore>,
        archiver: Arc<dyn ArchiverService>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self::with_clock(store, archiver, notifier, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn DestinationStore>,
        archiver: Arc<dyn ArchiverService>,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            archiver,
            notifier,
            clock,
        }
    }

    /// Execute one backup run. Never fails: every outcome is in the result.
    pub async fn run(&self, job: &BackupJobConfig) -> BackupRunResult {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("backup_run", %run_id, job = %job.name);
        self.execute(job, run_id).instrument(span).await
    }

    async fn execute(&self, job: &BackupJobConfig, run_id: Uuid) -> BackupRunResult {
        let started_at = self.clock.now();
        info!(
            destination = %job.destination.display(),
            sources = job.sources.len(),
            retention = job.retention,
            "Starting backup"
        );

        if !self.store.exists(&job.destination).await {
            error!(destination = %job.destination.display(), "Backup destination is not reachable");
            self.notifier
                .notify(&Notification::error(
                    FAILURE_TITLE,
                    format!(
                        "Backup destination {} is not reachable.",
                        job.destination.display()
                    ),
                ))
                .await;
            return self.finish(run_id, started_at, Outcome::DestinationUnreachable, None);
        }

        let target = job
            .naming
            .archive_path(&job.destination, started_at.date_naive());

        if let Err(message) = self.compress(job, &target).await {
            error!(archive = %target.display(), error = %message, "Compression failed");
            self.notifier
                .notify(&Notification::error(
                    FAILURE_TITLE,
                    format!("Compression failed: {message}"),
                ))
                .await;
            return self.finish(
                run_id,
                started_at,
                Outcome::CompressionFailed { message },
                None,
            );
        }
        info!(archive = %target.display(), "Archive created");

        let rotation = rotation::rotate(
            self.store.as_ref(),
            &job.destination,
            &job.naming,
            job.retention,
        )
        .await;

        let mut result = self.finish(run_id, started_at, Outcome::Success, Some(target));
        result.rotation = rotation;

        let archive_name = result
            .archive
            .as_deref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let line = log_line(&job.name, result.finished_at, &archive_name, result.duration);
        if let Err(e) = self.store.append_line(&job.log_path(), &line).await {
            warn!(log = %job.log_path().display(), error = %e, "Failed to append to backup log");
            result.log_error = Some(e.to_string());
        }

        self.notifier
            .notify(&Notification::info(
                SUCCESS_TITLE,
                success_message(job, &result),
            ))
            .await;

        info!(duration = %result.duration_hms(), "Backup finished");
        result
    }

    /// Remove today's stale archive, then run the archiver. Any partial output
    /// left behind by a failed archiver is removed.
    async fn compress(&self, job: &BackupJobConfig, target: &Path) -> Result<(), String> {
        for source in &job.sources {
            if !tokio::fs::try_exists(source).await.unwrap_or(false) {
                warn!(source = %source.display(), "Source path does not exist");
            }
        }

        if self.store.exists(target).await {
            info!(archive = %target.display(), "Replacing archive from an earlier run today");
            self.store.delete(target).await.map_err(|e| {
                format!("could not remove existing archive {}: {e}", target.display())
            })?;
        }

        match self.archiver.compress(&job.sources, target).await {
            Ok(_) => Ok(()),
            Err(e) => {
                if self.store.exists(target).await {
                    if let Err(cleanup) = self.store.delete(target).await {
                        warn!(archive = %target.display(), error = %cleanup, "Failed to remove partial archive");
                    }
                }
                Err(e.to_string())
            }
        }
    }

    fn finish(
        &self,
        run_id: Uuid,
        started_at: DateTime<Local>,
        outcome: Outcome,
        archive: Option<PathBuf>,
    ) -> BackupRunResult {
        let finished_at = self.clock.now();
        let duration = (finished_at - started_at).to_std().unwrap_or_default();
        BackupRunResult {
            run_id,
            outcome,
            started_at,
            finished_at,
            duration,
            archive,
            rotation: RotationReport::default(),
            log_error: None,
        }
    }
}

fn success_message(job: &BackupJobConfig, result: &BackupRunResult) -> String {
    let mut message = format!(
        "Backup of {} finished in {}.",
        job.name,
        format_duration(result.duration)
    );
    if !result.rotation.is_clean() {
        match result.rotation.list_error {
            Some(_) => message.push_str(" Old archives were not rotated."),
            None => message.push_str(&format!(
                " {} old archive(s) could not be removed.",
                result.rotation.failures.len()
            )),
        }
    }
    if result.log_error.is_some() {
        message.push_str(" The backup log could not be written.");
    }
    message
}
