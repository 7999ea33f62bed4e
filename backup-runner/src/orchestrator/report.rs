//! Run outcome and the textual summary persisted to the destination log.

use super::rotation::RotationReport;
use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    DestinationUnreachable,
    CompressionFailed { message: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Process exit code for the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::CompressionFailed { .. } => 1,
            Outcome::DestinationUnreachable => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BackupRunResult {
    pub run_id: Uuid,
    pub outcome: Outcome,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    #[serde(serialize_with = "serialize_hms")]
    pub duration: Duration,
    /// Present only on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<PathBuf>,
    pub rotation: RotationReport,
    /// Set when the completion record could not be appended to the log
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_error: Option<String>,
}

impl BackupRunResult {
    pub fn duration_hms(&self) -> String {
        format_duration(self.duration)
    }
}

/// `HH:MM:SS`, zero-padded. Hours keep counting past 24.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

fn serialize_hms<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_duration(*duration))
}

/// One line of the destination log.
pub fn log_line(job_name: &str, finished_at: DateTime<Local>, archive: &str, duration: Duration) -> String {
    format!(
        "{} - {}: backup completed successfully ({}). Duration: {}",
        finished_at.format("%Y-%m-%d %H:%M:%S"),
        job_name,
        archive,
        format_duration(duration)
    )
}
