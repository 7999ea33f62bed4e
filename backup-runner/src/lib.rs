//! Backup Runner Library
//!
//! Archives a set of source directories into one dated archive at a
//! destination, keeps only the newest N archives and records each completed
//! run in a log next to them.

pub mod archiver;
pub mod clock;
pub mod config;
pub mod naming;
pub mod notify;
pub mod orchestrator;
pub mod store;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::{BackupJobConfig, Config};
pub use orchestrator::report::{BackupRunResult, Outcome};
pub use orchestrator::BackupOrchestrator;
pub use utils::errors::{BackupError, Result};
