//! User-facing notifications for run outcomes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity: Severity::Info,
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity: Severity::Error,
        }
    }
}

/// Fire-and-forget sink. Implementations swallow their own failures.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: &Notification);
}

/// Which sink the binary wires up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyBackend {
    #[default]
    Log,
    Desktop,
    None,
}

impl NotifyBackend {
    pub fn build(self) -> Arc<dyn NotificationSink> {
        match self {
            NotifyBackend::Log => Arc::new(LogNotifier),
            NotifyBackend::Desktop => Arc::new(DesktopNotifier::default()),
            NotifyBackend::None => Arc::new(NoopNotifier),
        }
    }
}

/// Emits notifications as log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn notify(&self, n: &Notification) {
        match n.severity {
            Severity::Info => info!(title = %n.title, "{}", n.message),
            Severity::Error => error!(title = %n.title, "{}", n.message),
        }
    }
}

/// Desktop popup via `notify-send` (freedesktop notifications).
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    program: String,
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self {
            program: "notify-send".to_string(),
        }
    }
}

impl DesktopNotifier {
    fn args(n: &Notification) -> Vec<String> {
        let urgency = match n.severity {
            Severity::Info => "normal",
            Severity::Error => "critical",
        };
        vec![
            format!("--urgency={urgency}"),
            n.title.clone(),
            n.message.clone(),
        ]
    }
}

#[async_trait]
impl NotificationSink for DesktopNotifier {
    async fn notify(&self, n: &Notification) {
        // Mirror to the log so headless runs still record the outcome.
        LogNotifier.notify(n).await;

        match Command::new(&self.program).args(Self::args(n)).status().await {
            Ok(status) if status.success() => {}
            Ok(status) => debug!("{} exited with: {}", self.program, status),
            Err(e) => debug!("Failed to run {}: {}", self.program, e),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl NotificationSink for NoopNotifier {
    async fn notify(&self, _notification: &Notification) {}
}
