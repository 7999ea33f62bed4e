//! In-memory doubles for the orchestrator's collaborators.

use crate::archiver::{ArchiverError, ArchiverService};
use crate::clock::Clock;
use crate::naming::ArchiveNaming;
use crate::notify::{Notification, NotificationSink};
use crate::store::{ArchiveEntry, DestinationStore};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Noon local time on 2024-01-`day`.
pub fn local_noon(day: u32) -> DateTime<Local> {
    let naive = NaiveDate::from_ymd_opt(2024, 1, day)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap();
    Local.from_local_datetime(&naive).earliest().unwrap()
}

/// The archive a run on 2024-01-`day` would have produced under `root`.
pub fn entry_for_day(root: &Path, day: u32) -> ArchiveEntry {
    let date = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
    ArchiveEntry {
        path: ArchiveNaming::default().archive_path(root, date),
        modified: local_noon(day).with_timezone(&Utc),
        size: Some(1024),
    }
}

/// Clock that returns `start`, then advances by `step` on every reading.
pub struct StepClock {
    current: Mutex<DateTime<Local>>,
    step: chrono::Duration,
}

impl StepClock {
    pub fn new(start: DateTime<Local>, step: chrono::Duration) -> Self {
        Self {
            current: Mutex::new(start),
            step,
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Local> {
        let mut current = self.current.lock().unwrap();
        let now = *current;
        *current = now + self.step;
        now
    }
}

#[derive(Default)]
pub struct MemoryStore {
    root: PathBuf,
    unreachable: AtomicBool,
    list_fails: AtomicBool,
    append_fails: AtomicBool,
    entries: Mutex<BTreeMap<PathBuf, ArchiveEntry>>,
    failing_deletes: Mutex<HashSet<PathBuf>>,
    delete_calls: Mutex<Vec<PathBuf>>,
    lines: Mutex<Vec<(PathBuf, String)>>,
}

impl MemoryStore {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.unreachable.store(!reachable, Ordering::SeqCst);
    }

    pub fn fail_list(&self) {
        self.list_fails.store(true, Ordering::SeqCst);
    }

    pub fn fail_append(&self) {
        self.append_fails.store(true, Ordering::SeqCst);
    }

    pub fn fail_delete_of(&self, path: &str) {
        self.failing_deletes.lock().unwrap().insert(PathBuf::from(path));
    }

    pub fn insert(&self, entry: ArchiveEntry) {
        self.entries.lock().unwrap().insert(entry.path.clone(), entry);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.lock().unwrap().contains_key(Path::new(path))
    }

    pub fn entry(&self, path: &str) -> Option<ArchiveEntry> {
        self.entries.lock().unwrap().get(Path::new(path)).cloned()
    }

    /// Paths matching the default naming scheme, sorted.
    pub fn archive_paths(&self) -> Vec<PathBuf> {
        let naming = ArchiveNaming::default();
        self.entries
            .lock()
            .unwrap()
            .keys()
            .filter(|p| naming.matches(p))
            .cloned()
            .collect()
    }

    pub fn archive_count(&self) -> usize {
        self.archive_paths().len()
    }

    pub fn delete_calls(&self) -> Vec<PathBuf> {
        self.delete_calls.lock().unwrap().clone()
    }

    pub fn appended_lines(&self) -> Vec<(PathBuf, String)> {
        self.lines.lock().unwrap().clone()
    }
}

#[async_trait]
impl DestinationStore for MemoryStore {
    async fn exists(&self, path: &Path) -> bool {
        if self.unreachable.load(Ordering::SeqCst) {
            return false;
        }
        path == self.root || self.entries.lock().unwrap().contains_key(path)
    }

    async fn list(&self, root: &Path, naming: &ArchiveNaming) -> io::Result<Vec<ArchiveEntry>> {
        if self.list_fails.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "share went away"));
        }
        Ok(self
            .entries
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.path.parent() == Some(root) && naming.matches(&e.path))
            .cloned()
            .collect())
    }

    async fn delete(&self, path: &Path) -> io::Result<()> {
        self.delete_calls.lock().unwrap().push(path.to_path_buf());
        if self.failing_deletes.lock().unwrap().contains(path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "file is locked"));
        }
        self.entries
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such archive"))
    }

    async fn append_line(&self, path: &Path, line: &str) -> io::Result<()> {
        if self.append_fails.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only share"));
        }
        self.lines
            .lock()
            .unwrap()
            .push((path.to_path_buf(), line.to_string()));
        Ok(())
    }
}

/// Archiver that writes an entry into a [`MemoryStore`] stamped by the clock.
pub struct FakeArchiver {
    store: Arc<MemoryStore>,
    clock: Arc<dyn Clock>,
    failure: Mutex<Option<String>>,
    partial_output: AtomicBool,
    calls: Mutex<Vec<(Vec<PathBuf>, PathBuf)>>,
}

impl FakeArchiver {
    pub fn new(store: Arc<MemoryStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            failure: Mutex::new(None),
            partial_output: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_with(&self, stderr: &str) {
        *self.failure.lock().unwrap() = Some(stderr.to_string());
    }

    /// On failure, leave a truncated archive at the output path.
    pub fn leave_partial_output(&self) {
        self.partial_output.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(Vec<PathBuf>, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }

    fn write_output(&self, output: &Path, size: u64) {
        self.store.insert(ArchiveEntry {
            path: output.to_path_buf(),
            modified: self.clock.now().with_timezone(&Utc),
            size: Some(size),
        });
    }
}

#[async_trait]
impl ArchiverService for FakeArchiver {
    async fn compress(&self, sources: &[PathBuf], output: &Path) -> Result<PathBuf, ArchiverError> {
        self.calls
            .lock()
            .unwrap()
            .push((sources.to_vec(), output.to_path_buf()));

        let failure = self.failure.lock().unwrap().clone();
        if let Some(stderr) = failure {
            if self.partial_output.load(Ordering::SeqCst) {
                self.write_output(output, 12);
            }
            return Err(ArchiverError::ExitStatus {
                code: Some(2),
                stderr,
            });
        }

        self.write_output(output, 4096);
        Ok(output.to_path_buf())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn notify(&self, notification: &Notification) {
        self.sent.lock().unwrap().push(notification.clone());
    }
}
