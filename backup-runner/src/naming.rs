//! Archive naming scheme.
//!
//! Archives are named `<prefix><YYYY-MM-DD>.<extension>`, one per calendar day.
//! Rotation only considers files whose name parses back under the same scheme,
//! so other files sharing the destination are never counted or deleted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveNaming {
    /// File name prefix (default: `Backup_`)
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// File extension without the leading dot (default: `zip`)
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_prefix() -> String {
    "Backup_".to_string()
}

fn default_extension() -> String {
    "zip".to_string()
}

impl Default for ArchiveNaming {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            extension: default_extension(),
        }
    }
}

impl ArchiveNaming {
    pub fn file_name(&self, date: NaiveDate) -> String {
        format!(
            "{}{}.{}",
            self.prefix,
            date.format(DATE_FORMAT),
            self.extension
        )
    }

    /// Full archive path for `date` under `root`.
    pub fn archive_path(&self, root: &Path, date: NaiveDate) -> PathBuf {
        root.join(self.file_name(date))
    }

    /// Recover the date from a file name produced by [`ArchiveNaming::file_name`].
    /// Names that only parse leniently (unpadded, signed, padded with spaces)
    /// are rejected.
    pub fn parse(&self, file_name: &str) -> Option<NaiveDate> {
        let stem = file_name
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.extension.as_str())?
            .strip_suffix('.')?;
        let date = NaiveDate::parse_from_str(stem, DATE_FORMAT).ok()?;
        (self.file_name(date) == file_name).then_some(date)
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| self.parse(n))
            .is_some()
    }
}
