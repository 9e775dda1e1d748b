//! Shared value types used by listing, indexing, and browsing.
//!
//! All of these are constructed fresh per call and never mutated afterwards.
//! The store is the source of truth; nothing here is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether an entry is a stored file or a synthetic directory marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
        }
    }

    /// Parse `"file"` / `"directory"` (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Some(EntryKind::File),
            "directory" | "dir" => Some(EntryKind::Directory),
            _ => None,
        }
    }
}

/// One entry of a virtual directory listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectEntry {
    /// Raw store key.
    pub path: String,
    pub kind: EntryKind,
    /// Key with the directory marker and sort padding removed.
    pub display_path: String,
    /// Last segment of `display_path`.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtime: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// A `(kind, path)` pair stored in the tag and search indexes.
///
/// `path` is the display path, since index results link to browsable
/// locations rather than raw keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexEntry {
    pub kind: EntryKind,
    pub path: String,
}
