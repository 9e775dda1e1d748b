//! Per-object metadata resolution.
//!
//! Objects carry free-form custom metadata in the store. This module fetches
//! it and normalizes it into a [`Metadata`] record with documented defaults:
//!
//! | Field | Raw key | Default |
//! |---|---|---|
//! | `alt` | `alt` | `"No alt text found"` |
//! | `title` | `title` | filename stem (`a/b/riot.png` → `riot`) |
//! | `tags` | `tags` | empty; comma-split, trimmed, lowercased, empties dropped |
//! | `author` | `author` | `None` |
//! | `blur` | `blur` | `false`; only the literal string `"true"` enables it |
//! | `not_ours` | `notours` | `false`; only the literal string `"true"` enables it |
//! | `created_at` | object creation time | Unix epoch |
//!
//! ## Failure policy
//!
//! A failed metadata fetch is not an error for callers. [`resolve`] logs the
//! failure and returns `None`; the caller treats that as "no metadata".

use crate::store::{ObjectStore, RawMetadata};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::warn;

pub const DEFAULT_ALT: &str = "No alt text found";

/// Normalized descriptive record for one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub alt: String,
    pub title: String,
    /// Lowercase, trimmed, non-empty.
    pub tags: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub blur: bool,
    pub not_ours: bool,
    pub created_at: DateTime<Utc>,
}

/// Pick the first non-empty value from sources in priority order.
///
/// Whitespace-only values count as empty, and the winner is trimmed.
pub fn first_non_empty(sources: &[Option<&str>]) -> Option<String> {
    sources
        .iter()
        .filter_map(|opt| {
            opt.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .next()
}

/// Split a raw comma-separated tag field into normalized tags.
pub fn parse_tags(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Filename without directories or extension: `a/b/riot.png` → `riot`.
///
/// Only the last dot counts (`a.tar.gz` → `a.tar`); a leading dot is part of
/// the name (`.hidden` → `.hidden`).
pub fn filename_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(pos) if pos > 0 => &name[..pos],
        _ => name,
    }
}

fn flag(raw: &RawMetadata, key: &str) -> bool {
    raw.get(key) == Some("true")
}

/// Normalize raw store metadata for the object at `path`.
pub fn normalize(path: &str, raw: &RawMetadata) -> Metadata {
    Metadata {
        alt: first_non_empty(&[raw.get("alt")]).unwrap_or_else(|| DEFAULT_ALT.to_string()),
        title: first_non_empty(&[raw.get("title"), Some(filename_stem(path))])
            .unwrap_or_default(),
        tags: raw.get("tags").map(parse_tags).unwrap_or_default(),
        author: first_non_empty(&[raw.get("author")]),
        blur: flag(raw, "blur"),
        not_ours: flag(raw, "notours"),
        created_at: raw.created.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
    }
}

/// Fetch and normalize metadata for `path`. Returns `None` when the store
/// cannot provide it.
pub fn resolve(store: &dyn ObjectStore, path: &str) -> Option<Metadata> {
    match store.get_metadata(path) {
        Ok(raw) => Some(normalize(path, &raw)),
        Err(e) => {
            warn!(path, error = %e, "Metadata fetch failed");
            None
        }
    }
}
