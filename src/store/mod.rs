//! Object store capability.
//!
//! The core never talks to a concrete storage service. It calls the
//! [`ObjectStore`] trait, whose contract is deliberately the lowest common
//! denominator of bucket APIs:
//!
//! | Operation | Meaning |
//! |---|---|
//! | [`list`](ObjectStore::list) | prefix/delimiter listing, at most `max_results` objects, plus a continuation query |
//! | [`list_all`](ObjectStore::list_all) | every object in the bucket, unpaginated |
//! | [`get_bytes`](ObjectStore::get_bytes) | object contents |
//! | [`get_metadata`](ObjectStore::get_metadata) | raw custom metadata map + creation time |
//!
//! A store may return fewer objects than requested while still reporting a
//! continuation ("shallow pages"). Callers that need an exact page size must
//! follow continuations themselves; see [`crate::listing`].
//!
//! Backends:
//! - [`MemoryStore`]: ordered in-memory map, used by tests and demos.
//! - [`FsStore`]: a local directory treated as a bucket.

pub mod fs;
pub mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A listing query. This is also the continuation state handed back by the
/// store: resuming a listing means passing the returned query back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    pub max_results: usize,
    /// Resume strictly after this key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

impl ListQuery {
    pub fn new(prefix: impl Into<String>, delimiter: Option<&str>, max_results: usize) -> Self {
        Self {
            prefix: prefix.into(),
            delimiter: delimiter.map(String::from),
            max_results,
            page_token: None,
        }
    }
}

/// A stored object as seen by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreObject {
    pub key: String,
    pub size: u64,
    pub created: Option<DateTime<Utc>>,
}

/// One listing response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListResponse {
    pub objects: Vec<StoreObject>,
    /// `Some` when more objects exist behind this page.
    pub next: Option<ListQuery>,
}

/// Raw, unnormalized object metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMetadata {
    /// Custom key-value metadata (`title`, `alt`, `tags`, ...).
    pub fields: BTreeMap<String, String>,
    pub created: Option<DateTime<Utc>>,
}

impl RawMetadata {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Object storage capability consumed by the core.
pub trait ObjectStore: Send + Sync {
    fn list(&self, query: &ListQuery) -> Result<ListResponse, StoreError>;

    fn list_all(&self) -> Result<Vec<StoreObject>, StoreError>;

    fn get_bytes(&self, path: &str) -> Result<Vec<u8>, StoreError>;

    fn get_metadata(&self, path: &str) -> Result<RawMetadata, StoreError>;
}

/// Whether `key` is an immediate child of `query`'s prefix under its
/// delimiter. Keys whose remainder contains the delimiter roll up into a
/// deeper prefix and are not returned as objects.
fn is_listed(key: &str, query: &ListQuery) -> bool {
    let Some(rest) = key.strip_prefix(query.prefix.as_str()) else {
        return false;
    };
    match query.delimiter.as_deref() {
        Some(delim) if !delim.is_empty() => !rest.contains(delim),
        _ => true,
    }
}

/// Select one page from lexicographically ordered objects.
///
/// `limit` is the number of objects the backend is willing to return, which
/// may be lower than `query.max_results`. Shared by every backend so that
/// their paging semantics are identical.
pub(crate) fn select_page<'a, I>(objects: I, query: &ListQuery, limit: usize) -> ListResponse
where
    I: IntoIterator<Item = &'a StoreObject>,
{
    let limit = limit.min(query.max_results);
    let mut matching = objects
        .into_iter()
        .filter(|o| {
            query
                .page_token
                .as_deref()
                .is_none_or(|after| o.key.as_str() > after)
        })
        .filter(|o| is_listed(&o.key, query));

    let page: Vec<StoreObject> = matching.by_ref().take(limit).cloned().collect();
    let has_more = matching.next().is_some();

    let next = match page.last() {
        Some(last) if has_more => Some(ListQuery {
            page_token: Some(last.key.clone()),
            ..query.clone()
        }),
        // An empty page with more data behind it can only happen with a zero
        // limit; resume from the same position.
        None if has_more => Some(query.clone()),
        _ => None,
    };

    ListResponse {
        objects: page,
        next,
    }
}
