//! In-memory object store.
//!
//! Objects live in a `BTreeMap`, so listings come back in lexicographic key
//! order like a real bucket. Two knobs make it useful for exercising the
//! paginator:
//!
//! - `shallow_limit` caps every listing response below what was requested
//!   while still reporting a continuation.
//! - `unavailable` makes every call fail with [`StoreError::Unavailable`].
//!
//! Individual objects can also be flagged so their metadata fetch fails,
//! which is how per-item failure isolation is tested.

use super::{ListQuery, ListResponse, ObjectStore, RawMetadata, StoreError, StoreObject};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    fields: BTreeMap<String, String>,
    created: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    broken_metadata: RwLock<BTreeSet<String>>,
    shallow_limit: Option<usize>,
    unavailable: AtomicBool,
    list_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every listing returns at most `limit` objects.
    pub fn with_shallow_limit(limit: usize) -> Self {
        Self {
            shallow_limit: Some(limit),
            ..Self::default()
        }
    }

    /// Insert an object with the given custom metadata fields.
    pub fn put(&self, key: &str, bytes: impl Into<Vec<u8>>, fields: &[(&str, &str)]) {
        self.put_created(key, bytes, fields, None);
    }

    pub fn put_created(
        &self,
        key: &str,
        bytes: impl Into<Vec<u8>>,
        fields: &[(&str, &str)],
        created: Option<DateTime<Utc>>,
    ) {
        let fields = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.objects
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                key.to_string(),
                StoredObject {
                    bytes: bytes.into(),
                    fields,
                    created,
                },
            );
    }

    /// Make metadata fetches for `key` fail.
    pub fn break_metadata(&self, key: &str) {
        self.broken_metadata
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string());
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `list` calls served so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store offline".into()))
        } else {
            Ok(())
        }
    }

    fn snapshot(&self) -> Vec<StoreObject> {
        self.objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(key, o)| StoreObject {
                key: key.clone(),
                size: o.bytes.len() as u64,
                created: o.created,
            })
            .collect()
    }
}

impl ObjectStore for MemoryStore {
    fn list(&self, query: &ListQuery) -> Result<ListResponse, StoreError> {
        self.check_available()?;
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let limit = self.shallow_limit.unwrap_or(query.max_results);
        Ok(super::select_page(&self.snapshot(), query, limit))
    }

    fn list_all(&self) -> Result<Vec<StoreObject>, StoreError> {
        self.check_available()?;
        Ok(self.snapshot())
    }

    fn get_bytes(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        self.check_available()?;
        self.objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .map(|o| o.bytes.clone())
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    fn get_metadata(&self, path: &str) -> Result<RawMetadata, StoreError> {
        self.check_available()?;
        if self
            .broken_metadata
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(path)
        {
            return Err(StoreError::Unavailable(format!(
                "metadata backend refused {path}"
            )));
        }
        self.objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .map(|o| RawMetadata {
                fields: o.fields.clone(),
                created: o.created,
            })
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }
}
