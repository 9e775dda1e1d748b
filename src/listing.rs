//! Virtual directory pagination over prefix/delimiter listing.
//!
//! [`Paginator::list`] turns a directory prefix and an optional cursor into one
//! page of [`ObjectEntry`]s plus the cursor for the next page.
//!
//! ## First page vs. continued pages
//!
//! Without a cursor the query is built here (prefix, `/` delimiter) and asks
//! for `page_size + 1` objects: a directory's own placeholder key (`art/`)
//! sorts first under its prefix and is dropped from the results, so the extra
//! slot keeps the visible page at `page_size`. With a cursor the store's own
//! continuation query is resumed verbatim with `max_results = page_size`.
//!
//! ## Shallow pages
//!
//! Stores may answer with fewer objects than requested while more exist. The
//! paginator then keeps following the *same* continuation with single-object
//! requests until the requested count is reached or the store stops reporting
//! a continuation. Requests are strictly sequential: each depends on the
//! continuation returned by the previous one. Asking for one object at a time
//! guarantees the page boundary is never overshot.
//!
//! An optional deadline bounds the follow-up loop. When it passes, the page is
//! returned as-is together with a cursor that resumes exactly where the loop
//! stopped, so nothing is skipped.

use crate::cursor;
use crate::naming::{DELIMITER, Naming};
use crate::store::{ListQuery, ObjectStore, StoreError, StoreObject};
use crate::types::ObjectEntry;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ListError {
    #[error("Bad page cursor: {0}")]
    BadCursor(String),
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}

impl ListError {
    /// Whether the failure was caused by the caller (a 4xx-equivalent).
    pub fn is_client_error(&self) -> bool {
        matches!(self, ListError::BadCursor(_))
    }
}

/// Paging parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingSettings {
    pub page_size: usize,
    /// Upper bound on time spent following shallow-page continuations.
    pub deadline: Option<Duration>,
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            deadline: None,
        }
    }
}

/// One page of a virtual directory.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryPage {
    pub entries: Vec<ObjectEntry>,
    pub next_page_token: Option<String>,
}

pub struct Paginator<'a> {
    store: &'a dyn ObjectStore,
    naming: &'a Naming,
    settings: ListingSettings,
}

impl<'a> Paginator<'a> {
    pub fn new(store: &'a dyn ObjectStore, naming: &'a Naming, settings: ListingSettings) -> Self {
        Self {
            store,
            naming,
            settings,
        }
    }

    /// List one page of `prefix`, resuming from `page_token` if given.
    ///
    /// `prefix` is used verbatim on the first page; callers normally pass it
    /// through [`crate::naming::directory_prefix`]. It is ignored when a
    /// token is supplied, since the token carries its own query.
    pub fn list(&self, prefix: &str, page_token: Option<&str>) -> Result<DirectoryPage, ListError> {
        let query = match page_token {
            Some(token) => {
                let mut query = cursor::decode(token).map_err(|e| {
                    warn!(token, error = %e, "Rejected page cursor");
                    ListError::BadCursor(e.to_string())
                })?;
                query.max_results = self.settings.page_size;
                query
            }
            None => ListQuery::new(prefix, Some(DELIMITER), self.settings.page_size + 1),
        };

        let (objects, next) = self.fill(query)?;
        let entries = objects
            .into_iter()
            .filter_map(|o| self.to_entry(o))
            .collect();

        Ok(DirectoryPage {
            entries,
            next_page_token: next.as_ref().map(cursor::encode),
        })
    }

    /// Issue `query`, then follow its continuation one object at a time until
    /// `query.max_results` objects are collected or the listing is exhausted.
    fn fill(&self, query: ListQuery) -> Result<(Vec<StoreObject>, Option<ListQuery>), StoreError> {
        let target = query.max_results;
        let started = Instant::now();

        let first = self.store.list(&query)?;
        let mut objects = first.objects;
        let mut next = first.next;
        let mut follow_ups = 0usize;

        while objects.len() < target {
            let Some(mut continuation) = next.take() else {
                break;
            };
            if self
                .settings
                .deadline
                .is_some_and(|limit| started.elapsed() >= limit)
            {
                debug!(
                    prefix = %continuation.prefix,
                    collected = objects.len(),
                    "Listing deadline reached, returning partial page"
                );
                continuation.max_results = target;
                next = Some(continuation);
                break;
            }

            continuation.max_results = 1;
            let batch = self.store.list(&continuation)?;
            follow_ups += 1;
            if batch.objects.is_empty() {
                // No progress; hand the continuation back as the page token.
                next = batch.next.map(|mut q| {
                    q.max_results = target;
                    q
                });
                break;
            }
            objects.extend(batch.objects);
            next = batch.next;
        }

        if follow_ups > 0 {
            debug!(
                prefix = %query.prefix,
                follow_ups,
                collected = objects.len(),
                "Filled shallow listing page"
            );
        }

        Ok((objects, next))
    }

    fn to_entry(&self, object: StoreObject) -> Option<ObjectEntry> {
        let kind = self.naming.classify(&object.key)?;
        Some(ObjectEntry {
            display_path: self.naming.display_path(&object.key),
            name: self.naming.display_name(&object.key),
            kind,
            mtime: object.created,
            size: Some(object.size),
            path: object.key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_helpers::{fixture_store, listed_paths};
    use crate::types::EntryKind;

    fn gallery_store(shallow: Option<usize>, files: usize) -> MemoryStore {
        let store = match shallow {
            Some(n) => MemoryStore::with_shallow_limit(n),
            None => MemoryStore::new(),
        };
        store.put("art/", Vec::new(), &[]);
        for i in 0..files {
            store.put(&format!("art/{i:03}.png"), Vec::new(), &[]);
        }
        store
    }

    fn paths(page: &DirectoryPage) -> Vec<&str> {
        page.entries.iter().map(|e| e.path.as_str()).collect()
    }

    // =========================================================================
    // Page size and continuation
    // =========================================================================

    #[test]
    fn first_page_drops_placeholder_and_fills_page() {
        let store = gallery_store(None, 25);
        let naming = Naming::default();
        let p = Paginator::new(&store, &naming, ListingSettings::default());

        let page = p.list("art/", None).unwrap();
        assert_eq!(page.entries.len(), 10);
        assert_eq!(page.entries[0].path, "art/000.png");
        assert!(page.next_page_token.is_some());
    }

    #[test]
    fn walks_all_pages_without_gaps_or_duplicates() {
        let store = gallery_store(None, 25);
        let naming = Naming::default();
        let p = Paginator::new(&store, &naming, ListingSettings::default());

        let mut seen = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = p.list("art/", token.as_deref()).unwrap();
            seen.extend(page.entries.iter().map(|e| e.path.clone()));
            match page.next_page_token {
                Some(t) => token = Some(t),
                None => break,
            }
        }
        let expected: Vec<String> = (0..25).map(|i| format!("art/{i:03}.png")).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn shallow_pages_converge_to_target_size() {
        let store = gallery_store(Some(3), 25);
        let naming = Naming::default();
        let p = Paginator::new(&store, &naming, ListingSettings::default());

        let page = p.list("art/", None).unwrap();
        assert_eq!(page.entries.len(), 10);

        let page = p.list("art/", page.next_page_token.as_deref()).unwrap();
        assert_eq!(page.entries.len(), 10);
        assert_eq!(page.entries[0].path, "art/010.png");

        let page = p.list("art/", page.next_page_token.as_deref()).unwrap();
        assert_eq!(paths(&page).len(), 5);
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn shallow_follow_ups_request_one_object() {
        // 1 initial call returning 3 + 8 single-object follow-ups = 11 objects.
        let store = gallery_store(Some(3), 25);
        let naming = Naming::default();
        let p = Paginator::new(&store, &naming, ListingSettings::default());
        p.list("art/", None).unwrap();
        assert_eq!(store.list_calls(), 9);
    }

    #[test]
    fn fewer_objects_than_page_size() {
        let store = gallery_store(Some(2), 4);
        let naming = Naming::default();
        let p = Paginator::new(&store, &naming, ListingSettings::default());
        let page = p.list("art/", None).unwrap();
        assert_eq!(page.entries.len(), 4);
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn exact_page_boundary_has_no_spurious_token() {
        let store = gallery_store(None, 10);
        let naming = Naming::default();
        let p = Paginator::new(&store, &naming, ListingSettings::default());
        let page = p.list("art/", None).unwrap();
        assert_eq!(page.entries.len(), 10);
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn zero_deadline_returns_partial_page_with_resumable_cursor() {
        let store = gallery_store(Some(3), 25);
        let naming = Naming::default();
        let settings = ListingSettings {
            deadline: Some(Duration::ZERO),
            ..ListingSettings::default()
        };
        let p = Paginator::new(&store, &naming, settings);

        let page = p.list("art/", None).unwrap();
        // Placeholder + 2 files from the single shallow response.
        assert_eq!(page.entries.len(), 2);
        let token = page.next_page_token.expect("resumable cursor");

        let unbounded = Paginator::new(&store, &naming, ListingSettings::default());
        let next = unbounded.list("art/", Some(&token)).unwrap();
        assert_eq!(next.entries[0].path, "art/002.png");
    }

    #[test]
    fn empty_follow_up_ends_the_page() {
        let store = gallery_store(Some(0), 5);
        let naming = Naming::default();
        let p = Paginator::new(&store, &naming, ListingSettings::default());

        let page = p.list("art/", None).unwrap();
        assert!(page.entries.is_empty());
        // The initial request plus one follow-up that made no progress.
        assert_eq!(store.list_calls(), 2);

        let token = page.next_page_token.expect("resumable cursor");
        let healthy = gallery_store(None, 5);
        let resumed = Paginator::new(&healthy, &naming, ListingSettings::default());
        let next = resumed.list("art/", Some(&token)).unwrap();
        assert_eq!(next.entries.len(), 5);
        assert_eq!(next.entries[0].path, "art/000.png");
    }

    #[test]
    fn fixture_bucket_lists_directories_first() {
        let store = fixture_store();
        assert_eq!(
            listed_paths(&store, "art/"),
            vec!["art/0000posters-", "art/logo.svg", "art/riot.png"]
        );
        assert_eq!(listed_paths(&store, "art/posters/"), vec!["art/posters/strike.jpg"]);
    }

    // =========================================================================
    // Cursor handling
    // =========================================================================

    #[test]
    fn bad_cursor_is_typed_outcome() {
        let store = gallery_store(None, 3);
        let naming = Naming::default();
        let p = Paginator::new(&store, &naming, ListingSettings::default());

        let err = p.list("art/", Some("not-base64-json")).unwrap_err();
        assert!(matches!(err, ListError::BadCursor(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn store_outage_is_not_client_error() {
        let store = gallery_store(None, 3);
        store.set_unavailable(true);
        let naming = Naming::default();
        let p = Paginator::new(&store, &naming, ListingSettings::default());

        let err = p.list("art/", None).unwrap_err();
        assert!(matches!(err, ListError::StoreUnavailable(_)));
        assert!(!err.is_client_error());
    }

    // =========================================================================
    // Entry classification
    // =========================================================================

    #[test]
    fn entries_are_classified_and_named() {
        let store = MemoryStore::new();
        store.put("0000posters-", Vec::new(), &[]);
        store.put("riot.png", vec![0; 42], &[]);
        store.put("zines/", Vec::new(), &[]);
        let naming = Naming::default();
        let p = Paginator::new(&store, &naming, ListingSettings::default());

        let page = p.list("", None).unwrap();
        assert_eq!(page.entries.len(), 2);

        let dir = &page.entries[0];
        assert_eq!(dir.kind, EntryKind::Directory);
        assert_eq!(dir.name, "posters");
        assert_eq!(dir.display_path, "posters");

        let file = &page.entries[1];
        assert_eq!(file.kind, EntryKind::File);
        assert_eq!(file.name, "riot.png");
        assert_eq!(file.size, Some(42));
    }

    #[test]
    fn store_order_is_preserved() {
        let store = MemoryStore::new();
        for k in ["c.png", "a.png", "b.png"] {
            store.put(k, Vec::new(), &[]);
        }
        let naming = Naming::default();
        let p = Paginator::new(&store, &naming, ListingSettings::default());
        let page = p.list("", None).unwrap();
        assert_eq!(paths(&page), vec!["a.png", "b.png", "c.png"]);
    }
}
