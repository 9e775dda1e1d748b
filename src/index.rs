//! Collection index: tag groups and an inverted word index over the whole
//! bucket.
//!
//! # Build
//!
//! [`build_index`] walks every object (one unpaginated listing), classifies
//! it with the naming convention, and fetches its raw metadata. Metadata
//! fetches fan out across the rayon pool; results are folded back in listing
//! order so the index is deterministic.
//!
//! | Source | Goes to |
//! |---|---|
//! | `tags` (comma-split, lowercased) | one tag bucket per tag, and the word index |
//! | no tags, or metadata unreadable | the reserved `untagged` bucket only |
//! | `title`, `alt` (whitespace-split, lowercased, stop words dropped) | word index |
//! | `author` | word index, as one lowercase token |
//!
//! Only fields actually present in the store are indexed; defaults such as
//! the placeholder alt text never are. Buckets are lists: an object whose
//! title repeats a word contributes that word twice, which search ranking
//! counts.
//!
//! # Snapshots
//!
//! [`IndexHandle`] holds the current [`CollectionIndex`] behind an
//! [`ArcSwap`]. A refresh builds a complete new index off to the side and
//! swaps it in with one atomic store; readers holding the previous snapshot
//! keep it until they drop it. A failed rebuild leaves the old snapshot in
//! place.

use crate::metadata::parse_tags;
use crate::naming::Naming;
use crate::schedule::RunGuard;
use crate::store::{ObjectStore, RawMetadata, StoreError};
use crate::types::{EntryKind, IndexEntry};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Bucket for objects without tags.
pub const UNTAGGED: &str = "untagged";

/// Words never indexed or searched for.
pub const STOP_WORDS: &[&str] = &["a", "an", "and", "at", "be", "of", "the", "this", "to"];

/// An immutable index snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionIndex {
    pub tags: BTreeMap<String, Vec<IndexEntry>>,
    pub words: BTreeMap<String, Vec<IndexEntry>>,
    /// Entries seen by the walk.
    pub object_count: usize,
    /// `None` for the empty startup snapshot.
    pub built_at: Option<DateTime<Utc>>,
}

/// A search result with its contribution count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub entry: IndexEntry,
    pub score: usize,
}

/// One page of an index read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexPage<T> {
    pub items: Vec<T>,
    /// Offset of the next page, if any.
    pub next_offset: Option<usize>,
}

impl<T: Clone> IndexPage<T> {
    fn slice(all: &[T], offset: usize, page_size: usize) -> Self {
        let start = offset.min(all.len());
        let end = start.saturating_add(page_size).min(all.len());
        Self {
            items: all[start..end].to_vec(),
            next_offset: (end < all.len()).then_some(end),
        }
    }
}

/// Normalize one word: trim surrounding punctuation, lowercase. Returns
/// `None` for stop words and for tokens with nothing left.
pub fn normalize_word(raw: &str) -> Option<String> {
    let word = raw
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    if word.is_empty() || STOP_WORDS.contains(&word.as_str()) {
        None
    } else {
        Some(word)
    }
}

/// Split free text into indexable words.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().filter_map(normalize_word).collect()
}

impl CollectionIndex {
    /// Tag names with their entry counts, alphabetically.
    pub fn tag_groups(&self) -> Vec<(String, usize)> {
        self.tags
            .iter()
            .map(|(tag, entries)| (tag.clone(), entries.len()))
            .collect()
    }

    /// Entries under `tag` (case-insensitive), in walk order.
    pub fn tag(&self, tag: &str) -> &[IndexEntry] {
        self.tags
            .get(&tag.trim().to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn tag_page(&self, tag: &str, offset: usize, page_size: usize) -> IndexPage<IndexEntry> {
        IndexPage::slice(self.tag(tag), offset, page_size)
    }

    /// Rank entries by how many index contributions they have across all
    /// query terms, highest first. Ties keep first-seen order.
    pub fn search(&self, query: &str, kind: Option<EntryKind>) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = Vec::new();
        let mut position: HashMap<&IndexEntry, usize> = HashMap::new();

        for term in tokenize(query) {
            let Some(entries) = self.words.get(&term) else {
                continue;
            };
            for entry in entries {
                if kind.is_some_and(|k| k != entry.kind) {
                    continue;
                }
                match position.get(entry) {
                    Some(&i) => hits[i].score += 1,
                    None => {
                        position.insert(entry, hits.len());
                        hits.push(SearchHit {
                            entry: entry.clone(),
                            score: 1,
                        });
                    }
                }
            }
        }

        // Stable sort: equal scores stay in first-seen order.
        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits
    }

    pub fn search_page(
        &self,
        query: &str,
        kind: Option<EntryKind>,
        offset: usize,
        page_size: usize,
    ) -> IndexPage<SearchHit> {
        IndexPage::slice(&self.search(query, kind), offset, page_size)
    }

    fn add(&mut self, entry: &IndexEntry, metadata: Option<&RawMetadata>) {
        self.object_count += 1;

        let tags = metadata
            .and_then(|m| m.get("tags"))
            .map(parse_tags)
            .unwrap_or_default();
        if tags.is_empty() {
            self.tags
                .entry(UNTAGGED.to_string())
                .or_default()
                .push(entry.clone());
        }
        for tag in &tags {
            self.tags.entry(tag.clone()).or_default().push(entry.clone());
            self.words.entry(tag.clone()).or_default().push(entry.clone());
        }

        let Some(metadata) = metadata else {
            return;
        };
        for field in ["title", "alt"] {
            for word in metadata.get(field).map(tokenize).unwrap_or_default() {
                self.words.entry(word).or_default().push(entry.clone());
            }
        }
        if let Some(author) = metadata.get("author").map(str::trim).filter(|a| !a.is_empty()) {
            self.words
                .entry(author.to_lowercase())
                .or_default()
                .push(entry.clone());
        }
    }
}

/// Walk the whole store and build a fresh index.
///
/// Fails only if the walk itself fails. Unreadable metadata for individual
/// objects is logged and those objects land in [`UNTAGGED`].
pub fn build_index(store: &dyn ObjectStore, naming: &Naming) -> Result<CollectionIndex, StoreError> {
    let started = Instant::now();
    let objects = store.list_all()?;

    let resolved: Vec<(IndexEntry, Option<RawMetadata>)> = objects
        .par_iter()
        .filter_map(|object| {
            let kind = naming.classify(&object.key)?;
            let metadata = match store.get_metadata(&object.key) {
                Ok(m) => Some(m),
                Err(e) => {
                    warn!(key = %object.key, error = %e, "Indexing without metadata");
                    None
                }
            };
            let entry = IndexEntry {
                kind,
                path: naming.display_path(&object.key),
            };
            Some((entry, metadata))
        })
        .collect();

    let mut index = CollectionIndex::default();
    for (entry, metadata) in &resolved {
        index.add(entry, metadata.as_ref());
    }
    index.built_at = Some(Utc::now());

    debug!(
        objects = index.object_count,
        tags = index.tags.len(),
        words = index.words.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Built collection index"
    );
    Ok(index)
}

/// Outcome of one refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Swapped { objects: usize, tags: usize, words: usize },
    /// Another refresh was already running.
    Skipped,
    /// The walk failed; the previous snapshot stays.
    Failed(String),
}

/// Process-wide index state.
pub struct IndexHandle {
    current: ArcSwap<CollectionIndex>,
    guard: RunGuard,
}

impl Default for IndexHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexHandle {
    /// Start with an empty snapshot.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(CollectionIndex::default()),
            guard: RunGuard::new(),
        }
    }

    /// The current snapshot. Hold it for the whole request.
    pub fn snapshot(&self) -> Arc<CollectionIndex> {
        self.current.load_full()
    }

    /// Rebuild from the store and swap the result in.
    pub fn refresh(&self, store: &dyn ObjectStore, naming: &Naming) -> RefreshOutcome {
        let Some(_permit) = self.guard.try_acquire() else {
            debug!("Index refresh already running, skipping");
            return RefreshOutcome::Skipped;
        };

        match build_index(store, naming) {
            Ok(index) => {
                let outcome = RefreshOutcome::Swapped {
                    objects: index.object_count,
                    tags: index.tags.len(),
                    words: index.words.len(),
                };
                self.current.store(Arc::new(index));
                info!(?outcome, "Collection index refreshed");
                outcome
            }
            Err(e) => {
                warn!(error = %e, "Collection index refresh failed, keeping previous snapshot");
                RefreshOutcome::Failed(e.to_string())
            }
        }
    }

    /// Replace the snapshot directly.
    pub fn install(&self, index: CollectionIndex) {
        self.current.store(Arc::new(index));
    }
}
