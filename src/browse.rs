//! Gallery facade: the operations an HTTP layer calls per request.
//!
//! [`Gallery`] wires the paginator, metadata resolver, preview pipeline,
//! caches and collection index together over one shared store. Every method
//! returns typed values; mapping them onto status codes is left to the
//! caller ([`ListError::is_client_error`], [`RenderError::is_not_found`]).
//!
//! ## Page items
//!
//! A listing page is turned into [`PageItem`]s by [`fetch_items`]:
//! directories need no store call, files get their metadata resolved in
//! parallel. A file whose metadata cannot be fetched still shows up with
//! default metadata. A file with no known content type is dropped.

use crate::cache::{TtlCache, metadata_key, preview_key};
use crate::config::GalleryConfig;
use crate::imaging::{PreviewArtifact, PreviewMode, PreviewPipeline, RenderError, mime_for_path};
use crate::index::{CollectionIndex, IndexHandle, IndexPage, RefreshOutcome, SearchHit};
use crate::listing::{ListError, ListingSettings, Paginator};
use crate::metadata::{self, Metadata};
use crate::naming::{Naming, directory_prefix};
use crate::schedule::{Periodic, spawn_periodic};
use crate::store::{ObjectStore, RawMetadata};
use crate::types::{EntryKind, IndexEntry, ObjectEntry};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// One renderable item on a directory page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PageItem {
    /// `path` is the marker key; `display_path` is what
    /// [`Gallery::list_page`] takes to open the directory.
    Directory {
        path: String,
        display_path: String,
        name: String,
    },
    File {
        path: String,
        name: String,
        mime: &'static str,
        metadata: Metadata,
    },
}

impl PageItem {
    pub fn path(&self) -> &str {
        match self {
            PageItem::Directory { path, .. } | PageItem::File { path, .. } => path,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            PageItem::Directory { .. } => EntryKind::Directory,
            PageItem::File { .. } => EntryKind::File,
        }
    }
}

/// A directory page ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowsePage {
    pub items: Vec<PageItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Title and description for link-unfurl tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OgTags {
    pub title: String,
    pub description: String,
}

/// Turn listing entries into page items, resolving file metadata in
/// parallel. Order follows `entries`.
pub fn fetch_items<F>(entries: &[ObjectEntry], resolve: F) -> Vec<PageItem>
where
    F: Fn(&str) -> Option<Metadata> + Sync,
{
    entries
        .par_iter()
        .filter_map(|entry| match entry.kind {
            EntryKind::Directory => Some(PageItem::Directory {
                path: entry.path.clone(),
                display_path: entry.display_path.clone(),
                name: entry.name.clone(),
            }),
            EntryKind::File => {
                let Some(mime) = mime_for_path(&entry.path) else {
                    debug!(path = %entry.path, "Skipping file with unknown content type");
                    return None;
                };
                let metadata = resolve(&entry.path)
                    .unwrap_or_else(|| metadata::normalize(&entry.path, &RawMetadata::default()));
                Some(PageItem::File {
                    path: entry.path.clone(),
                    name: entry.name.clone(),
                    mime,
                    metadata,
                })
            }
        })
        .collect()
}

pub struct Gallery {
    store: Arc<dyn ObjectStore>,
    naming: Naming,
    listing: ListingSettings,
    pipeline: PreviewPipeline,
    previews: TtlCache<PreviewArtifact>,
    metadata: TtlCache<Metadata>,
    ttl: Duration,
    index: IndexHandle,
    index_page_size: usize,
}

impl Gallery {
    /// Build from a validated config with the default rasterizers.
    pub fn from_config(store: Arc<dyn ObjectStore>, config: &GalleryConfig) -> Self {
        Self {
            store,
            naming: config.naming(),
            listing: config.listing_settings(),
            pipeline: PreviewPipeline::with_default_rasterizers(config.preview_settings()),
            previews: TtlCache::new(config.cache.max_entries),
            metadata: TtlCache::new(config.cache.max_entries),
            ttl: config.cache_ttl(),
            index: IndexHandle::new(),
            index_page_size: config.index.page_size,
        }
    }

    /// Swap the preview pipeline, e.g. for mock rasterizers.
    pub fn with_pipeline(mut self, pipeline: PreviewPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn naming(&self) -> &Naming {
        &self.naming
    }

    /// One page of the directory at `dir` (`""` for the root).
    pub fn list_page(&self, dir: &str, page_token: Option<&str>) -> Result<BrowsePage, ListError> {
        let paginator = Paginator::new(self.store.as_ref(), &self.naming, self.listing);
        let page = paginator.list(&directory_prefix(dir), page_token)?;
        let items = fetch_items(&page.entries, |path| self.metadata(path));
        Ok(BrowsePage {
            items,
            next_page_token: page.next_page_token,
        })
    }

    /// Resolved metadata for `path`, cached.
    pub fn metadata(&self, path: &str) -> Option<Metadata> {
        self.metadata
            .get_or_compute_some(&metadata_key(path), self.ttl, || {
                metadata::resolve(self.store.as_ref(), path)
            })
    }

    /// Rendered preview for `path`, cached. Failures are not cached.
    pub fn preview(&self, path: &str, mode: PreviewMode) -> Result<PreviewArtifact, RenderError> {
        self.previews
            .get_or_compute(&preview_key(path, mode), self.ttl, || {
                let bytes = self.store.get_bytes(path)?;
                self.pipeline.render_path(&bytes, path, mode)
            })
    }

    pub fn og_tags(&self, path: &str) -> OgTags {
        let meta = self
            .metadata(path)
            .unwrap_or_else(|| metadata::normalize(path, &RawMetadata::default()));
        OgTags {
            title: meta.title,
            description: meta.alt,
        }
    }

    /// The current index snapshot.
    pub fn snapshot(&self) -> Arc<CollectionIndex> {
        self.index.snapshot()
    }

    pub fn refresh_index(&self) -> RefreshOutcome {
        self.index.refresh(self.store.as_ref(), &self.naming)
    }

    pub fn tag_groups(&self) -> Vec<(String, usize)> {
        self.snapshot().tag_groups()
    }

    pub fn tag_page(&self, tag: &str, offset: usize) -> IndexPage<IndexEntry> {
        self.snapshot().tag_page(tag, offset, self.index_page_size)
    }

    pub fn search_page(
        &self,
        query: &str,
        kind: Option<EntryKind>,
        offset: usize,
    ) -> IndexPage<SearchHit> {
        self.snapshot()
            .search_page(query, kind, offset, self.index_page_size)
    }

    /// Refresh the index now and then every `interval` in the background.
    pub fn spawn_index_refresher(self: &Arc<Self>, interval: Duration) -> std::io::Result<Periodic> {
        let gallery = Arc::clone(self);
        spawn_periodic("index-refresh", interval, move || {
            gallery.refresh_index();
        })
    }
}
