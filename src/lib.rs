//! # bucketgal
//!
//! Browse a flat object-store bucket as a paginated gallery. Keys are plain
//! strings with no real hierarchy; bucketgal layers virtual directories,
//! normalized metadata, preview thumbnails and a tag/word search index on top.
//!
//! # Architecture: Request Path and Background Tasks
//!
//! ```text
//! request  ─▶ listing::Paginator ─▶ browse::fetch_items ─▶ BrowsePage
//!          ─▶ Gallery::preview   ─▶ cache ─▶ imaging::PreviewPipeline
//!          ─▶ Gallery::search_page / tag_page ─▶ index snapshot
//!
//! periodic ─▶ IndexHandle::refresh   (rebuild, then swap the snapshot)
//!          ─▶ PreviewGenerator::run  (write stale previews to disk)
//! ```
//!
//! Request handling never writes shared state other than the caches. The
//! index is an immutable snapshot behind an atomic pointer: a refresh builds
//! a complete new index and swaps it in, so readers see either the old one
//! or the new one.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`store`] | Object store capability trait plus in-memory and filesystem backends |
//! | [`naming`] | Directory-marker and sort-padding key convention |
//! | [`cursor`] | Opaque page tokens: base64url of the store continuation query |
//! | [`listing`] | Virtual directory paginator over prefix/delimiter listing |
//! | [`metadata`] | Raw custom metadata → normalized [`metadata::Metadata`] |
//! | [`imaging`] | Preview rendering: bitmap decode, PDF and SVG rasterizers, compositing |
//! | [`cache`] | Per-entry TTL cache for previews and metadata |
//! | [`index`] | Tag and word index, snapshot handle, tag/search reads |
//! | [`browse`] | Page item fan-out and the [`browse::Gallery`] facade |
//! | [`pregen`] | Batch preview generation to a local directory |
//! | [`schedule`] | Run-once guard and periodic background thread |
//! | [`config`] | `bucketgal.toml` loading, merging, and validation |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`types`] | Shared entry types |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Directories Are a Naming Convention
//!
//! An object whose key ends with the directory marker (`-` by default) is a
//! directory; everything else is a file. Segments may start with a padding
//! token (`0000`) that forces directories to sort ahead of files under the
//! store's lexicographic order. Both are stripped for display:
//! `art/0000posters-` shows as `art/posters`.
//!
//! ## Exact Page Sizes Over Shallow Stores
//!
//! Stores may answer short while more objects exist. The paginator follows
//! the continuation until the page is full, so every page except the last
//! has exactly the configured size. The returned page token is the store's
//! own continuation, serialized, so resuming never skips or repeats keys.
//!
//! ## One Enum for Content Types
//!
//! A declared mime type resolves once to [`imaging::ContentKind`] (bitmap,
//! document, vector, unsupported) and the pipeline matches on it. Unknown
//! types fail closed with [`imaging::RenderError::UnsupportedFormat`].
//!
//! ## Rasterizers Behind Traits
//!
//! PDF and SVG rasterization sit behind [`imaging::DocumentRasterizer`] and
//! [`imaging::VectorRasterizer`]. Production uses `pdftoppm` and resvg;
//! tests substitute a recording mock.

pub mod browse;
pub mod cache;
pub mod config;
pub mod cursor;
pub mod imaging;
pub mod index;
pub mod listing;
pub mod logging;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod pregen;
pub mod schedule;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
