//! Batch preview generation.
//!
//! Walks every file in the bucket and writes a browse-mode preview to
//! `<output_dir>/<key>.png` for each object that is newer than its existing
//! preview. Rendering runs in parallel; each preview is written to a temp
//! file in the target directory and renamed into place, so readers never
//! see a half-written PNG.
//!
//! A run that starts while another is in progress returns `Ok(None)`
//! without doing anything.

use crate::imaging::{ContentKind, PreviewMode, PreviewPipeline, RenderError};
use crate::naming::Naming;
use crate::schedule::RunGuard;
use crate::store::{ObjectStore, StoreError, StoreObject};
use crate::types::EntryKind;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
enum ItemError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenerateStats {
    /// File objects considered.
    pub checked: usize,
    pub written: usize,
    /// Up to date, or not previewable.
    pub skipped: usize,
    pub failed: usize,
}

enum Outcome {
    Written,
    Skipped,
    Failed,
}

pub struct PreviewGenerator {
    store: Arc<dyn ObjectStore>,
    naming: Naming,
    pipeline: PreviewPipeline,
    output_dir: PathBuf,
    guard: RunGuard,
}

impl PreviewGenerator {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        naming: Naming,
        pipeline: PreviewPipeline,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            naming,
            pipeline,
            output_dir: output_dir.into(),
            guard: RunGuard::new(),
        }
    }

    /// Local preview path for an object key, or `None` when the key would
    /// land outside the output directory (`..`, absolute, or prefixed).
    pub fn output_path(&self, key: &str) -> Option<PathBuf> {
        let mut target = self.output_dir.clone();
        for component in Path::new(&format!("{key}.png")).components() {
            match component {
                Component::Normal(segment) => target.push(segment),
                _ => return None,
            }
        }
        Some(target)
    }

    /// Generate every stale preview. `Ok(None)` if a run is already going.
    pub fn run(&self) -> Result<Option<GenerateStats>, StoreError> {
        let Some(_permit) = self.guard.try_acquire() else {
            debug!("Preview generation already running, skipping");
            return Ok(None);
        };

        let started = Instant::now();
        let files: Vec<StoreObject> = self
            .store
            .list_all()?
            .into_iter()
            .filter(|o| self.naming.classify(&o.key) == Some(EntryKind::File))
            .collect();

        let outcomes: Vec<Outcome> = files.par_iter().map(|o| self.process(o)).collect();

        let mut stats = GenerateStats {
            checked: files.len(),
            ..GenerateStats::default()
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Written => stats.written += 1,
                Outcome::Skipped => stats.skipped += 1,
                Outcome::Failed => stats.failed += 1,
            }
        }

        info!(
            checked = stats.checked,
            written = stats.written,
            skipped = stats.skipped,
            failed = stats.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Preview generation finished"
        );
        Ok(Some(stats))
    }

    fn process(&self, object: &StoreObject) -> Outcome {
        if matches!(ContentKind::from_path(&object.key), ContentKind::Unsupported(_)) {
            return Outcome::Skipped;
        }
        let Some(target) = self.output_path(&object.key) else {
            warn!(key = %object.key, "Key escapes the output directory, not writing a preview");
            return Outcome::Failed;
        };
        if !is_stale(object.created, &target) {
            return Outcome::Skipped;
        }
        match self.generate(&object.key, &target) {
            Ok(()) => {
                debug!(key = %object.key, path = %target.display(), "Wrote preview");
                Outcome::Written
            }
            Err(e) => {
                warn!(key = %object.key, error = %e, "Preview generation failed");
                Outcome::Failed
            }
        }
    }

    fn generate(&self, key: &str, target: &Path) -> Result<(), ItemError> {
        let bytes = self.store.get_bytes(key).map_err(RenderError::from)?;
        let artifact = self
            .pipeline
            .render_path(&bytes, key, PreviewMode::ShrinkToCeiling)?;
        write_atomic(target, &artifact.bytes)?;
        Ok(())
    }
}

/// Whether the preview at `target` is missing or older than `created`.
/// Objects without a creation time are only generated when missing.
fn is_stale(created: Option<DateTime<Utc>>, target: &Path) -> bool {
    let Ok(modified) = fs::metadata(target).and_then(|m| m.modified()) else {
        return true;
    };
    match created {
        Some(created) => created > DateTime::<Utc>::from(modified),
        None => false,
    }
}

fn write_atomic(target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = target.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}
