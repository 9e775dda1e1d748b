//! Gallery configuration module.
//!
//! Handles loading, validating, and merging `bucketgal.toml`. Stock defaults
//! are the base layer; a user file overrides just the keys it names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [store]
//! root = "bucket"            # Directory served as the bucket
//!
//! [naming]
//! directory_marker = "-"     # Key suffix marking a synthetic directory
//! sort_padding = "0000"      # Token stripped from the start of path segments
//!
//! [listing]
//! page_size = 10             # Entries per directory page
//! # deadline_ms = 2000       # Bound on shallow-page follow-ups (unset = none)
//!
//! [preview]
//! canvas_width = 1200        # Link-unfurl canvas
//! canvas_height = 600
//! max_dim = 1600             # Browse thumbnail ceiling, per axis
//! background = "#ffffff"     # Fill behind letterboxed content
//! document_scale = 10.0      # PDF page oversampling
//! vector_scale = 8.0         # SVG oversampling
//! vector_margin = 20         # White border around SVG content, in pixels
//! document_timeout_secs = 30 # Kill a PDF render that runs longer
//!
//! [cache]
//! ttl_secs = 300             # Lifetime of cached previews and metadata
//! max_entries = 1000
//!
//! [index]
//! refresh_secs = 300         # Collection index rebuild interval
//! page_size = 10             # Items per tag/search page
//!
//! [pregen]
//! output_dir = "previews"    # Where batch-generated previews are written
//! interval_secs = 300        # Re-run interval for `pregen --watch`
//!
//! [logging]
//! level = "info"             # RUST_LOG overrides this
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{PreviewSettings, parse_hex_color};
use crate::listing::ListingSettings;
use crate::naming::Naming;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Name of the config file looked up in a directory.
pub const CONFIG_FILENAME: &str = "bucketgal.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Gallery configuration loaded from `bucketgal.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    pub store: StoreConfig,
    pub naming: NamingConfig,
    pub listing: ListingConfig,
    pub preview: PreviewConfig,
    pub cache: CacheConfig,
    pub index: IndexConfig,
    pub pregen: PregenConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub root: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: "bucket".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamingConfig {
    pub directory_marker: String,
    pub sort_padding: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            directory_marker: "-".to_string(),
            sort_padding: "0000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListingConfig {
    pub page_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            deadline_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub max_dim: u32,
    pub background: String,
    pub document_scale: f32,
    pub vector_scale: f32,
    pub vector_margin: u32,
    pub document_timeout_secs: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1200,
            canvas_height: 600,
            max_dim: 1600,
            background: "#ffffff".to_string(),
            document_scale: 10.0,
            vector_scale: 8.0,
            vector_margin: 20,
            document_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_entries: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    pub refresh_secs: u64,
    pub page_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            refresh_secs: 300,
            page_size: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PregenConfig {
    pub output_dir: String,
    pub interval_secs: u64,
}

impl Default for PregenConfig {
    fn default() -> Self {
        Self {
            output_dir: "previews".to_string(),
            interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl GalleryConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: &str| Err(ConfigError::Validation(msg.to_string()));

        if self.naming.directory_marker.is_empty() {
            return fail("naming.directory_marker must not be empty");
        }
        if self.naming.directory_marker.contains('/') || self.naming.sort_padding.contains('/') {
            return fail("naming tokens must not contain '/'");
        }
        if self.listing.page_size == 0 {
            return fail("listing.page_size must be at least 1");
        }
        if self.index.page_size == 0 {
            return fail("index.page_size must be at least 1");
        }
        let p = &self.preview;
        if p.canvas_width == 0 || p.canvas_height == 0 || p.max_dim == 0 {
            return fail("preview canvas dimensions must be non-zero");
        }
        if parse_hex_color(&p.background).is_none() {
            return fail("preview.background must be a #rrggbb color");
        }
        if !(p.document_scale > 0.0 && p.vector_scale > 0.0) {
            return fail("preview scales must be positive");
        }
        if p.document_timeout_secs == 0 {
            return fail("preview.document_timeout_secs must be at least 1");
        }
        if self.cache.max_entries == 0 {
            return fail("cache.max_entries must be at least 1");
        }
        if self.index.refresh_secs == 0 || self.pregen.interval_secs == 0 {
            return fail("refresh intervals must be at least 1 second");
        }
        if crate::logging::parse_level(&self.logging.level).is_none() {
            return fail("logging.level must be one of trace, debug, info, warn, error");
        }
        Ok(())
    }

    pub fn naming(&self) -> Naming {
        Naming::new(&self.naming.directory_marker, &self.naming.sort_padding)
    }

    pub fn listing_settings(&self) -> ListingSettings {
        ListingSettings {
            page_size: self.listing.page_size,
            deadline: self.listing.deadline_ms.map(Duration::from_millis),
        }
    }

    /// Preview settings. Call after [`validate`](Self::validate); an
    /// unparsable background falls back to white.
    pub fn preview_settings(&self) -> PreviewSettings {
        let p = &self.preview;
        PreviewSettings {
            canvas_width: p.canvas_width,
            canvas_height: p.canvas_height,
            max_dim: p.max_dim,
            background: parse_hex_color(&p.background).unwrap_or([255, 255, 255]),
            document_scale: p.document_scale,
            vector_scale: p.vector_scale,
            vector_margin: p.vector_margin,
            document_timeout: Duration::from_secs(p.document_timeout_secs),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(GalleryConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file doesn't exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<GalleryConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: GalleryConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a file path, falling back to defaults when the file is
/// absent.
pub fn load_config(path: &Path) -> Result<GalleryConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Returns a fully-commented stock `bucketgal.toml` with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# bucketgal configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Object store
# ---------------------------------------------------------------------------
[store]
# Local directory served as the bucket. Keys are paths relative to it;
# custom metadata lives in "<key>.meta.json" sidecar files.
root = "bucket"

# ---------------------------------------------------------------------------
# Synthetic directories
# ---------------------------------------------------------------------------
[naming]
# An object whose key ends with this suffix is shown as a directory.
directory_marker = "-"
# Stripped from the start of each path segment for display. Prefix directory
# markers with it so they sort ahead of files ("0000posters-").
sort_padding = "0000"

# ---------------------------------------------------------------------------
# Directory listing
# ---------------------------------------------------------------------------
[listing]
# Entries per page.
page_size = 10
# Upper bound in milliseconds on following short store responses before a
# partial page is returned with a resumable cursor. Unset = no bound.
# deadline_ms = 2000

# ---------------------------------------------------------------------------
# Preview rendering
# ---------------------------------------------------------------------------
[preview]
# Fixed canvas for social link unfurls (letterboxed).
canvas_width = 1200
canvas_height = 600
# Per-axis ceiling for in-gallery browse previews.
max_dim = 1600
# Fill color behind letterboxed content.
background = "#ffffff"
# Oversampling for PDF first pages (72 dpi * scale).
document_scale = 10.0
# Oversampling for SVG images, and the white margin drawn around them.
vector_scale = 8.0
vector_margin = 20
# Seconds before a stuck pdftoppm is killed and the preview fails.
document_timeout_secs = 30

# ---------------------------------------------------------------------------
# In-memory cache
# ---------------------------------------------------------------------------
[cache]
# Seconds a rendered preview or resolved metadata stays cached.
ttl_secs = 300
max_entries = 1000

# ---------------------------------------------------------------------------
# Tag and search index
# ---------------------------------------------------------------------------
[index]
# Seconds between full index rebuilds.
refresh_secs = 300
# Items per tag or search page.
page_size = 10

# ---------------------------------------------------------------------------
# Batch preview generation
# ---------------------------------------------------------------------------
[pregen]
# Previews are written to "<output_dir>/<key>.png".
output_dir = "previews"
# Seconds between runs with --watch.
interval_secs = 300

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
# trace, debug, info, warn or error. RUST_LOG takes precedence.
level = "info"
"##
}
