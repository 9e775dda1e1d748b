//! Parameter types for preview rendering.
//!
//! These types describe *what* to render, not *how*. They are the interface
//! between callers (the gallery, the pre-generator, the CLI) and the
//! [`operations`](super::operations) pipeline.
//!
//! ## Types
//!
//! - [`ContentKind`]: Closed set of renderable content, resolved once from a MIME type or path.
//! - [`PreviewMode`]: Pad-to-canvas (link unfurls) or shrink-to-ceiling (browse thumbnails).
//! - [`PreviewSettings`]: Canvas sizes, background fill, and rasterizer oversampling.

use super::pdf_backend::DEFAULT_DOCUMENT_TIMEOUT;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Bitmap formats that pass straight into compositing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitmapFormat {
    Png,
    Jpeg,
}

impl BitmapFormat {
    pub fn image_format(self) -> image::ImageFormat {
        match self {
            BitmapFormat::Png => image::ImageFormat::Png,
            BitmapFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

/// What kind of content a declared type is, for rendering purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    Bitmap(BitmapFormat),
    /// Paged document; only the first page is rendered.
    Document,
    Vector,
    /// No rasterizer exists. Carries the declared type for error reporting.
    Unsupported(String),
}

impl ContentKind {
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or(mime)
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => ContentKind::Bitmap(BitmapFormat::Png),
            "image/jpeg" | "image/jpg" => ContentKind::Bitmap(BitmapFormat::Jpeg),
            "application/pdf" => ContentKind::Document,
            "image/svg+xml" => ContentKind::Vector,
            _ => ContentKind::Unsupported(mime.to_string()),
        }
    }

    pub fn from_path(path: &str) -> Self {
        match mime_for_path(path) {
            Some(mime) => Self::from_mime(mime),
            None => ContentKind::Unsupported(path.to_string()),
        }
    }
}

/// MIME type for an object key, by extension (case-insensitive).
pub fn mime_for_path(path: &str) -> Option<&'static str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = name.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "txt" => Some("text/plain"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// How the rasterized source is composited into the final preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreviewMode {
    /// Fixed canvas, letterboxed (social link unfurls).
    PadToCanvas,
    /// Canvas capped per axis at a ceiling (in-gallery browsing).
    ShrinkToCeiling,
}

impl PreviewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PreviewMode::PadToCanvas => "og",
            PreviewMode::ShrinkToCeiling => "browse",
        }
    }
}

impl fmt::Display for PreviewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreviewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "og" | "pad" => Ok(PreviewMode::PadToCanvas),
            "browse" | "ceiling" => Ok(PreviewMode::ShrinkToCeiling),
            other => Err(format!("unknown preview mode '{other}' (expected og or browse)")),
        }
    }
}

/// Rendering parameters shared by every preview.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewSettings {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub max_dim: u32,
    /// Solid fill behind the source in both modes.
    pub background: [u8; 3],
    /// Oversampling for document pages, high enough that compositing only
    /// ever shrinks.
    pub document_scale: f32,
    pub vector_scale: f32,
    /// White border around rasterized vector content, in output pixels.
    pub vector_margin: u32,
    /// Wall-clock limit on one external document render.
    pub document_timeout: Duration,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            canvas_width: 1200,
            canvas_height: 600,
            max_dim: 1600,
            background: [255, 255, 255],
            document_scale: 10.0,
            vector_scale: 8.0,
            vector_margin: 20,
            document_timeout: DEFAULT_DOCUMENT_TIMEOUT,
        }
    }
}

/// Parse a `#rrggbb` color.
pub fn parse_hex_color(s: &str) -> Option<[u8; 3]> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}
