//! Pure Rust rasterization: bitmap decoding and SVG rendering.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, JPEG) | `image::load_from_memory_with_format` |
//! | Parse SVG | `resvg::usvg::Tree::from_data` |
//! | Render SVG | `resvg::render` onto a `tiny_skia::Pixmap` |
//!
//! Everything is statically linked into the binary.

use super::backend::{BackendError, VectorRasterizer};
use super::calculations::bounded_scale;
use super::params::BitmapFormat;
use image::RgbaImage;
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg;

/// Longest edge a vector rasterization may produce.
pub const MAX_RASTER_EDGE: u32 = 8192;

/// Decode PNG or JPEG bytes into straight RGBA.
pub fn decode_bitmap(bytes: &[u8], format: BitmapFormat) -> Result<RgbaImage, BackendError> {
    image::load_from_memory_with_format(bytes, format.image_format())
        .map(|img| img.to_rgba8())
        .map_err(|e| BackendError::ProcessingFailed(format!("Failed to decode {format:?}: {e}")))
}

/// SVG rasterizer built on resvg.
///
/// Text elements render only if fonts are loaded into the parser options;
/// the default options load none.
#[derive(Default)]
pub struct ResvgRasterizer {
    max_edge: Option<u32>,
}

impl ResvgRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override [`MAX_RASTER_EDGE`].
    pub fn with_max_edge(max_edge: u32) -> Self {
        Self {
            max_edge: Some(max_edge),
        }
    }
}

impl VectorRasterizer for ResvgRasterizer {
    fn rasterize(&self, bytes: &[u8], scale: f32) -> Result<RgbaImage, BackendError> {
        let tree = usvg::Tree::from_data(bytes, &usvg::Options::default())
            .map_err(|e| BackendError::ProcessingFailed(format!("Failed to parse SVG: {e}")))?;

        let size = tree.size();
        let scale = bounded_scale(
            (size.width(), size.height()),
            scale,
            self.max_edge.unwrap_or(MAX_RASTER_EDGE),
        );
        let width = (size.width() * scale).ceil() as u32;
        let height = (size.height() * scale).ceil() as u32;

        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            BackendError::ProcessingFailed(format!("Invalid SVG raster size {width}x{height}"))
        })?;
        resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

        // tiny-skia stores premultiplied alpha; compositing expects straight.
        let mut raw = Vec::with_capacity(pixmap.data().len());
        for px in pixmap.pixels() {
            let c = px.demultiply();
            raw.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        RgbaImage::from_raw(width, height, raw).ok_or_else(|| {
            BackendError::ProcessingFailed("SVG raster buffer size mismatch".into())
        })
    }
}
