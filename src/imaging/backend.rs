//! Rasterizer capabilities and shared types.
//!
//! The pipeline never parses documents or vector graphics itself. It calls two
//! capabilities:
//!
//! | Capability | Operations | Production implementation |
//! |---|---|---|
//! | [`DocumentRasterizer`] | `open_document`, then `render_page` on the handle | [`PdftoppmRasterizer`](super::pdf_backend::PdftoppmRasterizer) |
//! | [`VectorRasterizer`] | `rasterize` | [`ResvgRasterizer`](super::rust_backend::ResvgRasterizer) |
//!
//! Both return straight (non-premultiplied) RGBA bitmaps. Tests substitute
//! the recording mocks in [`tests`].

use image::RgbaImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Opens paged documents.
pub trait DocumentRasterizer: Send + Sync {
    /// Validate and open a document. The handle may borrow both the
    /// rasterizer and the input bytes.
    fn open_document<'a>(
        &'a self,
        bytes: &'a [u8],
    ) -> Result<Box<dyn OpenDocument + 'a>, BackendError>;
}

/// A successfully opened document.
pub trait OpenDocument {
    /// Render one page (0-based) at `scale` times its natural size.
    fn render_page(&self, index: usize, scale: f32) -> Result<RgbaImage, BackendError>;
}

/// Rasterizes vector images.
pub trait VectorRasterizer: Send + Sync {
    /// Render at `scale` times the image's intrinsic size onto a transparent
    /// bitmap.
    fn rasterize(&self, bytes: &[u8], scale: f32) -> Result<RgbaImage, BackendError>;
}
