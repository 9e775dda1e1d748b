//! The preview rendering pipeline.
//!
//! Each call walks one path through:
//!
//! ```text
//! Dispatch ─┬─ Bitmap   → decode ───────────────────────────┐
//!           ├─ Document → open, render page 1 at oversample ─┼─→ Composite → PNG
//!           ├─ Vector   → rasterize, flatten onto margin ────┘
//!           └─ Unsupported → UnsupportedFormat
//! ```
//!
//! Every stage either produces a complete bitmap or fails the whole call;
//! no partially drawn canvas is ever encoded. Output is always PNG, which
//! encodes identical pixels to identical bytes.

use super::backend::{BackendError, DocumentRasterizer, VectorRasterizer};
use super::calculations::{ceiling_canvas, fit_within, vector_canvas};
use super::params::{ContentKind, PreviewMode, PreviewSettings};
use super::pdf_backend::PdftoppmRasterizer;
use super::rust_backend::{ResvgRasterizer, decode_bitmap};
use crate::store::StoreError;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Render failed: {0}")]
    RenderFailure(String),
    #[error(transparent)]
    Fetch(#[from] StoreError),
}

impl From<BackendError> for RenderError {
    fn from(e: BackendError) -> Self {
        RenderError::RenderFailure(e.to_string())
    }
}

impl RenderError {
    /// Whether the caller should report "no preview" rather than a server
    /// fault.
    pub fn is_not_found(&self) -> bool {
        !matches!(
            self,
            RenderError::Fetch(StoreError::Unavailable(_) | StoreError::Io(_))
        )
    }
}

/// A rendered preview. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewArtifact {
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl PreviewArtifact {
    /// SHA-256 of the encoded bytes, hex.
    pub fn etag(&self) -> String {
        format!("{:x}", Sha256::digest(&self.bytes))
    }
}

/// Format-dispatching renderer.
pub struct PreviewPipeline {
    settings: PreviewSettings,
    documents: Box<dyn DocumentRasterizer>,
    vectors: Box<dyn VectorRasterizer>,
}

impl PreviewPipeline {
    pub fn new(
        settings: PreviewSettings,
        documents: Box<dyn DocumentRasterizer>,
        vectors: Box<dyn VectorRasterizer>,
    ) -> Self {
        Self {
            settings,
            documents,
            vectors,
        }
    }

    /// Pipeline with the production rasterizers: `pdftoppm` on `PATH`, bounded
    /// by `settings.document_timeout`, and resvg.
    pub fn with_default_rasterizers(settings: PreviewSettings) -> Self {
        let documents = PdftoppmRasterizer::default().with_timeout(settings.document_timeout);
        Self::new(
            settings,
            Box::new(documents),
            Box::new(ResvgRasterizer::new()),
        )
    }

    pub fn settings(&self) -> &PreviewSettings {
        &self.settings
    }

    /// Render `bytes` of declared type `mime` into a preview.
    pub fn render(
        &self,
        bytes: &[u8],
        mime: &str,
        mode: PreviewMode,
    ) -> Result<PreviewArtifact, RenderError> {
        let kind = ContentKind::from_mime(mime);
        let source = self.rasterize(&kind, bytes)?;
        let (w, h) = source.dimensions();
        if w == 0 || h == 0 {
            return Err(RenderError::RenderFailure(format!(
                "{mime} rasterized to an empty {w}x{h} bitmap"
            )));
        }

        let canvas = self.composite(&source, mode);
        debug!(mime, %mode, source = ?(w, h), canvas = ?canvas.dimensions(), "Rendered preview");
        encode_png(&canvas)
    }

    /// Render with the declared type derived from the object path.
    pub fn render_path(
        &self,
        bytes: &[u8],
        path: &str,
        mode: PreviewMode,
    ) -> Result<PreviewArtifact, RenderError> {
        let mime = super::params::mime_for_path(path).unwrap_or("application/octet-stream");
        self.render(bytes, mime, mode)
    }

    fn rasterize(&self, kind: &ContentKind, bytes: &[u8]) -> Result<RgbaImage, RenderError> {
        match kind {
            ContentKind::Bitmap(format) => Ok(decode_bitmap(bytes, *format)?),
            ContentKind::Document => {
                let doc = self.documents.open_document(bytes)?;
                Ok(doc.render_page(0, self.settings.document_scale)?)
            }
            ContentKind::Vector => {
                let raster = self.vectors.rasterize(bytes, self.settings.vector_scale)?;
                Ok(self.flatten_vector(&raster))
            }
            ContentKind::Unsupported(declared) => {
                Err(RenderError::UnsupportedFormat(declared.clone()))
            }
        }
    }

    /// Flatten transparent vector output onto a white working canvas with a
    /// margin on every side.
    fn flatten_vector(&self, raster: &RgbaImage) -> RgbaImage {
        let margin = self.settings.vector_margin;
        let (w, h) = vector_canvas(raster.dimensions(), margin);
        let mut canvas = RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]));
        imageops::overlay(&mut canvas, raster, margin as i64, margin as i64);
        canvas
    }

    fn composite(&self, source: &RgbaImage, mode: PreviewMode) -> RgbaImage {
        let s = &self.settings;
        let canvas_size = match mode {
            PreviewMode::PadToCanvas => (s.canvas_width, s.canvas_height),
            PreviewMode::ShrinkToCeiling => ceiling_canvas(source.dimensions(), s.max_dim),
        };
        let placement = fit_within(source.dimensions(), canvas_size);

        let [r, g, b] = s.background;
        let mut canvas = RgbaImage::from_pixel(canvas_size.0, canvas_size.1, Rgba([r, g, b, 255]));
        let scaled = if (placement.width, placement.height) == source.dimensions() {
            source.clone()
        } else {
            imageops::resize(source, placement.width, placement.height, FilterType::Lanczos3)
        };
        imageops::overlay(&mut canvas, &scaled, placement.x as i64, placement.y as i64);
        canvas
    }
}

fn encode_png(canvas: &RgbaImage) -> Result<PreviewArtifact, RenderError> {
    // The canvas is opaque; drop alpha before encoding.
    let rgb = image::DynamicImage::ImageRgba8(canvas.clone()).to_rgb8();
    let mut bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut bytes)
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| RenderError::RenderFailure(format!("PNG encode failed: {e}")))?;
    Ok(PreviewArtifact {
        mime_type: "image/png",
        bytes,
        width: rgb.width(),
        height: rgb.height(),
    })
}
