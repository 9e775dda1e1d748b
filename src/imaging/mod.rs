//! Preview rendering: heterogeneous content in, fixed-canvas PNG out.
//!
//! | Content | Rasterizer |
//! |---|---|
//! | **PNG / JPEG** | `image` crate decoders |
//! | **PDF** (page 1) | external `pdftoppm` |
//! | **SVG** | `resvg` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for placement math (unit testable)
//! - **Parameters**: Content kinds, modes, and settings
//! - **Backend**: rasterizer traits + production implementations
//! - **Operations**: [`PreviewPipeline`], combining dispatch, rasterizers, and compositing

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod pdf_backend;
pub mod rust_backend;

pub use backend::{BackendError, DocumentRasterizer, OpenDocument, VectorRasterizer};
pub use calculations::{Placement, ceiling_canvas, fit_within};
pub use operations::{PreviewArtifact, PreviewPipeline, RenderError};
pub use params::{
    BitmapFormat, ContentKind, PreviewMode, PreviewSettings, mime_for_path, parse_hex_color,
};
pub use pdf_backend::PdftoppmRasterizer;
pub use rust_backend::ResvgRasterizer;
