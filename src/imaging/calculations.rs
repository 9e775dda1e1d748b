//! Pure calculation functions for preview geometry.
//!
//! All functions here are pure and testable without any I/O or images.

/// Where a scaled source lands on a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Scaled source width.
    pub width: u32,
    /// Scaled source height.
    pub height: u32,
    /// Left gutter.
    pub x: u32,
    /// Top gutter.
    pub y: u32,
}

/// Scale `source` to fit inside `canvas` preserving aspect ratio, and center
/// it with symmetric gutters.
///
/// The ratio is `min(canvas_w / src_w, canvas_h / src_h)`. The source is
/// never cropped, and the scaled size is clamped to `1..=canvas` so rounding
/// can neither overflow the canvas nor collapse a thin source to nothing.
///
/// # Examples
/// ```
/// # use bucketgal::imaging::fit_within;
/// // Portrait onto a 1200x600 canvas: height-limited, side gutters.
/// let p = fit_within((300, 600), (1200, 600));
/// assert_eq!((p.width, p.height, p.x, p.y), (300, 600, 450, 0));
/// ```
pub fn fit_within(source: (u32, u32), canvas: (u32, u32)) -> Placement {
    let (src_w, src_h) = (source.0.max(1) as f64, source.1.max(1) as f64);
    let (cv_w, cv_h) = canvas;

    let ratio = (cv_w as f64 / src_w).min(cv_h as f64 / src_h);
    let width = ((src_w * ratio).round() as u32).clamp(1, cv_w.max(1));
    let height = ((src_h * ratio).round() as u32).clamp(1, cv_h.max(1));

    Placement {
        width,
        height,
        x: cv_w.saturating_sub(width) / 2,
        y: cv_h.saturating_sub(height) / 2,
    }
}

/// Canvas for shrink-to-ceiling mode: each axis is capped at `max_dim`
/// independently.
pub fn ceiling_canvas(source: (u32, u32), max_dim: u32) -> (u32, u32) {
    (source.0.min(max_dim), source.1.min(max_dim))
}

/// Working canvas for a rasterized vector image: the scaled content plus a
/// margin on every side.
pub fn vector_canvas(scaled: (u32, u32), margin: u32) -> (u32, u32) {
    (
        scaled.0.saturating_add(margin.saturating_mul(2)),
        scaled.1.saturating_add(margin.saturating_mul(2)),
    )
}

/// Reduce an oversampling `scale` so that the longer edge of an
/// `intrinsic`-sized image stays within `max_edge` pixels.
pub fn bounded_scale(intrinsic: (f32, f32), scale: f32, max_edge: u32) -> f32 {
    let longer = intrinsic.0.max(intrinsic.1);
    if longer <= 0.0 {
        return scale;
    }
    scale.min(max_edge as f32 / longer)
}
