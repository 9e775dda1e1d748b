//! PDF rasterization through poppler's `pdftoppm`.
//!
//! Opening a document validates the `%PDF-` header and stages the bytes in a
//! private temporary directory. Each page render runs
//!
//! ```text
//! pdftoppm -f N -l N -scale-to <edge> -png -singlefile in.pdf page
//! ```
//!
//! and decodes the resulting `page.png`. `edge` is the long side of a US
//! letter page at `scale` times 72 dpi, capped at [`MAX_RASTER_EDGE`]. The
//! child is killed if it outlives the rasterizer's timeout. The directory is
//! removed when the handle is dropped.

use super::backend::{BackendError, DocumentRasterizer, OpenDocument};
use super::rust_backend::MAX_RASTER_EDGE;
use image::RgbaImage;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, warn};

const PDF_MAGIC: &[u8] = b"%PDF-";
/// Long side of a US letter page in PDF points (11in at 72 per inch).
const LETTER_LONG_SIDE_PT: f32 = 792.0;
pub const DEFAULT_DOCUMENT_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct PdftoppmRasterizer {
    program: PathBuf,
    timeout: Duration,
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new("pdftoppm")
    }
}

impl PdftoppmRasterizer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_DOCUMENT_TIMEOUT,
        }
    }

    /// Kill a page render that runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

struct StagedPdf<'a> {
    program: &'a Path,
    timeout: Duration,
    dir: TempDir,
}

impl DocumentRasterizer for PdftoppmRasterizer {
    fn open_document<'a>(
        &'a self,
        bytes: &'a [u8],
    ) -> Result<Box<dyn OpenDocument + 'a>, BackendError> {
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(BackendError::ProcessingFailed(
                "Not a PDF document (missing %PDF- header)".into(),
            ));
        }
        let dir = tempfile::Builder::new().prefix("bucketgal-pdf").tempdir()?;
        std::fs::write(dir.path().join("in.pdf"), bytes)?;
        Ok(Box::new(StagedPdf {
            program: &self.program,
            timeout: self.timeout,
            dir,
        }))
    }
}

/// Pixel length of the rendered page's long side.
fn page_edge(scale: f32) -> u32 {
    let edge = (LETTER_LONG_SIDE_PT * scale).round().max(1.0);
    if edge >= MAX_RASTER_EDGE as f32 {
        MAX_RASTER_EDGE
    } else {
        edge as u32
    }
}

fn page_args(page: usize, edge: u32) -> Vec<String> {
    let page = page.to_string();
    vec![
        "-f".into(),
        page.clone(),
        "-l".into(),
        page,
        "-scale-to".into(),
        edge.to_string(),
        "-png".into(),
        "-singlefile".into(),
    ]
}

/// Wait for `child`, killing it once `timeout` has passed.
fn wait_with_deadline(
    child: &mut Child,
    program: &Path,
    timeout: Duration,
) -> Result<ExitStatus, BackendError> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        let elapsed = started.elapsed();
        if elapsed >= timeout {
            warn!(
                program = %program.display(),
                timeout_ms = timeout.as_millis() as u64,
                "Rasterizer timed out, killing it"
            );
            // Already exited between the poll and the kill is fine.
            let _ = child.kill();
            let _ = child.wait();
            return Err(BackendError::ProcessingFailed(format!(
                "{} timed out after {}ms",
                program.display(),
                timeout.as_millis()
            )));
        }
        std::thread::sleep(POLL_INTERVAL.min(timeout - elapsed));
    }
}

impl OpenDocument for StagedPdf<'_> {
    fn render_page(&self, index: usize, scale: f32) -> Result<RgbaImage, BackendError> {
        let edge = page_edge(scale);
        let input = self.dir.path().join("in.pdf");
        let stem = self.dir.path().join("page");
        let stderr_path = self.dir.path().join("stderr.log");

        debug!(program = %self.program.display(), page = index + 1, edge, "Rasterizing PDF page");
        let mut child = Command::new(self.program)
            .args(page_args(index + 1, edge))
            .arg(&input)
            .arg(&stem)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(File::create(&stderr_path)?)
            .spawn()
            .map_err(|e| {
                BackendError::ProcessingFailed(format!(
                    "Failed to run {}: {e}",
                    self.program.display()
                ))
            })?;

        let status = wait_with_deadline(&mut child, self.program, self.timeout)?;
        if !status.success() {
            let stderr = std::fs::read_to_string(&stderr_path).unwrap_or_default();
            return Err(BackendError::ProcessingFailed(format!(
                "{} exited with {}: {}",
                self.program.display(),
                status,
                stderr.trim()
            )));
        }

        let png = std::fs::read(stem.with_extension("png"))?;
        image::load_from_memory_with_format(&png, image::ImageFormat::Png)
            .map(|img| img.to_rgba8())
            .map_err(|e| BackendError::ProcessingFailed(format!("Failed to decode page: {e}")))
    }
}
