//! PDF rasterizer
//!
//! Opens a PDF container through MuPDF, authenticates protected files via the
//! caller's [`PasswordPrompt`], and renders pages or two-page spreads to RGBA
//! bitmaps at arbitrary scale.

use std::path::{Path, PathBuf};

use image::{imageops, Rgba, RgbaImage};
use mupdf::{Colorspace, Document};
use tracing::{debug, info, warn};

use crate::document::{
    Bitmap, LoadError, PageRasterizer, PageSize, PasswordPrompt, RenderError, Viewport,
};
use crate::mupdf::{fit_matrix, page_size, pixmap_to_bitmap};
use crate::session::zoom::{MAX_SCALE, MIN_SCALE};

/// Default number of wrong passwords tolerated before giving up
pub const DEFAULT_PASSWORD_ATTEMPTS: u32 = 3;

/// Rasterizer for one open PDF container
pub struct PdfRasterizer {
    /// Open MuPDF document; `None` after [`close`](PdfRasterizer::close)
    doc: Option<Document>,
    path: PathBuf,
    /// Intrinsic page sizes, collected once at open
    page_sizes: Vec<PageSize>,
}

impl std::fmt::Debug for PdfRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfRasterizer")
            .field("path", &self.path)
            .field("pages", &self.page_sizes.len())
            .field("open", &self.doc.is_some())
            .finish()
    }
}

impl PdfRasterizer {
    /// Open a PDF, prompting for a password if the file is protected
    ///
    /// The prompt is consulted at most `max_attempts` times. A `None` or empty
    /// answer aborts with [`LoadError::Cancelled`]; running out of attempts
    /// yields [`LoadError::AuthFailed`].
    pub fn open<P: AsRef<Path>>(
        path: P,
        prompt: &mut dyn PasswordPrompt,
        max_attempts: u32,
    ) -> Result<Self, LoadError> {
        let path = path.as_ref().to_path_buf();

        // Surface missing/unreadable files as IO errors, not as corrupt containers
        std::fs::File::open(&path)?;

        let path_str = path.to_string_lossy();
        let mut doc = Document::open(&*path_str)?;

        if doc.needs_password()? {
            authenticate(&mut doc, prompt, max_attempts)?;
        }

        let count = doc.page_count()?.max(0) as usize;
        if count == 0 {
            return Err(LoadError::Corrupt(format!(
                "{} contains no pages",
                path.display()
            )));
        }
        let mut page_sizes = Vec::with_capacity(count);
        for index in 0..count {
            let page = doc.load_page(index as i32)?;
            page_sizes.push(page_size(&page.bounds()?));
        }

        info!(path = %path.display(), pages = count, "Opened PDF");

        Ok(Self {
            doc: Some(doc),
            path,
            page_sizes,
        })
    }

    /// Source path of the container
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.doc.is_some()
    }

    /// Render pages `index` and `index + 1` side by side
    ///
    /// Falls back to the single page when `index` is the last page.
    pub fn render_spread(&self, index: usize, scale: f32) -> Result<Bitmap, RenderError> {
        let left = self.render_page(index, scale)?;
        if index + 1 >= self.page_count() {
            return Ok(left);
        }
        let right = self.render_page(index + 1, scale)?;
        compose_spread(&left, &right)
    }

    /// Scale that fits the first page inside `viewport`, clamped to the zoom domain
    pub fn initial_scale(&self, viewport: Viewport) -> f32 {
        let Some(first) = self.page_sizes.first() else {
            return 1.0;
        };
        if first.width <= 0.0 || first.height <= 0.0 {
            return 1.0;
        }
        let fit = (viewport.width / first.width).min(viewport.height / first.height);
        if !fit.is_finite() {
            return 1.0;
        }
        fit.clamp(MIN_SCALE, MAX_SCALE)
    }

    /// Release the underlying container handle; idempotent
    pub fn close(&mut self) {
        if self.doc.take().is_some() {
            debug!(path = %self.path.display(), "Closed PDF");
        }
    }

    fn document(&self) -> Result<&Document, RenderError> {
        self.doc
            .as_ref()
            .ok_or_else(|| RenderError::Backend("document is closed".to_string()))
    }
}

impl PageRasterizer for PdfRasterizer {
    fn page_count(&self) -> usize {
        self.page_sizes.len()
    }

    fn page_size(&self, index: usize) -> Result<PageSize, RenderError> {
        self.check_index(index)?;
        Ok(self.page_sizes[index])
    }

    fn render_page(&self, index: usize, scale: f32) -> Result<Bitmap, RenderError> {
        self.check_index(index)?;
        let scale = sanitize_scale(scale);
        let doc = self.document()?;

        let page = doc.load_page(index as i32)?;
        let bounds = page.bounds()?;
        let (width, height) = page_size(&bounds).scaled(scale);
        let matrix = fit_matrix(&bounds, width, height);

        // Opaque pixmap: MuPDF clears it to white before drawing
        let colorspace = Colorspace::device_rgb();
        let pixmap = page.to_pixmap(&matrix, &colorspace, false, true)?;
        pixmap_to_bitmap(&pixmap)
    }
}

impl Drop for PdfRasterizer {
    fn drop(&mut self) {
        self.close();
    }
}

fn authenticate(
    doc: &mut Document,
    prompt: &mut dyn PasswordPrompt,
    max_attempts: u32,
) -> Result<(), LoadError> {
    for attempt in 1..=max_attempts.max(1) {
        let password = match prompt.request_password(attempt) {
            Some(password) if !password.is_empty() => password,
            _ => {
                debug!(attempt, "Password prompt cancelled");
                return Err(LoadError::Cancelled);
            }
        };

        if doc.authenticate(&password)? {
            debug!(attempt, "PDF authenticated");
            return Ok(());
        }
        warn!(attempt, max_attempts, "Wrong PDF password");
    }
    Err(LoadError::AuthFailed)
}

/// Non-positive or non-finite scales render at 1.0
fn sanitize_scale(scale: f32) -> f32 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

/// Place two bitmaps left to right on a white canvas, top-aligned
fn compose_spread(left: &Bitmap, right: &Bitmap) -> Result<Bitmap, RenderError> {
    let invalid = || RenderError::Backend("inconsistent bitmap buffer".to_string());
    let left_img = left.to_image().ok_or_else(invalid)?;
    let right_img = right.to_image().ok_or_else(invalid)?;

    let width = left.width + right.width;
    let height = left.height.max(right.height);
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    imageops::replace(&mut canvas, &left_img, 0, 0);
    imageops::replace(&mut canvas, &right_img, left.width as i64, 0);

    Ok(Bitmap::from_image(canvas))
}
