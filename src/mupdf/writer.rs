//! PDF output through MuPDF's document writer
//!
//! Pages from any document MuPDF can open (reflowed HTML, images, PDF) are
//! replayed onto a new PDF page through a drawing device.

use std::path::Path;

use mupdf::{DocumentWriter, Matrix, Page, Rect};

use super::pixmap::{fit_matrix, page_size};

/// Options for the written PDF
#[derive(Debug, Clone, Default)]
pub struct PdfWriteSettings {
    /// User and owner password; enables AES-256 encryption
    pub password: Option<String>,
}

impl PdfWriteSettings {
    pub fn with_password(password: Option<String>) -> Self {
        Self { password }
    }

    /// MuPDF writer option string (`key=value` pairs separated by commas)
    pub fn option_string(&self) -> String {
        let mut options = vec!["compress".to_string()];
        if let Some(password) = &self.password {
            options.push("encrypt=aes-256".to_string());
            options.push(format!("user-password={}", password));
            options.push(format!("owner-password={}", password));
        }
        options.join(",")
    }

    /// Passwords cannot carry the option separators
    pub fn is_valid_password(password: &str) -> bool {
        !password.is_empty() && !password.contains(',') && !password.contains('=')
    }
}

/// Sequential PDF page writer
///
/// The output file is finalized when the writer is dropped. The bindings
/// expose no fallible close, so a failure at that point (disk full, for
/// example) is silent; callers re-open the file with
/// `convert::verify_written_pdf` before trusting it.
pub struct PdfPageWriter {
    inner: DocumentWriter,
    pages: usize,
}

impl PdfPageWriter {
    pub fn create(path: &Path, settings: &PdfWriteSettings) -> Result<Self, mupdf::Error> {
        let path_str = path.to_string_lossy();
        let inner = DocumentWriter::new(&path_str, "pdf", &settings.option_string())?;
        Ok(Self { inner, pages: 0 })
    }

    /// Copy `page` at its intrinsic size
    pub fn copy_page(&mut self, page: &Page) -> Result<(), mupdf::Error> {
        let bounds = page.bounds()?;
        let size = page_size(&bounds);
        let mediabox = Rect {
            x0: 0.0,
            y0: 0.0,
            x1: size.width,
            y1: size.height,
        };
        let ctm = Matrix::new(1.0, 0.0, 0.0, 1.0, -bounds.x0, -bounds.y0);
        self.emit(page, mediabox, &ctm)
    }

    /// Copy `page` stretched onto a `width x height` point media box
    pub fn copy_page_sized(&mut self, page: &Page, width: u32, height: u32) -> Result<(), mupdf::Error> {
        let bounds = page.bounds()?;
        let mediabox = Rect {
            x0: 0.0,
            y0: 0.0,
            x1: width as f32,
            y1: height as f32,
        };
        let ctm = fit_matrix(&bounds, width, height);
        self.emit(page, mediabox, &ctm)
    }

    fn emit(&mut self, page: &Page, mediabox: Rect, ctm: &Matrix) -> Result<(), mupdf::Error> {
        let device = self.inner.begin_page(mediabox)?;
        page.run(&device, ctm)?;
        self.inner.end_page(device)?;
        self.pages += 1;
        Ok(())
    }

    pub fn page_count(&self) -> usize {
        self.pages
    }
}
