//! Format detection and loader dispatch
//!
//! The container kind is chosen from the file extension alone. Each format
//! module turns its container into one half of [`LoadedDocument`]:
//! - [`pdf::PdfRasterizer`]: raster pages materialized on demand
//! - [`epub::EpubDocument`]: rewritten markup pages backed by a scratch workspace

pub mod epub;
pub mod pdf;

use std::path::Path;

use crate::document::{DocumentError, DocumentKind};

/// Select the loader for `path` from its lowercase extension
pub fn detect_kind<P: AsRef<Path>>(path: P) -> Result<DocumentKind, DocumentError> {
    let path = path.as_ref();
    DocumentKind::from_path(path).ok_or_else(|| {
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_else(|| "(no extension)".to_string());
        DocumentError::UnsupportedFormat(ext)
    })
}

/// A successfully loaded document of either kind
#[derive(Debug)]
pub enum LoadedDocument {
    Raster(pdf::PdfRasterizer),
    Markup(epub::EpubDocument),
}

impl LoadedDocument {
    pub fn kind(&self) -> DocumentKind {
        match self {
            LoadedDocument::Raster(_) => DocumentKind::Raster,
            LoadedDocument::Markup(_) => DocumentKind::Markup,
        }
    }

    pub fn page_count(&self) -> usize {
        use crate::document::PageRasterizer;
        match self {
            LoadedDocument::Raster(pdf) => pdf.page_count(),
            LoadedDocument::Markup(epub) => epub.page_count(),
        }
    }

    /// Release the container handle or the scratch workspace; idempotent
    pub fn close(&mut self) {
        match self {
            LoadedDocument::Raster(pdf) => pdf.close(),
            LoadedDocument::Markup(epub) => epub.close(),
        }
    }
}
