//! Core document types
//!
//! Format-agnostic types shared by the loaders, the caches and the session.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Document kind, selected from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Fixed-layout pages rendered to bitmaps (PDF)
    Raster,
    /// Reflowable markup pages (EPUB)
    Markup,
}

impl DocumentKind {
    /// Detect kind from file extension (case-insensitive, without the dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Raster),
            "epub" => Some(Self::Markup),
            _ => None,
        }
    }

    /// Detect kind from a file path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Raster => "pdf",
            DocumentKind::Markup => "epub",
        }
    }
}

/// Intrinsic page size in points
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Pixel dimensions of this page rendered at `scale`
    pub fn scaled(&self, scale: f32) -> (u32, u32) {
        (
            (self.width * scale).round().max(1.0) as u32,
            (self.height * scale).round().max(1.0) as u32,
        )
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0.0 {
            0.0
        } else {
            self.width / self.height
        }
    }
}

/// RGBA8 bitmap produced by page materialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA bytes, `width * height * 4` long
    pub pixels: Vec<u8>,
}

impl Bitmap {
    /// Create an opaque white bitmap
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![255; width as usize * height as usize * 4],
        }
    }

    pub fn from_image(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.into_raw(),
        }
    }

    /// Borrow as an `image` buffer; `None` if the pixel buffer length is inconsistent
    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    /// Size of the pixel buffer in bytes
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

/// One markup page: serialized, self-contained HTML
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupPage {
    /// Position of the content document inside the archive (`None` for placeholders)
    pub source: Option<String>,
    /// Rewritten markup with workspace-resolvable asset references
    pub html: String,
}

impl MarkupPage {
    /// Synthetic page shown when an archive has no content documents
    pub fn placeholder() -> Self {
        Self {
            source: None,
            html: "<html><head><title>Empty</title></head><body><p>This book has no readable content.</p></body></html>".to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.source.is_none()
    }
}

/// Raster page layout in the single-page view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// One page at a time
    #[default]
    Vertical,
    /// Two-page spreads
    Horizontal,
}

/// Single page vs. all pages stacked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Single,
    Continuous,
}

/// Viewport in device-independent pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Shrink by `margin` on each axis, never below one pixel
    pub fn inset(&self, margin: f32) -> Self {
        Self {
            width: (self.width - margin).max(1.0),
            height: (self.height - margin).max(1.0),
        }
    }
}

/// Identity of a loaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub path: PathBuf,
    pub title: String,
    pub kind: DocumentKind,
}

impl DocumentInfo {
    pub fn new<P: AsRef<Path>>(path: P, kind: DocumentKind) -> Self {
        let path = path.as_ref().to_path_buf();
        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string());
        Self { path, title, kind }
    }
}
