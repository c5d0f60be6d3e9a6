//! Document error types
//!
//! Error taxonomy shared by the loaders, the rasterizer and the session.

use thiserror::Error;

/// Failure while opening a document container
#[derive(Debug, Error)]
pub enum LoadError {
    /// Container is malformed or unreadable by the backend
    #[error("Corrupt document: {0}")]
    Corrupt(String),

    /// Every password attempt was rejected
    #[error("Authentication failed: wrong password")]
    AuthFailed,

    /// The password prompt was dismissed
    #[error("Load cancelled")]
    Cancelled,

    /// Filesystem failure (open, scratch directory, extraction)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure while materializing a page
#[derive(Debug, Error)]
pub enum RenderError {
    /// Page index outside `[0, page_count)`
    #[error("Page {index} out of range (page count {page_count})")]
    OutOfRange { index: usize, page_count: usize },

    /// Rasterization backend error
    #[error("Render backend error: {0}")]
    Backend(String),
}

/// Unified document error type
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Extension is neither `.pdf` nor `.epub`
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl From<mupdf::Error> for LoadError {
    fn from(err: mupdf::Error) -> Self {
        LoadError::Corrupt(err.to_string())
    }
}

impl From<mupdf::Error> for RenderError {
    fn from(err: mupdf::Error) -> Self {
        RenderError::Backend(err.to_string())
    }
}

impl From<zip::result::ZipError> for LoadError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => LoadError::Io(e),
            other => LoadError::Corrupt(other.to_string()),
        }
    }
}

impl LoadError {
    /// Whether the failure came from the user dismissing the prompt
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LoadError::Cancelled)
    }
}
