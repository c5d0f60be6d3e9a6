//! fereader: document ingestion and page rendering for a PDF/EPUB reader
//!
//! The crate turns two unrelated container formats into one navigable page
//! sequence for a display shell, and generates new containers from text or
//! images.
//!
//! # Modules
//!
//! - `document`: page model, errors, rasterizer traits and bitmap caches
//! - `formats`: format detection, the PDF rasterizer and the EPUB unpacker
//! - `session`: navigation, zoom and the consolidated reader state
//! - `convert`: text/image → PDF/EPUB generation
//! - `config`: reader configuration
//! - `mupdf`: helpers over the MuPDF bindings

pub mod config;
pub mod convert;
pub mod document;
pub mod formats;
pub mod mupdf;
pub mod session;

pub use config::ReaderConfig;
pub use document::{DocumentError, DocumentKind, LoadError, RenderError};
pub use session::{Command, PageView, ReaderSession};
