//! PDF format implementation
//!
//! [`PdfRasterizer`] implements [`PageRasterizer`](crate::document::PageRasterizer)
//! on top of MuPDF: page enumeration, password authentication, single-page and
//! spread rendering, and the fit-to-viewport initial scale.

mod rasterizer;

pub use rasterizer::{PdfRasterizer, DEFAULT_PASSWORD_ATTEMPTS};
