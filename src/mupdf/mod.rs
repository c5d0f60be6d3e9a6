//! Low-level MuPDF helpers
//!
//! Thin adapters between the `mupdf` crate and the page model:
//!
//! 1. **pixmap**: pixmap → RGBA [`Bitmap`](crate::document::Bitmap) conversion
//!    and exact-size transformation matrices
//! 2. **writer**: sequential PDF output with optional AES-256 encryption
//!
//! MuPDF's `fz_context` is not thread-safe. Documents opened here are used
//! from one thread at a time, which matches the synchronous session model.

mod pixmap;
mod writer;

pub use pixmap::{fit_matrix, page_size, pixmap_to_bitmap};
pub use writer::{PdfPageWriter, PdfWriteSettings};
