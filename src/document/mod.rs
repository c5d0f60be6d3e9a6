//! Unified document abstraction
//!
//! Format-agnostic page model consumed by the session and the display shell.
//! A loaded document is either a sequence of raster pages (PDF) that are
//! materialized to bitmaps on demand, or a sequence of markup pages (EPUB)
//! whose asset references resolve into a scratch workspace.
//!
//! # Architecture
//!
//! ```text
//!              ┌──────────────────────────────┐
//!              │        ReaderSession         │
//!              │ cursor · zoom · view caches  │
//!              └──────────────────────────────┘
//!                             │
//!            ┌────────────────┴────────────────┐
//!            ▼                                 ▼
//!   ┌──────────────────┐             ┌──────────────────┐
//!   │  PdfRasterizer   │             │  EpubDocument    │
//!   │ (PageRasterizer) │             │ (MarkupPage list)│
//!   └──────────────────┘             └──────────────────┘
//!            │                                 │
//!            ▼                                 ▼
//!   ContinuousLayoutCache              ScratchWorkspace
//!   PageCache (LRU)                    (extracted archive)
//! ```

mod cache;
mod error;
mod traits;
mod types;

pub use cache::{
    ContinuousLayoutCache, PageCache, PageCacheKey, PageCacheStats, DEFAULT_PAGE_CACHE_CAPACITY,
};
pub use error::{DocumentError, LoadError, RenderError};
pub use traits::{NoPrompt, PageRasterizer, PasswordPrompt, ScriptedPrompt};
pub use types::{
    Bitmap, DocumentInfo, DocumentKind, MarkupPage, Orientation, PageSize, ViewMode, Viewport,
};
