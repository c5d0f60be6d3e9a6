//! Reader session state
//!
//! [`ReaderSession`] consolidates everything the display shell mutates: the
//! current document, the navigation cursor, zoom, orientation, view mode and
//! the bitmap caches. Shell input arrives as [`Command`]s; output is pulled
//! with [`ReaderSession::current_view`].
//!
//! Opening a document is an atomic replacement. The old document stays
//! current until the new one has been validated; it is then closed (its
//! scratch workspace destroyed and its caches dropped) before the new one is
//! installed.

pub mod navigation;
pub mod zoom;

use std::path::Path;

use tracing::{debug, info};

use crate::config::ReaderConfig;
use crate::document::{
    Bitmap, ContinuousLayoutCache, DocumentError, DocumentInfo, DocumentKind, PageCache,
    Orientation, PageCacheKey, PageCacheStats, PageRasterizer, PasswordPrompt, RenderError, ViewMode,
    Viewport,
};
use crate::formats::epub::EpubPackage;
use crate::formats::pdf::PdfRasterizer;
use crate::formats::{detect_kind, LoadedDocument};

pub use navigation::NavigationCursor;
pub use zoom::ZoomState;

/// User command from the display shell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Next,
    Prev,
    ZoomIn,
    ZoomOut,
    SetZoomPercent(f32),
    SetOrientation(Orientation),
    SetViewMode(ViewMode),
}

/// What the display shell should draw
#[derive(Debug)]
pub enum PageView<'a> {
    /// No document is open
    Empty,
    /// One raster page, or a two-page spread in horizontal orientation
    Raster(&'a Bitmap),
    /// Every raster page at the current scale
    Continuous(&'a [Bitmap]),
    /// One markup page and the font size to lay it out with
    Markup { html: &'a str, font_size: u32 },
}

struct OpenDocument {
    info: DocumentInfo,
    document: LoadedDocument,
}

/// Consolidated viewer state
pub struct ReaderSession {
    config: ReaderConfig,
    current: Option<OpenDocument>,
    cursor: NavigationCursor,
    zoom: ZoomState,
    orientation: Orientation,
    view_mode: ViewMode,
    continuous: ContinuousLayoutCache,
    page_cache: PageCache,
}

impl std::fmt::Debug for ReaderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderSession")
            .field("document", &self.current.as_ref().map(|c| &c.info))
            .field("cursor", &self.cursor)
            .field("zoom", &self.zoom)
            .field("orientation", &self.orientation)
            .field("view_mode", &self.view_mode)
            .finish()
    }
}

impl ReaderSession {
    pub fn new(config: ReaderConfig) -> Self {
        let config = config.normalized();
        Self {
            cursor: NavigationCursor::new(0),
            zoom: ZoomState::new(config.base_font_size),
            orientation: Orientation::default(),
            view_mode: ViewMode::default(),
            continuous: ContinuousLayoutCache::new(),
            page_cache: PageCache::with_capacity(config.page_cache_capacity),
            current: None,
            config,
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Open `path`, replacing the current document on success
    ///
    /// Any error leaves the current document in place, except an IO failure
    /// while extracting an EPUB that has already passed validation: by then
    /// the previous document has been retired and the session is left empty.
    pub fn open<P: AsRef<Path>>(
        &mut self,
        path: P,
        prompt: &mut dyn PasswordPrompt,
        viewport: Viewport,
    ) -> Result<(), DocumentError> {
        let path = path.as_ref();
        let kind = detect_kind(path)?;

        let document = match kind {
            DocumentKind::Raster => {
                let pdf = PdfRasterizer::open(path, prompt, self.config.max_password_attempts)?;
                self.retire_current();
                LoadedDocument::Raster(pdf)
            }
            DocumentKind::Markup => {
                let package = EpubPackage::open(path)?;
                self.retire_current();
                let epub = package.unpack(self.config.scratch_root.as_deref())?;
                LoadedDocument::Markup(epub)
            }
        };

        self.install(DocumentInfo::new(path, document.kind()), document, viewport);
        Ok(())
    }

    fn install(&mut self, info: DocumentInfo, document: LoadedDocument, viewport: Viewport) {
        match &document {
            LoadedDocument::Raster(pdf) => {
                let fit = pdf.initial_scale(viewport.inset(self.config.viewport_margin));
                self.zoom.set_scale(fit);
            }
            LoadedDocument::Markup(_) => self.zoom.reset_font(),
        }

        self.cursor.reset(document.page_count());
        self.cursor
            .set_spread(info.kind == DocumentKind::Raster && self.orientation == Orientation::Horizontal);

        info!(
            title = %info.title,
            kind = info.kind.label(),
            pages = document.page_count(),
            "Document is now current"
        );
        self.current = Some(OpenDocument { info, document });
    }

    /// Close the current document and drop everything derived from it
    fn retire_current(&mut self) {
        if let Some(mut old) = self.current.take() {
            debug!(title = %old.info.title, "Retiring current document");
            old.document.close();
        }
        self.continuous.clear();
        self.page_cache.clear();
        self.cursor.reset(0);
    }

    /// Close the current document, destroying its scratch workspace
    pub fn shutdown(&mut self) {
        self.retire_current();
    }

    /// Apply a shell command; returns whether visible state changed
    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::Next => self.cursor.next(),
            Command::Prev => self.cursor.prev(),
            Command::ZoomIn => self.zoom_with(|zoom, kind| zoom.zoom_in(kind)),
            Command::ZoomOut => self.zoom_with(|zoom, kind| zoom.zoom_out(kind)),
            Command::SetZoomPercent(percent) => {
                self.zoom_with(|zoom, kind| zoom.set_percent(kind, percent))
            }
            Command::SetOrientation(orientation) => self.set_orientation(orientation),
            Command::SetViewMode(mode) => {
                let changed = self.view_mode != mode;
                self.view_mode = mode;
                changed
            }
        }
    }

    /// Jump to a page, clamped into range; returns whether the index moved
    pub fn go_to(&mut self, index: usize) -> bool {
        self.cursor.go_to(index)
    }

    fn zoom_with<F>(&mut self, mutate: F) -> bool
    where
        F: FnOnce(&mut ZoomState, DocumentKind) -> bool,
    {
        let Some(kind) = self.kind() else {
            return false;
        };
        let changed = mutate(&mut self.zoom, kind);
        if changed && kind == DocumentKind::Raster {
            self.continuous.mark_dirty();
        }
        changed
    }

    fn set_orientation(&mut self, orientation: Orientation) -> bool {
        let changed = self.orientation != orientation;
        self.orientation = orientation;
        let spread =
            self.kind() == Some(DocumentKind::Raster) && orientation == Orientation::Horizontal;
        self.cursor.set_spread(spread);
        changed
    }

    /// Materialize the current page(s) for display
    pub fn current_view(&mut self) -> Result<PageView<'_>, DocumentError> {
        let Some(open) = self.current.as_ref() else {
            return Ok(PageView::Empty);
        };
        let index = self.cursor.index();

        match &open.document {
            LoadedDocument::Raster(pdf) => {
                let scale = self.zoom.scale();
                if self.view_mode == ViewMode::Continuous {
                    let pages = self.continuous.ensure_built(pdf, scale)?;
                    return Ok(PageView::Continuous(pages));
                }

                let bitmap = if self.cursor.is_spread() {
                    self.page_cache
                        .get_or_render(PageCacheKey::spread(index, scale), || {
                            pdf.render_spread(index, scale)
                        })?
                } else {
                    self.page_cache
                        .get_or_render(PageCacheKey::page(index, scale), || {
                            pdf.render_page(index, scale)
                        })?
                };
                Ok(PageView::Raster(bitmap))
            }
            LoadedDocument::Markup(epub) => {
                let page = epub.page(index).ok_or(RenderError::OutOfRange {
                    index,
                    page_count: epub.page_count(),
                })?;
                Ok(PageView::Markup {
                    html: &page.html,
                    font_size: self.zoom.font_size(),
                })
            }
        }
    }

    pub fn kind(&self) -> Option<DocumentKind> {
        self.current.as_ref().map(|c| c.info.kind)
    }

    pub fn info(&self) -> Option<&DocumentInfo> {
        self.current.as_ref().map(|c| &c.info)
    }

    pub fn document(&self) -> Option<&LoadedDocument> {
        self.current.as_ref().map(|c| &c.document)
    }

    pub fn page_count(&self) -> usize {
        self.current
            .as_ref()
            .map(|c| c.document.page_count())
            .unwrap_or(0)
    }

    pub fn current_index(&self) -> usize {
        self.cursor.index()
    }

    pub fn cursor(&self) -> &NavigationCursor {
        &self.cursor
    }

    pub fn zoom(&self) -> &ZoomState {
        &self.zoom
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    /// Zoom label for the shell: scale or font ratio as a whole percent
    pub fn zoom_percent(&self) -> Option<u32> {
        self.kind().map(|kind| self.zoom.percent(kind))
    }

    /// `"<title> | Page i/n"`, or `"No document"`
    pub fn status_line(&self) -> String {
        match &self.current {
            Some(open) => format!(
                "{} | Page {}/{}",
                open.info.title,
                self.cursor.index() + 1,
                open.document.page_count()
            ),
            None => "No document".to_string(),
        }
    }

    /// Scratch workspace of the current EPUB, if any
    pub fn workspace_root(&self) -> Option<&Path> {
        match self.document()? {
            LoadedDocument::Markup(epub) if epub.workspace().is_live() => {
                Some(epub.workspace().root())
            }
            _ => None,
        }
    }

    pub fn continuous_cache(&self) -> &ContinuousLayoutCache {
        &self.continuous
    }

    pub fn page_cache_stats(&self) -> PageCacheStats {
        self.page_cache.stats()
    }
}

impl Drop for ReaderSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::NoPrompt;

    fn viewport() -> Viewport {
        Viewport::new(800.0, 600.0)
    }

    #[test]
    fn test_empty_session() {
        let mut session = ReaderSession::new(ReaderConfig::default());
        assert_eq!(session.status_line(), "No document");
        assert_eq!(session.page_count(), 0);
        assert_eq!(session.zoom_percent(), None);
        assert!(!session.apply(Command::Next));
        assert!(!session.apply(Command::ZoomIn));
        assert!(matches!(session.current_view().unwrap(), PageView::Empty));
    }

    #[test]
    fn test_unsupported_format_keeps_state() {
        let mut session = ReaderSession::new(ReaderConfig::default());
        let err = session
            .open("notes.txt", &mut NoPrompt, viewport())
            .unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedFormat(_)));
        assert!(session.info().is_none());
    }

    #[test]
    fn test_orientation_and_view_mode_without_document() {
        let mut session = ReaderSession::new(ReaderConfig::default());
        assert!(session.apply(Command::SetOrientation(Orientation::Horizontal)));
        assert!(!session.cursor().is_spread());
        assert!(session.apply(Command::SetViewMode(ViewMode::Continuous)));
        assert!(!session.apply(Command::SetViewMode(ViewMode::Continuous)));
    }
}
