//! Bitmap caches for raster documents
//!
//! Two layers keep rendering work and memory bounded:
//!
//! - [`ContinuousLayoutCache`]: every page of the document pre-scaled for the
//!   "all pages" view, rebuilt as a unit whenever the zoom changes.
//! - [`PageCache`]: LRU of single pages and spreads for the one-page view.

use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::debug;

use super::error::RenderError;
use super::traits::PageRasterizer;
use super::types::Bitmap;

/// Default number of single-page bitmaps kept in memory
pub const DEFAULT_PAGE_CACHE_CAPACITY: usize = 32;

/// Full-document list of bitmaps built at one zoom scale
///
/// The list is either empty or was built at the scale recorded in `built_scale`.
/// A zoom mutation marks the cache dirty; the next [`ensure_built`] call
/// re-renders regardless of the scale it is given.
///
/// [`ensure_built`]: ContinuousLayoutCache::ensure_built
#[derive(Debug, Default)]
pub struct ContinuousLayoutCache {
    pages: Vec<Bitmap>,
    built_scale: Option<f32>,
    dirty: bool,
    rebuilds: usize,
}

impl ContinuousLayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return bitmaps for every page at `scale`, rebuilding if needed
    ///
    /// A failed rebuild leaves the previous contents untouched.
    pub fn ensure_built<R>(&mut self, source: &R, scale: f32) -> Result<&[Bitmap], RenderError>
    where
        R: PageRasterizer + ?Sized,
    {
        if !self.needs_rebuild(scale) {
            return Ok(&self.pages);
        }

        let page_count = source.page_count();
        debug!(page_count, scale, "Rebuilding continuous layout");

        let mut rebuilt = Vec::with_capacity(page_count);
        for index in 0..page_count {
            rebuilt.push(source.render_page(index, scale)?);
        }

        self.pages = rebuilt;
        self.built_scale = Some(scale);
        self.dirty = false;
        self.rebuilds += 1;
        Ok(&self.pages)
    }

    /// Whether the next `ensure_built(scale)` would re-render
    pub fn needs_rebuild(&self, scale: f32) -> bool {
        match self.built_scale {
            Some(built) => self.dirty || built.to_bits() != scale.to_bits(),
            None => true,
        }
    }

    /// Flag the cache stale after a zoom mutation
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Drop all bitmaps (document replaced or closed)
    pub fn clear(&mut self) {
        self.pages = Vec::new();
        self.built_scale = None;
        self.dirty = false;
    }

    /// Bitmaps from the last successful build
    pub fn pages(&self) -> &[Bitmap] {
        &self.pages
    }

    pub fn built_scale(&self) -> Option<f32> {
        self.built_scale
    }

    /// Number of full rebuilds performed since creation
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    /// Approximate memory held by the cached bitmaps
    pub fn byte_len(&self) -> usize {
        self.pages.iter().map(Bitmap::byte_len).sum()
    }
}

/// Cache key for single-page renders
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct PageCacheKey {
    pub index: usize,
    pub spread: bool,
    /// Scale bit pattern, so distinct zoom levels never collide
    pub scale: u32,
}

impl PageCacheKey {
    pub fn page(index: usize, scale: f32) -> Self {
        Self {
            index,
            spread: false,
            scale: scale.to_bits(),
        }
    }

    pub fn spread(index: usize, scale: f32) -> Self {
        Self {
            index,
            spread: true,
            scale: scale.to_bits(),
        }
    }
}

/// LRU cache for single-page and spread bitmaps
pub struct PageCache {
    entries: LruCache<PageCacheKey, Bitmap>,
    hits: u64,
    misses: u64,
}

impl Default for PageCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_PAGE_CACHE_CAPACITY)
    }
}

impl PageCache {
    pub fn with_capacity(capacity: usize) -> Self {
        let size = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(size),
            hits: 0,
            misses: 0,
        }
    }

    /// Return the cached bitmap for `key`, rendering it with `render` on a miss
    pub fn get_or_render<F>(&mut self, key: PageCacheKey, render: F) -> Result<&Bitmap, RenderError>
    where
        F: FnOnce() -> Result<Bitmap, RenderError>,
    {
        if self.entries.contains(&key) {
            self.hits += 1;
        } else {
            self.misses += 1;
            let bitmap = render()?;
            self.entries.put(key, bitmap);
        }
        self.entries
            .get(&key)
            .ok_or_else(|| RenderError::Backend("page cache entry evicted".to_string()))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> PageCacheStats {
        PageCacheStats {
            entries: self.entries.len(),
            capacity: self.entries.cap().get(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

/// Page cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}
