//! Zoom controller
//!
//! Raster documents zoom by a geometric scale factor; markup documents zoom
//! by font size relative to the configured base size. The two spaces are
//! independent.

use crate::document::DocumentKind;

pub const MIN_SCALE: f32 = 0.1;
pub const MAX_SCALE: f32 = 5.0;
pub const SCALE_STEP: f32 = 0.1;

pub const MIN_FONT_SIZE: u32 = 8;
pub const MAX_FONT_SIZE: u32 = 60;
pub const FONT_STEP: u32 = 2;

/// Added before truncating percentages so that 0.29 × 100 reads as 29
const PERCENT_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomState {
    scale: f32,
    font_size: u32,
    base_font_size: u32,
}

impl ZoomState {
    pub fn new(base_font_size: u32) -> Self {
        let base_font_size = base_font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        Self {
            scale: 1.0,
            font_size: base_font_size,
            base_font_size,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn font_size(&self) -> u32 {
        self.font_size
    }

    pub fn base_font_size(&self) -> u32 {
        self.base_font_size
    }

    /// Set the raster scale, clamped; returns whether it changed
    pub fn set_scale(&mut self, scale: f32) -> bool {
        if !scale.is_finite() {
            return false;
        }
        let next = scale.clamp(MIN_SCALE, MAX_SCALE);
        let changed = next != self.scale;
        self.scale = next;
        changed
    }

    /// Set the markup font size, clamped; returns whether it changed
    pub fn set_font_size(&mut self, font_size: u32) -> bool {
        let next = font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        let changed = next != self.font_size;
        self.font_size = next;
        changed
    }

    /// Back to the base font size, as on every markup open
    pub fn reset_font(&mut self) {
        self.font_size = self.base_font_size;
    }

    pub fn zoom_in(&mut self, kind: DocumentKind) -> bool {
        match kind {
            DocumentKind::Raster => self.set_scale(self.scale + SCALE_STEP),
            DocumentKind::Markup => self.set_font_size(self.font_size.saturating_add(FONT_STEP)),
        }
    }

    pub fn zoom_out(&mut self, kind: DocumentKind) -> bool {
        match kind {
            DocumentKind::Raster => self.set_scale(self.scale - SCALE_STEP),
            DocumentKind::Markup => self.set_font_size(self.font_size.saturating_sub(FONT_STEP)),
        }
    }

    /// Map a percentage onto the active scale space
    ///
    /// `p` becomes `scale = p / 100` for raster documents and
    /// `font_size = round(base_font_size × p / 100)` for markup.
    pub fn set_percent(&mut self, kind: DocumentKind, percent: f32) -> bool {
        if !percent.is_finite() {
            return false;
        }
        match kind {
            DocumentKind::Raster => self.set_scale(percent / 100.0),
            DocumentKind::Markup => {
                let size = (self.base_font_size as f32 * percent / 100.0).round();
                self.set_font_size(size.max(0.0) as u32)
            }
        }
    }

    /// Zoom shown to the user, truncated to a whole percent
    pub fn percent(&self, kind: DocumentKind) -> u32 {
        let ratio = match kind {
            DocumentKind::Raster => self.scale,
            DocumentKind::Markup => self.font_size as f32 / self.base_font_size as f32,
        };
        (ratio * 100.0 + PERCENT_EPSILON).max(0.0) as u32
    }
}

impl Default for ZoomState {
    fn default() -> Self {
        Self::new(14)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_zoom_steps_and_clamps() {
        let mut zoom = ZoomState::new(14);
        assert!(zoom.zoom_in(DocumentKind::Raster));
        assert!((zoom.scale() - 1.1).abs() < 1e-6);

        zoom.set_scale(4.95);
        zoom.zoom_in(DocumentKind::Raster);
        assert_eq!(zoom.scale(), MAX_SCALE);
        assert!(!zoom.zoom_in(DocumentKind::Raster));

        zoom.set_scale(0.15);
        zoom.zoom_out(DocumentKind::Raster);
        assert_eq!(zoom.scale(), MIN_SCALE);
        assert!(!zoom.zoom_out(DocumentKind::Raster));
    }

    #[test]
    fn test_markup_zoom_steps_and_clamps() {
        let mut zoom = ZoomState::new(14);
        zoom.zoom_in(DocumentKind::Markup);
        assert_eq!(zoom.font_size(), 16);

        zoom.set_font_size(59);
        zoom.zoom_in(DocumentKind::Markup);
        assert_eq!(zoom.font_size(), MAX_FONT_SIZE);

        zoom.set_font_size(9);
        zoom.zoom_out(DocumentKind::Markup);
        assert_eq!(zoom.font_size(), MIN_FONT_SIZE);
    }

    #[test]
    fn test_scale_spaces_are_independent() {
        let mut zoom = ZoomState::new(14);
        zoom.zoom_in(DocumentKind::Markup);
        assert_eq!(zoom.scale(), 1.0);
        zoom.zoom_in(DocumentKind::Raster);
        assert_eq!(zoom.font_size(), 16);
    }

    #[test]
    fn test_set_percent() {
        let mut zoom = ZoomState::new(14);
        zoom.set_percent(DocumentKind::Raster, 250.0);
        assert_eq!(zoom.scale(), 2.5);
        zoom.set_percent(DocumentKind::Raster, 5.0);
        assert_eq!(zoom.scale(), MIN_SCALE);
        zoom.set_percent(DocumentKind::Raster, 900.0);
        assert_eq!(zoom.scale(), MAX_SCALE);

        zoom.set_percent(DocumentKind::Markup, 150.0);
        assert_eq!(zoom.font_size(), 21);
        zoom.set_percent(DocumentKind::Markup, 10.0);
        assert_eq!(zoom.font_size(), MIN_FONT_SIZE);
        zoom.set_percent(DocumentKind::Markup, 1000.0);
        assert_eq!(zoom.font_size(), MAX_FONT_SIZE);
    }

    #[test]
    fn test_set_percent_ignores_nan() {
        let mut zoom = ZoomState::new(14);
        assert!(!zoom.set_percent(DocumentKind::Raster, f32::NAN));
        assert_eq!(zoom.scale(), 1.0);
    }

    #[test]
    fn test_percent_display() {
        let mut zoom = ZoomState::new(14);
        assert_eq!(zoom.percent(DocumentKind::Raster), 100);
        zoom.set_scale(0.29);
        assert_eq!(zoom.percent(DocumentKind::Raster), 29);
        zoom.set_scale(1.234);
        assert_eq!(zoom.percent(DocumentKind::Raster), 123);

        zoom.set_font_size(21);
        assert_eq!(zoom.percent(DocumentKind::Markup), 150);
        zoom.set_font_size(20);
        assert_eq!(zoom.percent(DocumentKind::Markup), 142);
    }

    #[test]
    fn test_base_font_size_clamped() {
        assert_eq!(ZoomState::new(2).base_font_size(), MIN_FONT_SIZE);
        assert_eq!(ZoomState::new(100).font_size(), MAX_FONT_SIZE);
    }
}
