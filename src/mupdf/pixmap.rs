//! Pixmap conversion helpers
//!
//! Converts MuPDF pixmaps into RGBA [`Bitmap`]s and builds transformation
//! matrices that land a page on an exact pixel grid.

use mupdf::{Matrix, Pixmap, Rect};

use crate::document::{Bitmap, PageSize, RenderError};

/// Intrinsic size of a page from its bounds
pub fn page_size(bounds: &Rect) -> PageSize {
    PageSize::new(bounds.x1 - bounds.x0, bounds.y1 - bounds.y0)
}

/// Matrix mapping `bounds` onto `[0, width] x [0, height]`
///
/// Scaling each axis to an integral target keeps MuPDF's bbox rounding from
/// adding a stray row or column, so output size is exactly `width x height`.
pub fn fit_matrix(bounds: &Rect, width: u32, height: u32) -> Matrix {
    let size = page_size(bounds);
    let sx = if size.width > 0.0 { width as f32 / size.width } else { 1.0 };
    let sy = if size.height > 0.0 { height as f32 / size.height } else { 1.0 };
    Matrix::new(sx, 0.0, 0.0, sy, -bounds.x0 * sx, -bounds.y0 * sy)
}

/// Convert a pixmap to an opaque-or-alpha RGBA bitmap
pub fn pixmap_to_bitmap(pixmap: &Pixmap) -> Result<Bitmap, RenderError> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    if n < 3 {
        return Err(RenderError::Backend(format!(
            "unexpected pixmap component count {}",
            n
        )));
    }

    // Convert to RGBA buffer
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);

    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(0);
            let g = samples.get(offset + 1).copied().unwrap_or(0);
            let b = samples.get(offset + 2).copied().unwrap_or(0);
            let a = if n >= 4 {
                samples.get(offset + 3).copied().unwrap_or(255)
            } else {
                255
            };
            pixels.extend_from_slice(&[r, g, b, a]);
        }
    }

    Ok(Bitmap {
        width,
        height,
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Rect {
        Rect { x0, y0, x1, y1 }
    }

    #[test]
    fn test_page_size_from_bounds() {
        let size = page_size(&rect(10.0, 20.0, 622.0, 812.0));
        assert_eq!(size, PageSize::new(612.0, 792.0));
    }

    #[test]
    fn test_fit_matrix_maps_corners() {
        let bounds = rect(10.0, 20.0, 110.0, 220.0);
        let m = fit_matrix(&bounds, 50, 100);

        // Top-left corner maps to the origin
        assert!((bounds.x0 * m.a + m.e).abs() < 1e-4);
        assert!((bounds.y0 * m.d + m.f).abs() < 1e-4);
        // Bottom-right corner maps to the target size
        assert!((bounds.x1 * m.a + m.e - 50.0).abs() < 1e-4);
        assert!((bounds.y1 * m.d + m.f - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_fit_matrix_degenerate_bounds() {
        let m = fit_matrix(&rect(0.0, 0.0, 0.0, 0.0), 10, 10);
        assert_eq!(m.a, 1.0);
        assert_eq!(m.d, 1.0);
    }
}
