//! North-up affine georeferencing

use serde::{Deserialize, Serialize};

use crate::extent::BBox;

/// Maps pixel `(col, row)` to map `(x, y)` for north-up rasters:
///
/// ```text
/// x = origin_x + col * pixel_width
/// y = origin_y + row * pixel_height   (pixel_height < 0)
/// ```
///
/// Rotated geotransforms are rejected by the readers before they reach here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X of the upper-left corner of pixel (0, 0)
    pub origin_x: f64,
    /// Y of the upper-left corner of pixel (0, 0)
    pub origin_y: f64,
    pub pixel_width: f64,
    /// Usually negative
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self { origin_x, origin_y, pixel_width, pixel_height }
    }

    /// Center of pixel (col, row)
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y + (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Upper-left corner of pixel (col, row); also valid for lattice points
    /// `col == width` / `row == height`.
    pub fn pixel_corner(&self, col: usize, row: usize) -> (f64, f64) {
        self.lattice_to_geo(col as f64, row as f64)
    }

    /// Fractional pixel position to map coordinates.
    pub fn lattice_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }

    /// Map coordinates to fractional `(col, row)`; `.floor()` gives the cell.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        if self.pixel_width == 0.0 || self.pixel_height == 0.0 {
            return (f64::NAN, f64::NAN);
        }
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }

    /// Cell index containing `(x, y)`, if inside a `cols x rows` grid.
    pub fn cell_at(&self, x: f64, y: f64, cols: usize, rows: usize) -> Option<(usize, usize)> {
        let (c, r) = self.geo_to_pixel(x, y);
        if !(c >= 0.0 && r >= 0.0) {
            return None;
        }
        let (c, r) = (c.floor() as usize, r.floor() as usize);
        (c < cols && r < rows).then_some((c, r))
    }

    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Area of one cell in squared map units
    pub fn cell_area(&self) -> f64 {
        (self.pixel_width * self.pixel_height).abs()
    }

    /// Transform of a window starting at pixel (col_off, row_off)
    pub fn window(&self, col_off: usize, row_off: usize) -> GeoTransform {
        let (x, y) = self.pixel_corner(col_off, row_off);
        GeoTransform::new(x, y, self.pixel_width, self.pixel_height)
    }

    /// Same origin with pixels scaled by (sx, sy), as for overview levels.
    pub fn scaled(&self, sx: f64, sy: f64) -> GeoTransform {
        GeoTransform::new(
            self.origin_x,
            self.origin_y,
            self.pixel_width * sx,
            self.pixel_height * sy,
        )
    }

    /// Extent of a `width x height` raster
    pub fn bounds(&self, width: usize, height: usize) -> BBox {
        let (x0, y0) = self.pixel_corner(0, 0);
        let (x1, y1) = self.pixel_corner(width, height);
        BBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn center_round_trips_to_half_pixel() {
        let gt = GeoTransform::new(100.0, 200.0, 10.0, -10.0);
        let (x, y) = gt.pixel_center(5, 10);
        let (col, row) = gt.geo_to_pixel(x, y);
        assert_relative_eq!(col, 5.5, epsilon = 1e-10);
        assert_relative_eq!(row, 10.5, epsilon = 1e-10);
    }

    #[test]
    fn bounds_and_cell_lookup() {
        let gt = GeoTransform::new(0.0, 100.0, 1.0, -1.0);
        let b = gt.bounds(100, 50);
        assert_eq!(b, BBox::new(0.0, 50.0, 100.0, 100.0));

        assert_eq!(gt.cell_at(0.5, 99.5, 100, 50), Some((0, 0)));
        assert_eq!(gt.cell_at(99.9, 50.1, 100, 50), Some((99, 49)));
        assert_eq!(gt.cell_at(-0.1, 99.5, 100, 50), None);
        assert_eq!(gt.cell_at(10.0, 49.0, 100, 50), None);
    }

    #[test]
    fn window_shifts_origin() {
        let gt = GeoTransform::new(500_000.0, 9_200_000.0, 10.0, -10.0);
        let w = gt.window(3, 4);
        assert_eq!(w.origin_x, 500_030.0);
        assert_eq!(w.origin_y, 9_199_960.0);
        assert_eq!(w.cell_area(), 100.0);
    }
}
