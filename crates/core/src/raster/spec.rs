//! Grid definitions independent of cell values

use serde::{Deserialize, Serialize};

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::extent::BBox;
use crate::raster::{GeoTransform, Raster, RasterElement};

/// Shape, transform and CRS of a raster, without the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub transform: GeoTransform,
    pub rows: usize,
    pub cols: usize,
    pub crs: CRS,
}

impl GridSpec {
    /// Square-celled grid covering `bbox` (in `crs` units) with its origin
    /// snapped outward to a multiple of `cell_size`.
    pub fn covering(bbox: &BBox, cell_size: f64, crs: CRS) -> Result<Self> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(Error::InvalidParameter {
                name: "cell_size",
                value: cell_size.to_string(),
                reason: "must be a positive number".into(),
            });
        }

        let min_x = (bbox.min_x / cell_size).floor() * cell_size;
        let max_y = (bbox.max_y / cell_size).ceil() * cell_size;
        let cols = ((bbox.max_x - min_x) / cell_size).ceil().max(1.0) as usize;
        let rows = ((max_y - bbox.min_y) / cell_size).ceil().max(1.0) as usize;

        Ok(Self {
            transform: GeoTransform::new(min_x, max_y, cell_size, -cell_size),
            rows,
            cols,
            crs,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cell_area(&self) -> f64 {
        self.transform.cell_area()
    }

    pub fn bounds(&self) -> BBox {
        self.transform.bounds(self.cols, self.rows)
    }

    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        self.transform.pixel_center(col, row)
    }

    /// Raster on this grid filled with `fill`
    pub fn raster<T: RasterElement>(&self, fill: T) -> Raster<T> {
        let mut r = Raster::filled(self.rows, self.cols, fill);
        r.set_transform(self.transform);
        r.set_crs(Some(self.crs.clone()));
        r
    }

    /// Whether `raster` has this grid's shape, transform and CRS
    pub fn matches<T: RasterElement>(&self, raster: &Raster<T>) -> bool {
        raster.shape() == self.shape()
            && raster.transform() == &self.transform
            && raster.crs().map(|c| c.is_equivalent(&self.crs)).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covering_snaps_outward() {
        let bbox = BBox::new(503.0, 1_004.0, 541.0, 1_031.0);
        let g = GridSpec::covering(&bbox, 10.0, CRS::utm(49, false)).unwrap();
        assert_eq!(g.transform.origin_x, 500.0);
        assert_eq!(g.transform.origin_y, 1_040.0);
        assert_eq!(g.cols, 5);
        assert_eq!(g.rows, 4);
        let b = g.bounds();
        assert!(b.min_x <= bbox.min_x && b.max_x >= bbox.max_x);
        assert!(b.min_y <= bbox.min_y && b.max_y >= bbox.max_y);
    }

    #[test]
    fn rejects_bad_cell_size() {
        let bbox = BBox::new(0.0, 0.0, 1.0, 1.0);
        assert!(GridSpec::covering(&bbox, 0.0, CRS::wgs84()).is_err());
        assert!(GridSpec::covering(&bbox, f64::NAN, CRS::wgs84()).is_err());
    }

    #[test]
    fn raster_matches_spec() {
        let g = GridSpec::covering(&BBox::new(0.0, 0.0, 30.0, 20.0), 10.0, CRS::utm(49, false)).unwrap();
        let r: Raster<u8> = g.raster(0);
        assert!(g.matches(&r));
        let other: Raster<u8> = Raster::new(2, 3);
        assert!(!g.matches(&other));
    }
}
