//! Axis-aligned bounding boxes and their reprojection

use geo::{GeodesicArea, LineString, Polygon};
use serde::{Deserialize, Serialize};

use crate::crs::{Transformer, CRS};
use crate::error::{Error, Result};

/// Samples taken along each edge when reprojecting a box; UTM edges curve
/// slightly in geographic space, so corners alone under-estimate the envelope.
const EDGE_SAMPLES: usize = 8;

/// A bounding box `(min_x, min_y, max_x, max_y)` in the units of some CRS.
///
/// Serializes as `[west, south, east, north]`, the order STAC and GeoJSON use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Create a box, rejecting non-finite or inverted/degenerate extents.
    pub fn try_new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        let finite = [min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite());
        if !finite || min_x >= max_x || min_y >= max_y {
            return Err(Error::InvalidBBox { min_x, min_y, max_x, max_y });
        }
        Ok(Self::new(min_x, min_y, max_x, max_y))
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    /// Inclusive point test.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Strict overlap test; boxes that only share an edge do not intersect.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    pub fn intersection(&self, other: &BBox) -> Option<BBox> {
        if !self.intersects(other) {
            return None;
        }
        Some(BBox::new(
            self.min_x.max(other.min_x),
            self.min_y.max(other.min_y),
            self.max_x.min(other.max_x),
            self.max_y.min(other.max_y),
        ))
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Closed, counter-clockwise polygon of the box outline.
    pub fn to_polygon(&self) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (self.min_x, self.min_y),
                (self.max_x, self.min_y),
                (self.max_x, self.max_y),
                (self.min_x, self.max_y),
                (self.min_x, self.min_y),
            ]),
            vec![],
        )
    }

    /// Envelope of this box after projecting it from `from` into `to`.
    pub fn reproject(&self, from: &CRS, to: &CRS) -> Result<BBox> {
        let transformer = Transformer::new(from, to)?;
        if transformer.is_identity() {
            return Ok(*self);
        }

        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        for i in 0..=EDGE_SAMPLES {
            let t = i as f64 / EDGE_SAMPLES as f64;
            let x = self.min_x + t * self.width();
            let y = self.min_y + t * self.height();
            for (px, py) in [(x, self.min_y), (x, self.max_y), (self.min_x, y), (self.max_x, y)] {
                let (tx, ty) = transformer.try_transform(px, py)?;
                min_x = min_x.min(tx);
                min_y = min_y.min(ty);
                max_x = max_x.max(tx);
                max_y = max_y.max(ty);
            }
        }

        BBox::try_new(min_x, min_y, max_x, max_y)
    }

    /// Area on the WGS84 ellipsoid, in square metres. Coordinates must be
    /// longitude/latitude degrees.
    pub fn geodesic_area_m2(&self) -> f64 {
        self.to_polygon().geodesic_area_unsigned()
    }
}

impl TryFrom<[f64; 4]> for BBox {
    type Error = Error;

    fn try_from(v: [f64; 4]) -> Result<Self> {
        BBox::try_new(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        b.to_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rejects_inverted_boxes() {
        assert!(BBox::try_new(1.0, 0.0, 0.0, 1.0).is_err());
        assert!(BBox::try_new(0.0, 0.0, 1.0, 0.0).is_err());
        assert!(BBox::try_new(f64::NAN, 0.0, 1.0, 1.0).is_err());
        assert!(BBox::try_new(0.0, 0.0, 1.0, 1.0).is_ok());
    }

    #[test]
    fn intersection_and_union() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(5.0, 5.0, 15.0, 15.0);
        let c = BBox::new(10.0, 0.0, 20.0, 10.0);

        assert_eq!(a.intersection(&b), Some(BBox::new(5.0, 5.0, 10.0, 10.0)));
        assert!(a.intersection(&c).is_none(), "shared edge is not an overlap");
        assert_eq!(a.union(&b), BBox::new(0.0, 0.0, 15.0, 15.0));
    }

    #[test]
    fn serde_uses_array_form() {
        let b = BBox::new(113.35, -7.22, 113.38, -7.19);
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, "[113.35,-7.22,113.38,-7.19]");
        let back: BBox = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
        assert!(serde_json::from_str::<BBox>("[1.0, 1.0, 0.0, 2.0]").is_err());
    }

    #[test]
    fn geodesic_area_of_sampang_box() {
        // 0.03 deg x 0.03 deg near 7 deg south: about 3.31 km x 3.32 km.
        let b = BBox::new(113.35, -7.22, 113.38, -7.19);
        let ha = b.geodesic_area_m2() / 10_000.0;
        assert!(ha > 1090.0 && ha < 1105.0, "got {ha} ha");
    }

    #[test]
    fn reproject_to_utm_and_back_contains_original() {
        let wgs = CRS::wgs84();
        let utm = CRS::from_epsg(32749);
        let b = BBox::new(113.35, -7.22, 113.38, -7.19);

        let projected = b.reproject(&wgs, &utm).unwrap();
        assert!(projected.min_x > 100_000.0 && projected.max_x < 900_000.0);
        assert!(projected.min_y > 9_000_000.0);

        let back = projected.reproject(&utm, &wgs).unwrap();
        assert!(back.min_x <= b.min_x + 1e-9 && back.max_x >= b.max_x - 1e-9);
        assert!(back.min_y <= b.min_y + 1e-9 && back.max_y >= b.max_y - 1e-9);
        assert_relative_eq!(back.center().0, b.center().0, epsilon = 1e-4);
    }
}
