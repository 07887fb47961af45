//! Result types shared by the classifier, the session and the sink

use std::fmt;
use std::ops::{Add, Sub};

use geo::MultiPolygon;
use serde::{Serialize, Serializer};
use tidemark_core::Raster;

use crate::palette::LayerClass;

/// An area in hectares, held as hundredths so reported values always carry
/// exactly two decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hectares(i64);

impl Hectares {
    pub const ZERO: Hectares = Hectares(0);

    /// Square metres to hectares, rounded half away from zero.
    pub fn from_m2(m2: f64) -> Self {
        if !m2.is_finite() {
            return Self::ZERO;
        }
        // 1 ha = 10 000 m², so hundredths of a hectare are m² / 100
        Self((m2 / 100.0).round() as i64)
    }

    pub fn from_hundredths(h: i64) -> Self {
        Self(h)
    }

    pub fn hundredths(self) -> i64 {
        self.0
    }

    pub fn value(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Add for Hectares {
    type Output = Hectares;

    fn add(self, rhs: Hectares) -> Hectares {
        Hectares(self.0 + rhs.0)
    }
}

impl Sub for Hectares {
    type Output = Hectares;

    fn sub(self, rhs: Hectares) -> Hectares {
        Hectares(self.0 - rhs.0)
    }
}

impl fmt::Display for Hectares {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Hectares {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.value())
    }
}

/// Areas of one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub year: i32,
    pub water: Hectares,
    pub land: Hectares,
    pub land_in_region: Hectares,
    /// Cells inside the bounding box with no valid index value
    pub unclassified: Hectares,
    /// Scenes that went into the composite
    pub scenes: usize,
}

impl ClassificationResult {
    /// All-zero result standing in for a year that could not be computed.
    pub fn placeholder(year: i32) -> Self {
        Self {
            year,
            water: Hectares::ZERO,
            land: Hectares::ZERO,
            land_in_region: Hectares::ZERO,
            unclassified: Hectares::ZERO,
            scenes: 0,
        }
    }

    pub fn classified(&self) -> Hectares {
        self.water + self.land
    }
}

/// A year's result, or its placeholder together with the failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearOutcome {
    #[serde(flatten)]
    pub result: ClassificationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl YearOutcome {
    pub fn ok(result: ClassificationResult) -> Self {
        Self { result, failure: None }
    }

    pub fn failed(year: i32, failure: impl Into<String>) -> Self {
        Self { result: ClassificationResult::placeholder(year), failure: Some(failure.into()) }
    }

    pub fn year(&self) -> i32 {
        self.result.year
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Class polygons of one year, in EPSG:4326.
#[derive(Debug, Clone, PartialEq)]
pub struct YearPolygons {
    pub water: MultiPolygon<f64>,
    pub land: MultiPolygon<f64>,
    pub land_in_region: MultiPolygon<f64>,
}

impl Default for YearPolygons {
    fn default() -> Self {
        Self {
            water: MultiPolygon::new(vec![]),
            land: MultiPolygon::new(vec![]),
            land_in_region: MultiPolygon::new(vec![]),
        }
    }
}

impl YearPolygons {
    pub fn get(&self, class: LayerClass) -> Option<&MultiPolygon<f64>> {
        match class {
            LayerClass::Water => Some(&self.water),
            LayerClass::Land => Some(&self.land),
            LayerClass::LandInRegion => Some(&self.land_in_region),
            LayerClass::Boundary => None,
        }
    }
}

/// Everything the classifier produces for one year.
#[derive(Debug, Clone)]
pub struct ClassificationOutput {
    pub result: ClassificationResult,
    pub polygons: YearPolygons,
    /// Class codes on the analysis grid (0 unclassified, 1 water, 2 land)
    pub classes: Raster<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hectares_round_half_away_from_zero() {
        assert_eq!(Hectares::from_m2(12_345.0).to_string(), "1.23");
        assert_eq!(Hectares::from_m2(12_350.0).to_string(), "1.24");
        assert_eq!(Hectares::from_m2(100.0).to_string(), "0.01");
        assert_eq!(Hectares::from_m2(49.0).to_string(), "0.00");
        assert_eq!(Hectares::from_m2(50.0).to_string(), "0.01");
        assert_eq!(Hectares::from_m2(f64::NAN), Hectares::ZERO);
        assert_eq!(Hectares::from_m2(2_000_000.0).to_string(), "200.00");
    }

    #[test]
    fn hectares_arithmetic_and_json() {
        let a = Hectares::from_hundredths(1050);
        let b = Hectares::from_hundredths(1275);
        assert_eq!((a - b).to_string(), "-2.25");
        assert_eq!((a + b).value(), 23.25);
        assert_eq!(serde_json::to_string(&a).unwrap(), "10.5");
    }

    #[test]
    fn placeholder_is_all_zero() {
        let o = YearOutcome::failed(2015, "no scenes");
        assert!(o.is_failed());
        assert_eq!(o.year(), 2015);
        let r = &o.result;
        assert!(r.water.is_zero() && r.land.is_zero() && r.land_in_region.is_zero());

        let json = serde_json::to_value(&o).unwrap();
        assert_eq!(json["water"], 0.0);
        assert_eq!(json["failure"], "no scenes");
    }

    #[test]
    fn default_polygons_are_empty() {
        let polygons = YearPolygons::default();
        for class in LayerClass::YEARLY {
            assert!(polygons.get(class).is_some_and(|mp| mp.0.is_empty()));
        }
        assert!(polygons.get(LayerClass::Boundary).is_none());
    }
}
