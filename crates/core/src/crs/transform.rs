//! Point transformation between two CRSs through proj4rs.

use std::fmt;
use std::sync::Arc;

use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use super::CRS;
use crate::error::{Error, Result};

struct Endpoint {
    proj: Proj,
    geographic: bool,
}

impl Endpoint {
    fn new(crs: &CRS) -> Result<Self> {
        Ok(Self { proj: crs.to_proj()?, geographic: crs.is_geographic() })
    }
}

/// Transforms points between two CRSs. Geographic coordinates are
/// `(lon, lat)` in degrees on both sides.
#[derive(Clone)]
pub struct Transformer {
    /// `None` when both sides are the same CRS
    pipeline: Option<Arc<(Endpoint, Endpoint)>>,
    from: String,
    to: String,
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("identity", &self.is_identity())
            .finish()
    }
}

impl Transformer {
    pub fn new(from: &CRS, to: &CRS) -> Result<Self> {
        let pipeline = if from.is_equivalent(to) {
            from.to_proj()?;
            None
        } else {
            Some(Arc::new((Endpoint::new(from)?, Endpoint::new(to)?)))
        };
        Ok(Self { pipeline, from: from.identifier(), to: to.identifier() })
    }

    pub fn is_identity(&self) -> bool {
        self.pipeline.is_none()
    }

    pub fn try_transform(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let Some(pipeline) = &self.pipeline else {
            return Ok((x, y));
        };
        let (src, dst) = (&pipeline.0, &pipeline.1);

        let mut point = if src.geographic { (x.to_radians(), y.to_radians(), 0.0) } else { (x, y, 0.0) };
        transform(&src.proj, &dst.proj, &mut point)
            .map_err(|e| Error::Projection(format!("({x}, {y}) from {} to {}: {e:?}", self.from, self.to)))?;

        if dst.geographic {
            Ok((point.0.to_degrees(), point.1.to_degrees()))
        } else {
            Ok((point.0, point.1))
        }
    }

    /// Transform one point; `(NaN, NaN)` when it cannot be projected.
    pub fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        self.try_transform(x, y).unwrap_or((f64::NAN, f64::NAN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn madrid_to_utm_30n() {
        // pyproj reference values
        let t = Transformer::new(&CRS::wgs84(), &CRS::utm(30, true)).unwrap();
        let (e, n) = t.transform(-3.7037, 40.4168);
        assert_relative_eq!(e, 440298.94, epsilon = 0.05);
        assert_relative_eq!(n, 4474257.31, epsilon = 0.05);
    }

    #[test]
    fn utm_round_trip_in_the_south() {
        let there = Transformer::new(&CRS::wgs84(), &CRS::utm(49, false)).unwrap();
        let back = Transformer::new(&CRS::utm(49, false), &CRS::wgs84()).unwrap();
        let (e, n) = there.transform(113.365, -7.205);
        assert!(n > 9_000_000.0 && n < 10_000_000.0);
        let (lon, lat) = back.transform(e, n);
        assert_relative_eq!(lon, 113.365, epsilon = 1e-8);
        assert_relative_eq!(lat, -7.205, epsilon = 1e-8);
    }

    #[test]
    fn web_mercator_easting_is_spherical() {
        let t = Transformer::new(&CRS::from_epsg(3857), &CRS::wgs84()).unwrap();
        let x = 6378137.0 * 113.3_f64.to_radians();
        let (lon, lat) = t.transform(x, 0.0);
        assert_relative_eq!(lon, 113.3, epsilon = 1e-9);
        assert_relative_eq!(lat, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn dgn95_utm_matches_wgs84_utm() {
        let dgn = Transformer::new(&CRS::from_epsg(23879), &CRS::wgs84()).unwrap();
        let wgs = Transformer::new(&CRS::utm(49, false), &CRS::wgs84()).unwrap();
        let (a, b) = (dgn.transform(700_000.0, 9_200_000.0), wgs.transform(700_000.0, 9_200_000.0));
        assert_relative_eq!(a.0, b.0, epsilon = 1e-7);
        assert_relative_eq!(a.1, b.1, epsilon = 1e-7);
    }

    #[test]
    fn same_crs_is_identity() {
        let t = Transformer::new(&CRS::wgs84(), &CRS::from_epsg(4326)).unwrap();
        assert!(t.is_identity());
        assert_eq!(t.transform(1.5, 2.5), (1.5, 2.5));
    }

    #[test]
    fn unknown_crs_cannot_build_a_transformer() {
        assert!(Transformer::new(&CRS::from_epsg(2154), &CRS::wgs84()).is_err());
        assert!(Transformer::new(&CRS::from_epsg(2154), &CRS::from_epsg(2154)).is_err());
    }
}
