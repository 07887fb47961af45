//! Coordinate transformation of vector geometries

use geo::{Coord, Geometry, MapCoords};
use tidemark_core::crs::{Transformer, CRS};
use tidemark_core::vector::FeatureCollection;
use tidemark_core::Result;

/// Transform every coordinate of `geom`.
pub fn reproject_geometry(geom: &Geometry<f64>, transformer: &Transformer) -> Geometry<f64> {
    if transformer.is_identity() {
        return geom.clone();
    }
    geom.map_coords(|c| {
        let (x, y) = transformer.transform(c.x, c.y);
        Coord { x, y }
    })
}

/// Reproject all geometries of a collection; attributes are kept.
pub fn reproject_features(fc: &FeatureCollection, from: &CRS, to: &CRS) -> Result<FeatureCollection> {
    let transformer = Transformer::new(from, to)?;
    Ok(fc
        .iter()
        .map(|f| {
            let mut out = f.clone();
            out.geometry = f.geometry.as_ref().map(|g| reproject_geometry(g, &transformer));
            out
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use geo::{point, Point};
    use tidemark_core::vector::Feature;

    #[test]
    fn utm_to_geographic() {
        let (e, n) = Transformer::new(&CRS::wgs84(), &CRS::utm(49, false)).unwrap().transform(113.36, -7.2);
        let fc: FeatureCollection = vec![Feature::new(point!(x: e, y: n)).with_property("NAMOBJ", "Pulau Mandangin")]
            .into_iter()
            .collect();

        let out = reproject_features(&fc, &CRS::utm(49, false), &CRS::wgs84()).unwrap();
        let Some(Geometry::Point(p)) = &out.features[0].geometry else {
            panic!("expected a point");
        };
        assert_abs_diff_eq!(p.x(), 113.36, epsilon = 1e-7);
        assert_abs_diff_eq!(p.y(), -7.2, epsilon = 1e-7);
        assert_eq!(out.features[0].get_property("NAMOBJ"), fc.features[0].get_property("NAMOBJ"));
    }

    #[test]
    fn identity_leaves_geometry_untouched() {
        let t = Transformer::new(&CRS::wgs84(), &CRS::from_epsg(4326)).unwrap();
        let g = Geometry::Point(Point::new(113.35, -7.22));
        assert_eq!(reproject_geometry(&g, &t), g);
    }
}
