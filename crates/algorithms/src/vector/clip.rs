//! Clipping polygonal geometries to a rectangle
//!
//! Intersection runs through `geo`'s boolean operations, so holes and
//! multi-part polygons survive clipping. Output exteriors are
//! counter-clockwise and holes clockwise, as geodesic area expects.

use geo::orient::Direction;
use geo::{Area, BooleanOps, BoundingRect, Geometry, MultiPolygon, Orient, Polygon};
use tidemark_core::BBox;

/// Intersection of a polygonal geometry with `bbox`.
///
/// Returns `None` for non-polygonal input and for geometries that do not
/// overlap the rectangle with positive area.
pub fn clip_to_bbox(geom: &Geometry<f64>, bbox: &BBox) -> Option<MultiPolygon<f64>> {
    let polygons = match geom {
        Geometry::Polygon(p) => MultiPolygon::new(vec![p.clone()]),
        Geometry::MultiPolygon(mp) => mp.clone(),
        Geometry::GeometryCollection(gc) => {
            let parts: Vec<Polygon<f64>> = gc
                .iter()
                .filter_map(|g| clip_to_bbox(g, bbox))
                .flat_map(|mp| mp.0)
                .collect();
            return (!parts.is_empty()).then(|| MultiPolygon::new(parts));
        }
        _ => return None,
    };

    let rect = polygons.bounding_rect()?;
    let envelope = BBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y);
    if !envelope.intersects(bbox) {
        return None;
    }

    let clipped = if contains_bbox(bbox, &envelope) {
        polygons
    } else {
        polygons.intersection(&MultiPolygon::new(vec![bbox.to_polygon()]))
    };

    let parts: Vec<Polygon<f64>> = clipped
        .into_iter()
        .filter(|p| p.unsigned_area() > 0.0)
        .map(|p| p.orient(Direction::Default))
        .collect();
    (!parts.is_empty()).then(|| MultiPolygon::new(parts))
}

fn contains_bbox(outer: &BBox, inner: &BBox) -> bool {
    inner.min_x >= outer.min_x && inner.max_x <= outer.max_x && inner.min_y >= outer.min_y && inner.max_y <= outer.max_y
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::{polygon, LineString, Winding};

    fn unit_box() -> BBox {
        BBox::new(0.0, 0.0, 10.0, 10.0)
    }

    #[test]
    fn inside_is_unchanged() {
        let p = polygon![(x: 2.0, y: 2.0), (x: 8.0, y: 2.0), (x: 8.0, y: 8.0), (x: 2.0, y: 8.0)];
        let out = clip_to_bbox(&Geometry::Polygon(p.clone()), &unit_box()).unwrap();
        assert_eq!(out.0, vec![p]);
    }

    #[test]
    fn partial_overlap_is_cut() {
        let p = polygon![(x: -5.0, y: -5.0), (x: 5.0, y: -5.0), (x: 5.0, y: 5.0), (x: -5.0, y: 5.0)];
        let out = clip_to_bbox(&Geometry::Polygon(p), &unit_box()).unwrap();
        assert_relative_eq!(out.unsigned_area(), 25.0, epsilon = 1e-9);
        let r = out.bounding_rect().unwrap();
        assert!(r.min().x >= 0.0 && r.min().y >= 0.0);
    }

    #[test]
    fn clipped_rings_are_counter_clockwise() {
        // clockwise input straddling the north edge
        let p = polygon![(x: 2.0, y: 8.0), (x: 2.0, y: 14.0), (x: 6.0, y: 14.0), (x: 6.0, y: 8.0)];
        let out = clip_to_bbox(&Geometry::Polygon(p), &unit_box()).unwrap();
        assert!(out.0.iter().all(|p| p.exterior().is_ccw()));
        assert_relative_eq!(out.signed_area(), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn holes_survive() {
        let donut = Polygon::new(
            LineString::from(vec![(-5.0, 2.0), (8.0, 2.0), (8.0, 8.0), (-5.0, 8.0), (-5.0, 2.0)]),
            vec![LineString::from(vec![(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0), (4.0, 4.0)])],
        );
        let out = clip_to_bbox(&Geometry::Polygon(donut), &unit_box()).unwrap();
        // 8x6 kept minus the 2x2 hole
        assert_relative_eq!(out.unsigned_area(), 44.0, epsilon = 1e-9);
        assert_eq!(out.0[0].interiors().len(), 1);
        assert!(out.0[0].interiors()[0].is_cw());
    }

    #[test]
    fn multipolygon_keeps_overlapping_parts() {
        let mp = MultiPolygon::new(vec![
            polygon![(x: 1.0, y: 1.0), (x: 3.0, y: 1.0), (x: 3.0, y: 3.0), (x: 1.0, y: 3.0)],
            polygon![(x: 20.0, y: 20.0), (x: 21.0, y: 20.0), (x: 21.0, y: 21.0), (x: 20.0, y: 21.0)],
            polygon![(x: 9.0, y: 9.0), (x: 12.0, y: 9.0), (x: 12.0, y: 12.0), (x: 9.0, y: 12.0)],
        ]);
        let out = clip_to_bbox(&Geometry::MultiPolygon(mp), &unit_box()).unwrap();
        assert_eq!(out.0.len(), 2);
        assert_relative_eq!(out.unsigned_area(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn disjoint_and_non_polygonal_give_none() {
        let far = polygon![(x: 20.0, y: 20.0), (x: 30.0, y: 20.0), (x: 30.0, y: 30.0)];
        assert!(clip_to_bbox(&Geometry::Polygon(far), &unit_box()).is_none());
        assert!(clip_to_bbox(&Geometry::Point(geo::Point::new(5.0, 5.0)), &unit_box()).is_none());
    }

    #[test]
    fn edge_touch_is_dropped() {
        let touching = polygon![(x: 10.0, y: 0.0), (x: 12.0, y: 0.0), (x: 12.0, y: 2.0), (x: 10.0, y: 2.0)];
        assert!(clip_to_bbox(&Geometry::Polygon(touching), &unit_box()).is_none());
    }
}
