//! Burn polygons into a cell mask

use geo::{BoundingRect, MultiPolygon, Polygon};
use crate::maybe_rayon::*;
use tidemark_core::raster::{GridSpec, Raster};
use tidemark_core::{Error, Result};

struct Edges {
    min_y: f64,
    max_y: f64,
    segments: Vec<(f64, f64, f64, f64)>,
}

impl Edges {
    fn of(poly: &Polygon<f64>) -> Option<Self> {
        let rect = poly.bounding_rect()?;
        let segments = std::iter::once(poly.exterior())
            .chain(poly.interiors())
            .flat_map(|ring| ring.lines())
            .map(|l| (l.start.x, l.start.y, l.end.x, l.end.y))
            .collect();
        Some(Self { min_y: rect.min().y, max_y: rect.max().y, segments })
    }

    /// Even-odd crossings of the horizontal line at `y`, sorted.
    fn crossings(&self, y: f64, out: &mut Vec<f64>) {
        out.clear();
        for &(x1, y1, x2, y2) in &self.segments {
            if (y1 > y) != (y2 > y) {
                out.push(x1 + (y - y1) * (x2 - x1) / (y2 - y1));
            }
        }
        out.sort_unstable_by(f64::total_cmp);
    }
}

/// Mask of the cells of `grid` whose centre lies inside any polygon
/// (1 inside, 0 outside). Polygons must be in the grid CRS; holes are
/// respected and overlapping polygons are unioned.
pub fn rasterize_polygons(polygons: &MultiPolygon<f64>, grid: &GridSpec) -> Result<Raster<u8>> {
    let edges: Vec<Edges> = polygons.iter().filter_map(Edges::of).collect();
    let gt = grid.transform;
    let cols = grid.cols;

    let data: Vec<u8> = (0..grid.rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];
            let (_, y) = gt.pixel_center(0, row);
            let mut xs = Vec::new();
            for e in edges.iter().filter(|e| y >= e.min_y && y <= e.max_y) {
                e.crossings(y, &mut xs);
                for pair in xs.chunks_exact(2) {
                    // first and last cell whose centre falls in [x0, x1)
                    let c0 = ((pair[0] - gt.origin_x) / gt.pixel_width - 0.5).ceil().max(0.0);
                    let c1 = ((pair[1] - gt.origin_x) / gt.pixel_width - 0.5).ceil().min(cols as f64);
                    if c1 > c0 {
                        row_data[c0 as usize..c1 as usize].fill(1);
                    }
                }
            }
            row_data
        })
        .collect();

    let mut out = grid.raster(0u8);
    *out.data_mut() = ndarray::Array2::from_shape_vec(grid.shape(), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, LineString};
    use tidemark_core::{BBox, CRS};

    fn grid_10x10() -> GridSpec {
        GridSpec::covering(&BBox::new(0.0, 0.0, 100.0, 100.0), 10.0, CRS::utm(49, false)).unwrap()
    }

    #[test]
    fn burns_by_cell_centre() {
        // covers centres x in {15, 25, 35}, y in {65, 75}
        let p = polygon![(x: 12.0, y: 61.0), (x: 38.0, y: 61.0), (x: 38.0, y: 79.0), (x: 12.0, y: 79.0)];
        let mask = rasterize_polygons(&MultiPolygon::new(vec![p]), &grid_10x10()).unwrap();
        assert_eq!(mask.count_eq(1), 6);
        assert_eq!(mask.get(2, 1).unwrap(), 1);
        assert_eq!(mask.get(3, 3).unwrap(), 1);
        assert_eq!(mask.get(3, 4).unwrap(), 0);
        assert_eq!(mask.get(4, 1).unwrap(), 0);
    }

    #[test]
    fn holes_and_overlaps() {
        let donut = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (50.0, 0.0), (50.0, 50.0), (0.0, 50.0), (0.0, 0.0)]),
            vec![LineString::from(vec![(20.0, 20.0), (30.0, 20.0), (30.0, 30.0), (20.0, 30.0), (20.0, 20.0)])],
        );
        let overlap = polygon![(x: 40.0, y: 0.0), (x: 60.0, y: 0.0), (x: 60.0, y: 10.0), (x: 40.0, y: 10.0)];
        let mask = rasterize_polygons(&MultiPolygon::new(vec![donut, overlap]), &grid_10x10()).unwrap();
        // 25 cells minus the hole cell plus one new cell at column 5
        assert_eq!(mask.count_eq(1), 25);
        assert_eq!(mask.get(7, 2).unwrap(), 0);
        assert_eq!(mask.get(9, 5).unwrap(), 1);
    }

    #[test]
    fn polygon_larger_than_grid_is_clamped() {
        let p = polygon![(x: -50.0, y: -50.0), (x: 150.0, y: -50.0), (x: 150.0, y: 150.0), (x: -50.0, y: 150.0)];
        let mask = rasterize_polygons(&MultiPolygon::new(vec![p]), &grid_10x10()).unwrap();
        assert_eq!(mask.count_eq(1), 100);
    }
}
