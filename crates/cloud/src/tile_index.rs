//! Tile grid math: which tiles of an image level cover a map window.

use tidemark_core::raster::GeoTransform;
use tidemark_core::BBox;

/// A tile to fetch, addressed by its linear index and grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRef {
    pub index: usize,
    pub col: usize,
    pub row: usize,
}

/// Pixel window `[col_min, col_max) x [row_min, row_max)` of an image level
/// and the tiles intersecting it.
#[derive(Debug, Clone)]
pub struct TileWindow {
    pub col_min: usize,
    pub row_min: usize,
    pub col_max: usize,
    pub row_max: usize,
    pub tiles: Vec<TileRef>,
}

impl TileWindow {
    /// Output `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.row_max - self.row_min, self.col_max - self.col_min)
    }
}

/// Pixels of a `width x height` image touched by `bbox` (in the image CRS),
/// expanded outward to whole pixels and clamped to the image.
pub fn window_for_bbox(
    bbox: &BBox,
    transform: &GeoTransform,
    width: u32,
    height: u32,
    tile_width: u32,
    tile_height: u32,
) -> Option<TileWindow> {
    let (c0, r0) = transform.geo_to_pixel(bbox.min_x, bbox.max_y);
    let (c1, r1) = transform.geo_to_pixel(bbox.max_x, bbox.min_y);

    let clamp = |v: f64, max: u32| (v.max(0.0) as usize).min(max as usize);
    let col_min = clamp(c0.min(c1).floor(), width);
    let col_max = clamp(c0.max(c1).ceil(), width);
    let row_min = clamp(r0.min(r1).floor(), height);
    let row_max = clamp(r0.max(r1).ceil(), height);
    if col_min >= col_max || row_min >= row_max {
        return None;
    }

    let (tw, th) = (tile_width.max(1) as usize, tile_height.max(1) as usize);
    let across = (width as usize).div_ceil(tw);
    let tiles = (row_min / th..row_max.div_ceil(th))
        .flat_map(|row| (col_min / tw..col_max.div_ceil(tw)).map(move |col| TileRef { index: row * across + col, col, row }))
        .collect();

    Some(TileWindow { col_min, row_min, col_max, row_max, tiles })
}

/// Coarsest level whose pixel size does not exceed `target_cell_size`.
///
/// `widths[0]` is the full-resolution width and `full_cell_size` its pixel
/// size; overview pixel sizes scale with `widths[0] / widths[i]`.
pub fn level_for_resolution(widths: &[u32], full_cell_size: f64, target_cell_size: f64) -> usize {
    let Some(&full) = widths.first() else {
        return 0;
    };
    widths
        .iter()
        .enumerate()
        .filter(|&(_, &w)| w > 0 && full_cell_size * full as f64 / w as f64 <= target_cell_size * (1.0 + 1e-9))
        .map(|(i, _)| i)
        .last()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_and_tiles() {
        let gt = GeoTransform::new(0.0, 100.0, 1.0, -1.0);
        let w = window_for_bbox(&BBox::new(10.0, 10.0, 30.0, 30.0), &gt, 100, 100, 32, 32).unwrap();
        assert_eq!((w.col_min, w.row_min, w.col_max, w.row_max), (10, 70, 30, 90));
        assert_eq!(w.shape(), (20, 20));
        // cols 10..30 -> tile col 0; rows 70..90 -> tile rows 2
        assert_eq!(w.tiles, vec![TileRef { index: 8, col: 0, row: 2 }]);
    }

    #[test]
    fn window_straddling_tiles() {
        let gt = GeoTransform::new(0.0, 64.0, 1.0, -1.0);
        let w = window_for_bbox(&BBox::new(30.0, 30.0, 34.0, 34.0), &gt, 64, 64, 32, 32).unwrap();
        assert_eq!(w.tiles.len(), 4);
        assert_eq!(w.tiles.iter().map(|t| t.index).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn outside_is_none() {
        let gt = GeoTransform::new(0.0, 100.0, 1.0, -1.0);
        assert!(window_for_bbox(&BBox::new(200.0, 200.0, 300.0, 300.0), &gt, 100, 100, 32, 32).is_none());
    }

    #[test]
    fn resolution_level() {
        let widths = [10980, 5490, 2745, 1373];
        assert_eq!(level_for_resolution(&widths, 10.0, 10.0), 0);
        assert_eq!(level_for_resolution(&widths, 10.0, 20.0), 1);
        assert_eq!(level_for_resolution(&widths, 10.0, 45.0), 2);
        assert_eq!(level_for_resolution(&widths, 20.0, 10.0), 0);
    }
}
