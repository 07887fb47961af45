//! Nearest-neighbour resampling onto an analysis grid

use crate::maybe_rayon::*;
use tidemark_core::crs::Transformer;
use tidemark_core::raster::{GridSpec, Raster, RasterElement};
use tidemark_core::{Error, Result};

/// Sample `src` at the centre of every cell of `grid`.
///
/// Coordinates are transformed from the grid CRS into the source CRS, so
/// scenes from a neighbouring UTM zone land on the same grid. Cells falling
/// outside the source, or on source nodata, are NaN.
pub fn resample_nearest<T: RasterElement>(src: &Raster<T>, grid: &GridSpec) -> Result<Raster<f64>> {
    let src_crs = src
        .crs()
        .ok_or_else(|| Error::UnsupportedCrs("source raster has no CRS".into()))?;
    let transformer = Transformer::new(&grid.crs, src_crs)?;
    let src_gt = *src.transform();
    let (src_rows, src_cols) = src.shape();
    let nodata = src.nodata();

    let data: Vec<f64> = (0..grid.rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; grid.cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let (x, y) = grid.cell_center(row, col);
                let (sx, sy) = transformer.transform(x, y);
                let Some((sc, sr)) = src_gt.cell_at(sx, sy, src_cols, src_rows) else {
                    continue;
                };
                // SAFETY: cell_at only returns indices inside the source shape
                let v = unsafe { src.get_unchecked(sr, sc) };
                if !v.is_nodata(nodata) {
                    *out = v.to_f64().unwrap_or(f64::NAN);
                }
            }
            row_data
        })
        .collect();

    let mut out = grid.raster(f64::NAN);
    *out.data_mut() = ndarray::Array2::from_shape_vec(grid.shape(), data).map_err(|e| Error::Other(e.to_string()))?;
    out.set_nodata(Some(f64::NAN));
    Ok(out)
}
