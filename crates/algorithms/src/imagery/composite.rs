//! Per-pixel median compositing of co-registered scenes

use crate::maybe_rayon::*;
use tidemark_core::raster::Raster;
use tidemark_core::{Error, Result};

use super::indices::{check_dimensions, is_nodata_f64};

/// Median of the valid observations at each cell.
///
/// All rasters must share one grid. NaN and each raster's own nodata value
/// are skipped; an even number of observations averages the middle pair.
/// Cells with no observation at all are NaN.
pub fn median_composite(stack: &[Raster<f64>]) -> Result<Raster<f64>> {
    let first = stack.first().ok_or_else(|| Error::InvalidParameter {
        name: "stack",
        value: "0 rasters".into(),
        reason: "a composite needs at least one scene".into(),
    })?;
    for r in &stack[1..] {
        check_dimensions(first, r)?;
    }

    let (rows, cols) = first.shape();
    let nodata: Vec<Option<f64>> = stack.iter().map(|r| r.nodata()).collect();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut obs = Vec::with_capacity(stack.len());
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                obs.clear();
                for (r, nd) in stack.iter().zip(&nodata) {
                    // SAFETY: every raster was checked to be rows x cols
                    let v = unsafe { r.get_unchecked(row, col) };
                    if !is_nodata_f64(v, *nd) {
                        obs.push(v);
                    }
                }
                *out = median(&mut obs);
            }
            row_data
        })
        .collect();

    let mut output = first.with_values(data)?;
    output.set_nodata(Some(f64::NAN));
    Ok(output)
}

fn median(values: &mut [f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    values.sort_unstable_by(f64::total_cmp);
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}
