//! Normalized-difference water index

use crate::maybe_rayon::*;
use tidemark_core::raster::{Raster, RasterElement};
use tidemark_core::{Error, Result};

/// `(a - b) / (a + b)` per cell.
///
/// Cells where either input is NaN or nodata, or where the sum is zero, are
/// NaN in the output. The output carries `a`'s georeference and NaN nodata.
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    check_dimensions(band_a, band_b)?;

    let (rows, cols) = band_a.shape();
    let nodata_a = band_a.nodata();
    let nodata_b = band_b.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                // SAFETY: row < rows and col < cols by construction
                let a = unsafe { band_a.get_unchecked(row, col) };
                let b = unsafe { band_b.get_unchecked(row, col) };

                if is_nodata_f64(a, nodata_a) || is_nodata_f64(b, nodata_b) {
                    continue;
                }
                let sum = a + b;
                if sum == 0.0 {
                    continue;
                }
                *out = (a - b) / sum;
            }
            row_data
        })
        .collect();

    let mut output = band_a.with_values(data)?;
    output.set_nodata(Some(f64::NAN));
    Ok(output)
}

/// Modified NDWI, Xu (2006): `(Green - SWIR) / (Green + SWIR)`
pub fn mndwi(green: &Raster<f64>, swir: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(green, swir)
}

pub(crate) fn is_nodata_f64(value: f64, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return true;
    }
    match nodata {
        Some(nd) => (value - nd).abs() < f64::EPSILON,
        None => false,
    }
}

pub(crate) fn check_dimensions<T: RasterElement, U: RasterElement>(a: &Raster<T>, b: &Raster<U>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tidemark_core::GeoTransform;

    fn band(values: Vec<f64>, rows: usize, cols: usize) -> Raster<f64> {
        let mut r = Raster::from_vec(values, rows, cols).unwrap();
        r.set_transform(GeoTransform::new(500_000.0, 9_200_000.0, 10.0, -10.0));
        r
    }

    #[test]
    fn water_is_positive() {
        let green = band(vec![1200.0, 400.0], 1, 2);
        let swir = band(vec![300.0, 2400.0], 1, 2);
        let idx = mndwi(&green, &swir).unwrap();
        assert_relative_eq!(idx.get(0, 0).unwrap(), 900.0 / 1500.0, epsilon = 1e-12);
        assert_relative_eq!(idx.get(0, 1).unwrap(), -2000.0 / 2800.0, epsilon = 1e-12);
        assert_eq!(idx.transform(), green.transform());
    }

    #[test]
    fn zero_sum_and_missing_are_nan() {
        let green = band(vec![0.0, f64::NAN, 5.0, 7.0], 2, 2);
        let mut nir = band(vec![0.0, 3.0, -9999.0, 7.0], 2, 2);
        nir.set_nodata(Some(-9999.0));
        let idx = normalized_difference(&green, &nir).unwrap();
        assert!(idx.get(0, 0).unwrap().is_nan());
        assert!(idx.get(0, 1).unwrap().is_nan());
        assert!(idx.get(1, 0).unwrap().is_nan());
        assert_eq!(idx.get(1, 1).unwrap(), 0.0);
        assert_eq!(idx.valid_count(), 1);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let a = band(vec![1.0; 4], 2, 2);
        let b = band(vec![1.0; 6], 2, 3);
        assert!(matches!(normalized_difference(&a, &b), Err(Error::SizeMismatch { .. })));
    }
}
