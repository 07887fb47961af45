//! Water / land thresholding of an index raster

use crate::maybe_rayon::*;
use tidemark_core::raster::Raster;
use tidemark_core::Result;

/// Cell classes of a classified water mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WaterClass {
    /// Missing input or zero index denominator
    Unclassified = 0,
    Water = 1,
    Land = 2,
}

impl WaterClass {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            1 => WaterClass::Water,
            2 => WaterClass::Land,
            _ => WaterClass::Unclassified,
        }
    }

    /// Class of one index value; a value equal to the threshold is land.
    pub fn of(index: f64, threshold: f64) -> Self {
        if index.is_nan() {
            WaterClass::Unclassified
        } else if index > threshold {
            WaterClass::Water
        } else {
            WaterClass::Land
        }
    }
}

/// Classify every cell of `index`: above `threshold` is water, at or below
/// is land, NaN stays unclassified (the output nodata, 0).
pub fn classify_water(index: &Raster<f64>, threshold: f64) -> Result<Raster<u8>> {
    let (rows, cols) = index.shape();
    let nodata = index.nodata();

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    // SAFETY: row < rows and col < cols
                    let v = unsafe { index.get_unchecked(row, col) };
                    let v = if nodata.is_some_and(|nd| v == nd) { f64::NAN } else { v };
                    WaterClass::of(v, threshold).code()
                })
                .collect::<Vec<u8>>()
        })
        .collect();

    let mut out = index.with_values(data)?;
    out.set_nodata(Some(WaterClass::Unclassified.code()));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_index_is_land() {
        assert_eq!(WaterClass::of(0.0, 0.0), WaterClass::Land);
        assert_eq!(WaterClass::of(1e-9, 0.0), WaterClass::Water);
        assert_eq!(WaterClass::of(-0.4, 0.0), WaterClass::Land);
        assert_eq!(WaterClass::of(f64::NAN, 0.0), WaterClass::Unclassified);
    }

    #[test]
    fn classifies_raster() {
        let idx = Raster::from_vec(vec![0.3, 0.0, -0.2, f64::NAN, 0.05, 0.1], 2, 3).unwrap();
        let classes = classify_water(&idx, 0.0).unwrap();
        let codes: Vec<u8> = classes.data().iter().copied().collect();
        assert_eq!(codes, vec![1, 2, 2, 0, 1, 1]);
        assert_eq!(classes.nodata(), Some(0));

        let strict = classify_water(&idx, 0.1).unwrap();
        assert_eq!(strict.get(1, 2).unwrap(), WaterClass::Land.code());
    }

    #[test]
    fn code_round_trip() {
        for c in [WaterClass::Unclassified, WaterClass::Water, WaterClass::Land] {
            assert_eq!(WaterClass::from_code(c.code()), c);
        }
    }
}
