//! Sentinel-2 L2A radiometric offset removal

use tidemark_core::raster::Raster;

/// Digital-number offset added to L2A reflectances from processing
/// baseline 04.00 onward.
pub const BOA_ADD_OFFSET: f64 = 1000.0;

/// Remove `offset` from every valid cell, clamping at zero so the shifted
/// values stay on the pre-baseline scale. NaN cells are left alone.
pub fn remove_offset(raster: &mut Raster<f64>, offset: f64) {
    raster.data_mut().mapv_inplace(|v| if v.is_nan() { v } else { v.max(offset) - offset });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifts_and_clamps() {
        let mut r = Raster::from_vec(vec![1000.0, 1450.0, 800.0, f64::NAN], 2, 2).unwrap();
        remove_offset(&mut r, BOA_ADD_OFFSET);
        assert_eq!(r.get(0, 0).unwrap(), 0.0);
        assert_eq!(r.get(0, 1).unwrap(), 450.0);
        assert_eq!(r.get(1, 0).unwrap(), 0.0);
        assert!(r.get(1, 1).unwrap().is_nan());
    }
}
