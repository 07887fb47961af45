//! Cell value types

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Types that can be stored in a raster cell.
pub trait RasterElement:
    Copy + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Fill value for cells with no data (NaN for floats, `MIN` for integers,
    /// zero for unsigned bytes).
    fn default_nodata() -> Self;

    /// Whether this value represents no-data given the raster's declared value.
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

macro_rules! impl_int {
    ($($t:ty => $nd:expr),* $(,)?) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                $nd
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata == Some(*self)
            }
        }
    )*};
}

macro_rules! impl_float {
    ($($t:ty),*) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                self.is_nan() || matches!(nodata, Some(nd) if (self - nd).abs() <= <$t>::EPSILON * 100.0)
            }
        }
    )*};
}

impl_int!(u8 => 0, u16 => 0, i16 => i16::MIN, u32 => 0, i32 => i32::MIN);
impl_float!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_nan_is_always_nodata() {
        assert!(f64::NAN.is_nodata(None));
        assert!(0.0f64.is_nodata(Some(0.0)));
        assert!(!0.5f64.is_nodata(Some(0.0)));
    }

    #[test]
    fn integer_nodata_needs_declared_value() {
        assert!(!0u16.is_nodata(None));
        assert!(0u16.is_nodata(Some(0)));
        assert_eq!(<i32 as RasterElement>::default_nodata(), i32::MIN);
    }
}
