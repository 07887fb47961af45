//! Georeferencing from GeoTIFF tags: north-up transform, EPSG code and the
//! GDAL nodata value.

use tidemark_core::crs::CRS;
use tidemark_core::raster::GeoTransform;

use crate::error::{CloudError, Result};
use crate::ifd::{tags, TagSet};

const KEY_GEOGRAPHIC_TYPE: u64 = 2048;
const KEY_PROJECTED_CS_TYPE: u64 = 3072;
/// GeoKey value meaning "user defined".
const USER_DEFINED: u64 = 32767;

#[derive(Debug, Clone)]
pub struct GeoReference {
    pub transform: GeoTransform,
    pub crs: Option<CRS>,
    pub nodata: Option<f64>,
}

pub fn georeference(t: &TagSet) -> Result<GeoReference> {
    Ok(GeoReference { transform: geotransform(t)?, crs: crs(t), nodata: nodata(t) })
}

fn geotransform(t: &TagSet) -> Result<GeoTransform> {
    if let (Some(scale), Some(tp)) = (t.f64s(tags::MODEL_PIXEL_SCALE), t.f64s(tags::MODEL_TIEPOINT)) {
        if scale.len() >= 2 && tp.len() >= 6 {
            return Ok(GeoTransform::new(
                tp[3] - tp[0] * scale[0],
                tp[4] + tp[1] * scale[1],
                scale[0],
                -scale[1],
            ));
        }
    }

    // Row-major 4x4 matrix; only the axis-aligned case maps onto GeoTransform.
    if let Some(m) = t.f64s(tags::MODEL_TRANSFORMATION).filter(|m| m.len() >= 16) {
        if m[1] != 0.0 || m[4] != 0.0 {
            return Err(CloudError::InvalidTiff { reason: "rotated or sheared geotransform".into() });
        }
        return Ok(GeoTransform::new(m[3], m[7], m[0], m[5]));
    }

    Err(CloudError::InvalidTiff { reason: "no georeferencing tags".into() })
}

fn crs(t: &TagSet) -> Option<CRS> {
    let keys = t.u64s(tags::GEO_KEY_DIRECTORY)?;
    let count = *keys.get(3)? as usize;
    keys.get(4..4 + count * 4)?
        .chunks_exact(4)
        .filter(|k| k[1] == 0 && k[3] != 0 && k[3] != USER_DEFINED)
        .find(|k| k[0] == KEY_PROJECTED_CS_TYPE || k[0] == KEY_GEOGRAPHIC_TYPE)
        .map(|k| CRS::from_epsg(k[3] as u32))
}

fn nodata(t: &TagSet) -> Option<f64> {
    t.ascii(tags::GDAL_NODATA)?.trim().parse().ok()
}
