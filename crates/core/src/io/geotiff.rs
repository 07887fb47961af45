//! GeoTIFF reading and writing through the `tiff` crate.
//!
//! Georeferencing uses ModelPixelScale + ModelTiepoint (north-up only) and a
//! GeoKey directory carrying the EPSG code.

use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{Gray32Float, Gray8};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

/// Registered GeoTIFF codes decode as named variants, not `Tag::Unknown`.
fn geo_tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

const KEY_MODEL_TYPE: u16 = 1024;
const KEY_RASTER_TYPE: u16 = 1025;
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;

/// Sample type written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelType {
    UInt8,
    #[default]
    Float32,
}

#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    pub pixel_type: PixelType,
}

impl GeoTiffOptions {
    pub fn uint8() -> Self {
        Self { pixel_type: PixelType::UInt8 }
    }
}

/// Read the first band of a GeoTIFF file.
pub fn read_geotiff<T: RasterElement>(path: impl AsRef<Path>) -> Result<Raster<T>> {
    decode_geotiff(File::open(path.as_ref())?)
}

/// Read the first band of an in-memory GeoTIFF.
pub fn read_geotiff_from_buffer<T: RasterElement>(data: &[u8]) -> Result<Raster<T>> {
    decode_geotiff(Cursor::new(data))
}

fn cast_all<S: Copy + num_traits::NumCast, T: RasterElement>(buf: Vec<S>) -> Vec<T> {
    buf.into_iter().map(|v| num_traits::cast(v).unwrap_or_else(T::default_nodata)).collect()
}

fn decode_geotiff<T: RasterElement, R: Read + Seek>(reader: R) -> Result<Raster<T>> {
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;
    let (rows, cols) = (height as usize, width as usize);

    let data: Vec<T> = match decoder.read_image()? {
        DecodingResult::U8(buf) => cast_all(buf),
        DecodingResult::U16(buf) => cast_all(buf),
        DecodingResult::U32(buf) => cast_all(buf),
        DecodingResult::I16(buf) => cast_all(buf),
        DecodingResult::I32(buf) => cast_all(buf),
        DecodingResult::F32(buf) => cast_all(buf),
        DecodingResult::F64(buf) => cast_all(buf),
        _ => return Err(Error::Tiff("unsupported pixel format".into())),
    };

    let mut raster = Raster::from_vec(data, rows, cols)?;

    let scale = decoder.get_tag_f64_vec(geo_tag(MODEL_PIXEL_SCALE)).ok();
    let tiepoint = decoder.get_tag_f64_vec(geo_tag(MODEL_TIEPOINT)).ok();
    if let (Some(scale), Some(tp)) = (scale, tiepoint) {
        if scale.len() >= 2 && tp.len() >= 6 {
            raster.set_transform(GeoTransform::new(
                tp[3] - tp[0] * scale[0],
                tp[4] + tp[1] * scale[1],
                scale[0],
                -scale[1],
            ));
        }
    }

    if let Ok(keys) = decoder.get_tag_u16_vec(geo_tag(GEO_KEY_DIRECTORY)) {
        if let Some(epsg) = epsg_from_geokeys(&keys) {
            raster.set_crs(Some(CRS::from_epsg(epsg)));
        }
    }

    if let Ok(text) = decoder.get_tag_ascii_string(geo_tag(GDAL_NODATA)) {
        if let Some(nodata) = text.trim().parse::<f64>().ok().and_then(num_traits::cast) {
            raster.set_nodata(Some(nodata));
        }
    }

    Ok(raster)
}

fn epsg_from_geokeys(keys: &[u16]) -> Option<u32> {
    let count = *keys.get(3)? as usize;
    keys.get(4..4 + count * 4)?
        .chunks_exact(4)
        .find(|k| matches!(k[0], KEY_PROJECTED_CS_TYPE | KEY_GEOGRAPHIC_TYPE) && k[1] == 0)
        .map(|k| k[3] as u32)
}

fn geokeys(crs: Option<&CRS>) -> Vec<u16> {
    let mut entries: Vec<[u16; 4]> = Vec::new();
    let epsg = crs.and_then(|c| c.epsg()).filter(|&e| e <= u16::MAX as u32);
    let geographic = crs.map(|c| c.is_geographic()).unwrap_or(false);
    entries.push([KEY_MODEL_TYPE, 0, 1, if geographic { 2 } else { 1 }]);
    entries.push([KEY_RASTER_TYPE, 0, 1, 1]);
    if let Some(code) = epsg {
        let key = if geographic { KEY_GEOGRAPHIC_TYPE } else { KEY_PROJECTED_CS_TYPE };
        entries.push([key, 0, 1, code as u16]);
    }
    let mut out = vec![1, 1, 0, entries.len() as u16];
    out.extend(entries.into_iter().flatten());
    out
}

fn write_geo_tags<W: Write + Seek, K: TiffKind, T: RasterElement>(
    dir: &mut DirectoryEncoder<'_, W, K>,
    raster: &Raster<T>,
) -> Result<()> {
    let gt = raster.transform();
    dir.write_tag(geo_tag(MODEL_PIXEL_SCALE), &[gt.pixel_width, gt.pixel_height.abs(), 0.0][..])?;
    dir.write_tag(geo_tag(MODEL_TIEPOINT), &[0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0][..])?;
    dir.write_tag(geo_tag(GEO_KEY_DIRECTORY), geokeys(raster.crs()).as_slice())?;
    if let Some(nodata) = raster.nodata().and_then(|v| v.to_f64()) {
        if !nodata.is_nan() {
            dir.write_tag(geo_tag(GDAL_NODATA), nodata.to_string().as_str())?;
        }
    }
    Ok(())
}

fn encode_geotiff<T: RasterElement, W: Write + Seek>(
    raster: &Raster<T>,
    writer: W,
    options: &GeoTiffOptions,
) -> Result<()> {
    let mut encoder = TiffEncoder::new(writer)?;
    let (rows, cols) = raster.shape();

    match options.pixel_type {
        PixelType::UInt8 => {
            let data: Vec<u8> = raster.data().iter().map(|&v| num_traits::cast(v).unwrap_or(0)).collect();
            let mut image = encoder.new_image::<Gray8>(cols as u32, rows as u32)?;
            write_geo_tags(image.encoder(), raster)?;
            image.write_data(&data)?;
        }
        PixelType::Float32 => {
            let data: Vec<f32> = raster
                .data()
                .iter()
                .map(|&v| if v.is_nodata(raster.nodata()) { f32::NAN } else { num_traits::cast(v).unwrap_or(f32::NAN) })
                .collect();
            let mut image = encoder.new_image::<Gray32Float>(cols as u32, rows as u32)?;
            write_geo_tags(image.encoder(), raster)?;
            image.write_data(&data)?;
        }
    }
    Ok(())
}

/// Write a raster as a single-band GeoTIFF.
pub fn write_geotiff<T: RasterElement>(
    raster: &Raster<T>,
    path: impl AsRef<Path>,
    options: &GeoTiffOptions,
) -> Result<()> {
    let file = std::io::BufWriter::new(File::create(path.as_ref())?);
    encode_geotiff(raster, file, options)
}

pub fn write_geotiff_to_buffer<T: RasterElement>(raster: &Raster<T>, options: &GeoTiffOptions) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf), options)?;
    Ok(buf)
}
