//! Tile decoding: decompression, predictor reversal and sample conversion.

use crate::error::{CloudError, Result};
use crate::ifd::Endian;

pub mod compression {
    pub const NONE: u16 = 1;
    pub const LZW: u16 = 5;
    pub const DEFLATE: u16 = 8;
    pub const ADOBE_DEFLATE: u16 = 32946;
}

pub mod predictor {
    pub const NONE: u16 = 1;
    pub const HORIZONTAL: u16 = 2;
}

pub mod sample_format {
    pub const UNSIGNED_INT: u16 = 1;
    pub const SIGNED_INT: u16 = 2;
    pub const FLOAT: u16 = 3;
}

pub fn decompress_tile(data: &[u8], compression_code: u16, expected_len: usize) -> Result<Vec<u8>> {
    match compression_code {
        compression::NONE => Ok(data.to_vec()),

        #[cfg(feature = "deflate")]
        compression::DEFLATE | compression::ADOBE_DEFLATE => {
            use std::io::Read;
            let mut out = Vec::with_capacity(expected_len);
            // zlib-wrapped per the TIFF spec; some writers emit raw deflate.
            if flate2::read::ZlibDecoder::new(data).read_to_end(&mut out).is_err() {
                out.clear();
                flate2::read::DeflateDecoder::new(data)
                    .read_to_end(&mut out)
                    .map_err(|e| CloudError::Decompress(format!("DEFLATE: {e}")))?;
            }
            Ok(out)
        }

        #[cfg(feature = "lzw")]
        compression::LZW => weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
            .decode(data)
            .map_err(|e| CloudError::Decompress(format!("LZW: {e}"))),

        other => Err(CloudError::UnsupportedCompression(other)),
    }
}

/// Reverse horizontal differencing (Predictor = 2) in place, row by row.
/// Sums wrap at the sample width, as the encoder's differences did.
pub fn undo_horizontal_predictor(
    raw: &mut [u8],
    tile_width: usize,
    bytes_per_sample: usize,
    endian: Endian,
) -> Result<()> {
    let row_len = tile_width * bytes_per_sample;
    if row_len == 0 {
        return Ok(());
    }
    for row in raw.chunks_exact_mut(row_len) {
        match bytes_per_sample {
            1 => {
                for i in 1..row.len() {
                    row[i] = row[i].wrapping_add(row[i - 1]);
                }
            }
            2 => {
                let mut prev = endian.u16(&row[0..2]);
                for px in row.chunks_exact_mut(2).skip(1) {
                    prev = prev.wrapping_add(endian.u16(px));
                    px.copy_from_slice(&match endian {
                        Endian::Little => prev.to_le_bytes(),
                        Endian::Big => prev.to_be_bytes(),
                    });
                }
            }
            4 => {
                let mut prev = endian.u32(&row[0..4]);
                for px in row.chunks_exact_mut(4).skip(1) {
                    prev = prev.wrapping_add(endian.u32(px));
                    px.copy_from_slice(&match endian {
                        Endian::Little => prev.to_le_bytes(),
                        Endian::Big => prev.to_be_bytes(),
                    });
                }
            }
            n => {
                return Err(CloudError::Decompress(format!("horizontal predictor on {n}-byte samples")));
            }
        }
    }
    Ok(())
}

/// Convert raw sample bytes to `f32`, honouring the file byte order.
pub fn decode_samples(raw: &[u8], bits_per_sample: u16, sample_format: u16, endian: Endian) -> Result<Vec<f32>> {
    use sample_format::*;
    let (bps, sf) = (bits_per_sample, sample_format);
    let width = (bps as usize).div_ceil(8).max(1);
    if raw.len() % width != 0 {
        return Err(CloudError::Decompress(format!(
            "{} bytes is not a whole number of {bps}-bit samples",
            raw.len()
        )));
    }
    let chunks = raw.chunks_exact(width);
    let values = match (bps, sf) {
        (8, UNSIGNED_INT) => chunks.map(|c| c[0] as f32).collect(),
        (8, SIGNED_INT) => chunks.map(|c| c[0] as i8 as f32).collect(),
        (16, UNSIGNED_INT) => chunks.map(|c| endian.u16(c) as f32).collect(),
        (16, SIGNED_INT) => chunks.map(|c| endian.u16(c) as i16 as f32).collect(),
        (32, UNSIGNED_INT) => chunks.map(|c| endian.u32(c) as f32).collect(),
        (32, SIGNED_INT) => chunks.map(|c| endian.u32(c) as i32 as f32).collect(),
        (32, FLOAT) => chunks.map(|c| endian.f32(c)).collect(),
        (64, FLOAT) => chunks.map(|c| endian.f64(c) as f32).collect(),
        _ => return Err(CloudError::UnsupportedDataType { bps, sf }),
    };
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncompressed_passthrough() {
        assert_eq!(decompress_tile(&[1, 2, 3], compression::NONE, 3).unwrap(), vec![1, 2, 3]);
        assert!(matches!(decompress_tile(&[0], 7, 1), Err(CloudError::UnsupportedCompression(7))));
    }

    #[cfg(feature = "deflate")]
    #[test]
    fn zlib_and_raw_deflate() {
        use std::io::Write;
        let original: Vec<u8> = (0..=255).collect();

        let mut z = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        z.write_all(&original).unwrap();
        assert_eq!(decompress_tile(&z.finish().unwrap(), compression::DEFLATE, 256).unwrap(), original);

        let mut d = flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        d.write_all(&original).unwrap();
        assert_eq!(decompress_tile(&d.finish().unwrap(), compression::ADOBE_DEFLATE, 256).unwrap(), original);
    }

    #[test]
    fn predictor_u16_little_endian() {
        // Two rows of three samples: [1000, 1005, 995] and [7, 7, 7] as differences
        let diffs: [u16; 6] = [1000, 5, 0u16.wrapping_sub(10), 7, 0, 0];
        let mut raw: Vec<u8> = diffs.iter().flat_map(|v| v.to_le_bytes()).collect();
        undo_horizontal_predictor(&mut raw, 3, 2, Endian::Little).unwrap();
        let out = decode_samples(&raw, 16, sample_format::UNSIGNED_INT, Endian::Little).unwrap();
        assert_eq!(out, vec![1000.0, 1005.0, 995.0, 7.0, 7.0, 7.0]);
    }

    #[test]
    fn big_endian_samples() {
        let raw: Vec<u8> = [1200u16, 40000].iter().flat_map(|v| v.to_be_bytes()).collect();
        let out = decode_samples(&raw, 16, sample_format::UNSIGNED_INT, Endian::Big).unwrap();
        assert_eq!(out, vec![1200.0, 40000.0]);

        let raw: Vec<u8> = (-2.5f32).to_be_bytes().to_vec();
        assert_eq!(decode_samples(&raw, 32, sample_format::FLOAT, Endian::Big).unwrap(), vec![-2.5]);
    }

    #[test]
    fn unsupported_sample_layout() {
        assert!(decode_samples(&[0; 8], 64, sample_format::UNSIGNED_INT, Endian::Little).is_err());
        assert!(decode_samples(&[0; 3], 16, sample_format::UNSIGNED_INT, Endian::Little).is_err());
    }
}
