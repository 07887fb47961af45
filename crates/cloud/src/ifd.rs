//! TIFF directory parsing over byte buffers fetched with range requests.
//!
//! Classic (32-bit offset) TIFF only. Values are decoded with the file's byte
//! order, including small arrays stored inline in the entry.

use std::collections::BTreeMap;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{CloudError, Result};

pub mod tags {
    pub const NEW_SUBFILE_TYPE: u16 = 254;
    pub const IMAGE_WIDTH: u16 = 256;
    pub const IMAGE_LENGTH: u16 = 257;
    pub const BITS_PER_SAMPLE: u16 = 258;
    pub const COMPRESSION: u16 = 259;
    pub const SAMPLES_PER_PIXEL: u16 = 277;
    pub const PLANAR_CONFIG: u16 = 284;
    pub const PREDICTOR: u16 = 317;
    pub const TILE_WIDTH: u16 = 322;
    pub const TILE_LENGTH: u16 = 323;
    pub const TILE_OFFSETS: u16 = 324;
    pub const TILE_BYTE_COUNTS: u16 = 325;
    pub const SAMPLE_FORMAT: u16 = 339;
    pub const MODEL_PIXEL_SCALE: u16 = 33550;
    pub const MODEL_TIEPOINT: u16 = 33922;
    pub const MODEL_TRANSFORMATION: u16 = 34264;
    pub const GEO_KEY_DIRECTORY: u16 = 34735;
    pub const GDAL_NODATA: u16 = 42113;
}

/// NewSubfileType bit marking a transparency mask.
const SUBFILE_MASK: u64 = 0x4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub fn u16(self, b: &[u8]) -> u16 {
        match self {
            Endian::Little => LittleEndian::read_u16(b),
            Endian::Big => BigEndian::read_u16(b),
        }
    }

    pub fn u32(self, b: &[u8]) -> u32 {
        match self {
            Endian::Little => LittleEndian::read_u32(b),
            Endian::Big => BigEndian::read_u32(b),
        }
    }

    pub fn u64(self, b: &[u8]) -> u64 {
        match self {
            Endian::Little => LittleEndian::read_u64(b),
            Endian::Big => BigEndian::read_u64(b),
        }
    }

    pub fn f32(self, b: &[u8]) -> f32 {
        f32::from_bits(self.u32(b))
    }

    pub fn f64(self, b: &[u8]) -> f64 {
        f64::from_bits(self.u64(b))
    }
}

/// Size in bytes of one value of a TIFF field type.
fn field_size(field_type: u16) -> usize {
    match field_type {
        1 | 2 | 6 | 7 => 1,
        3 | 8 => 2,
        4 | 9 | 11 => 4,
        5 | 10 | 12 | 16 | 17 => 8,
        _ => 1,
    }
}

fn invalid(reason: impl Into<String>) -> CloudError {
    CloudError::InvalidTiff { reason: reason.into() }
}

/// One directory entry as stored in the file.
#[derive(Debug, Clone)]
pub struct TagEntry {
    pub tag: u16,
    pub field_type: u16,
    pub count: u32,
    /// The 4 value bytes exactly as they appear in the entry.
    pub value: [u8; 4],
}

impl TagEntry {
    pub fn byte_len(&self) -> u64 {
        field_size(self.field_type) as u64 * self.count as u64
    }

    pub fn is_inline(&self) -> bool {
        self.byte_len() <= 4
    }

    pub fn offset(&self, endian: Endian) -> u64 {
        endian.u32(&self.value) as u64
    }
}

#[derive(Debug, Clone)]
pub struct Directory {
    pub entries: Vec<TagEntry>,
    pub next_offset: u64,
}

/// Byte order and first directory offset from the 8-byte header.
pub fn parse_header(data: &[u8]) -> Result<(Endian, u64)> {
    let head = data.get(..8).ok_or_else(|| invalid("header too short"))?;
    let endian = match &head[..2] {
        b"II" => Endian::Little,
        b"MM" => Endian::Big,
        _ => return Err(invalid("invalid byte order marker")),
    };
    match endian.u16(&head[2..4]) {
        42 => Ok((endian, endian.u32(&head[4..8]) as u64)),
        43 => Err(invalid("BigTIFF is not supported")),
        magic => Err(invalid(format!("expected magic 42, got {magic}"))),
    }
}

/// Number of bytes a directory occupies, given its first two bytes.
pub fn directory_len(endian: Endian, head: &[u8]) -> usize {
    2 + endian.u16(head) as usize * 12 + 4
}

/// Parse a directory; `data` starts at the directory offset.
pub fn parse_directory(endian: Endian, data: &[u8]) -> Result<Directory> {
    let head = data.get(..2).ok_or_else(|| invalid("directory too short"))?;
    let needed = directory_len(endian, head);
    if data.len() < needed {
        return Err(invalid(format!("directory needs {needed} bytes, have {}", data.len())));
    }
    let count = endian.u16(head) as usize;
    let entries = data[2..2 + count * 12]
        .chunks_exact(12)
        .map(|e| TagEntry {
            tag: endian.u16(&e[0..2]),
            field_type: endian.u16(&e[2..4]),
            count: endian.u32(&e[4..8]),
            value: [e[8], e[9], e[10], e[11]],
        })
        .collect();
    let next_offset = endian.u32(&data[needed - 4..needed]) as u64;
    Ok(Directory { entries, next_offset })
}

/// Tag values of one directory with out-of-line data already fetched.
#[derive(Debug, Clone)]
pub struct TagSet {
    endian: Endian,
    values: BTreeMap<u16, (u16, u32, Vec<u8>)>,
}

impl TagSet {
    pub fn new(endian: Endian) -> Self {
        Self { endian, values: BTreeMap::new() }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Store an entry's value bytes (`external` for out-of-line entries).
    pub fn insert(&mut self, entry: &TagEntry, external: Option<Vec<u8>>) {
        let bytes = external.unwrap_or_else(|| entry.value[..entry.byte_len().min(4) as usize].to_vec());
        self.values.insert(entry.tag, (entry.field_type, entry.count, bytes));
    }

    pub fn contains(&self, tag: u16) -> bool {
        self.values.contains_key(&tag)
    }

    /// Integer values (BYTE, SHORT, LONG, LONG8).
    pub fn u64s(&self, tag: u16) -> Option<Vec<u64>> {
        let (ft, count, bytes) = self.values.get(&tag)?;
        let size = field_size(*ft);
        let e = self.endian;
        let vals = bytes
            .chunks_exact(size)
            .take(*count as usize)
            .map(|c| match ft {
                1 | 7 => c[0] as u64,
                3 => e.u16(c) as u64,
                4 => e.u32(c) as u64,
                16 => e.u64(c),
                _ => 0,
            })
            .collect();
        matches!(ft, 1 | 3 | 4 | 7 | 16).then_some(vals)
    }

    pub fn first_u64(&self, tag: u16) -> Option<u64> {
        self.u64s(tag)?.first().copied()
    }

    /// Floating-point values (FLOAT, DOUBLE).
    pub fn f64s(&self, tag: u16) -> Option<Vec<f64>> {
        let (ft, count, bytes) = self.values.get(&tag)?;
        let e = self.endian;
        match ft {
            11 => Some(bytes.chunks_exact(4).take(*count as usize).map(|c| e.f32(c) as f64).collect()),
            12 => Some(bytes.chunks_exact(8).take(*count as usize).map(|c| e.f64(c)).collect()),
            _ => None,
        }
    }

    /// NUL-terminated ASCII value.
    pub fn ascii(&self, tag: u16) -> Option<String> {
        let (_, _, bytes) = self.values.get(&tag)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}

/// Image structure of one directory.
#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tile_offsets: Vec<u64>,
    pub tile_byte_counts: Vec<u64>,
    pub bits_per_sample: u16,
    pub sample_format: u16,
    pub compression: u16,
    pub predictor: u16,
    pub samples_per_pixel: u16,
    pub planar_config: u16,
    pub is_mask: bool,
}

impl ImageInfo {
    pub fn from_tags(t: &TagSet) -> Result<Self> {
        let width = t.first_u64(tags::IMAGE_WIDTH).ok_or_else(|| invalid("missing ImageWidth"))? as u32;
        let height = t.first_u64(tags::IMAGE_LENGTH).ok_or_else(|| invalid("missing ImageLength"))? as u32;
        if !t.contains(tags::TILE_OFFSETS) {
            return Err(invalid("striped TIFF; only tiled COGs are supported"));
        }
        let tile_offsets = t.u64s(tags::TILE_OFFSETS).unwrap_or_default();
        let tile_byte_counts = t.u64s(tags::TILE_BYTE_COUNTS).unwrap_or_default();
        if tile_offsets.len() != tile_byte_counts.len() {
            return Err(invalid("tile offsets and byte counts differ in length"));
        }
        let get16 = |tag, default| t.first_u64(tag).map(|v| v as u16).unwrap_or(default);
        Ok(Self {
            width,
            height,
            tile_width: t.first_u64(tags::TILE_WIDTH).map(|v| v as u32).unwrap_or(width),
            tile_height: t.first_u64(tags::TILE_LENGTH).map(|v| v as u32).unwrap_or(height),
            tile_offsets,
            tile_byte_counts,
            bits_per_sample: get16(tags::BITS_PER_SAMPLE, 1),
            sample_format: get16(tags::SAMPLE_FORMAT, 1),
            compression: get16(tags::COMPRESSION, 1),
            predictor: get16(tags::PREDICTOR, 1),
            samples_per_pixel: get16(tags::SAMPLES_PER_PIXEL, 1),
            planar_config: get16(tags::PLANAR_CONFIG, 1),
            is_mask: t.first_u64(tags::NEW_SUBFILE_TYPE).map(|v| v & SUBFILE_MASK != 0).unwrap_or(false),
        })
    }

    pub fn tiles_across(&self) -> usize {
        (self.width as usize).div_ceil(self.tile_width.max(1) as usize)
    }

    pub fn bytes_per_sample(&self) -> usize {
        (self.bits_per_sample as usize).div_ceil(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_bytes(endian: Endian, tag: u16, ft: u16, count: u32, value: [u8; 4]) -> Vec<u8> {
        let mut v = Vec::new();
        match endian {
            Endian::Little => {
                v.extend(tag.to_le_bytes());
                v.extend(ft.to_le_bytes());
                v.extend(count.to_le_bytes());
            }
            Endian::Big => {
                v.extend(tag.to_be_bytes());
                v.extend(ft.to_be_bytes());
                v.extend(count.to_be_bytes());
            }
        }
        v.extend(value);
        v
    }

    #[test]
    fn header_byte_orders() {
        assert_eq!(parse_header(b"II*\0\x08\0\0\0").unwrap(), (Endian::Little, 8));
        assert_eq!(parse_header(b"MM\0*\0\0\0\x08").unwrap(), (Endian::Big, 8));
        assert!(parse_header(b"II+\0\x08\0\0\0").is_err());
        assert!(parse_header(b"XX").is_err());
    }

    #[test]
    fn big_endian_inline_short_pair() {
        // Two SHORTs packed inline: 512, 256
        let mut data = 2u16.to_be_bytes().to_vec();
        data.extend(entry_bytes(Endian::Big, tags::TILE_OFFSETS, 3, 2, [0x02, 0x00, 0x01, 0x00]));
        data.extend(entry_bytes(Endian::Big, tags::IMAGE_WIDTH, 3, 1, [0x01, 0x00, 0, 0]));
        data.extend(0u32.to_be_bytes());

        let dir = parse_directory(Endian::Big, &data).unwrap();
        assert_eq!(dir.entries.len(), 2);
        assert_eq!(dir.next_offset, 0);

        let mut set = TagSet::new(Endian::Big);
        for e in &dir.entries {
            assert!(e.is_inline());
            set.insert(e, None);
        }
        assert_eq!(set.u64s(tags::TILE_OFFSETS), Some(vec![512, 256]));
        assert_eq!(set.first_u64(tags::IMAGE_WIDTH), Some(256));
    }

    #[test]
    fn external_doubles_and_ascii() {
        let mut set = TagSet::new(Endian::Little);
        let scale = TagEntry { tag: tags::MODEL_PIXEL_SCALE, field_type: 12, count: 2, value: [0; 4] };
        assert!(!scale.is_inline());
        set.insert(&scale, Some([10.0f64, 20.0].iter().flat_map(|v| v.to_le_bytes()).collect()));
        assert_eq!(set.f64s(tags::MODEL_PIXEL_SCALE), Some(vec![10.0, 20.0]));

        let nodata = TagEntry { tag: tags::GDAL_NODATA, field_type: 2, count: 2, value: [b'0', 0, 0, 0] };
        set.insert(&nodata, None);
        assert_eq!(set.ascii(tags::GDAL_NODATA).as_deref(), Some("0"));
    }

    #[test]
    fn striped_images_are_rejected() {
        let mut set = TagSet::new(Endian::Little);
        set.insert(&TagEntry { tag: tags::IMAGE_WIDTH, field_type: 3, count: 1, value: [10, 0, 0, 0] }, None);
        set.insert(&TagEntry { tag: tags::IMAGE_LENGTH, field_type: 3, count: 1, value: [10, 0, 0, 0] }, None);
        assert!(ImageInfo::from_tags(&set).is_err());
    }
}
