//! `.shp` main file: 100-byte header followed by big-endian record headers
//! and little-endian shape content.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use geo::{Area, Contains, Intersects, Orient};
use geo::orient::Direction;
use geo_types::{Coord, LineString, MultiPolygon, Point, Polygon};

pub(super) const FILE_CODE: i32 = 9994;
pub(super) const VERSION: i32 = 1000;
pub(super) const HEADER_LEN: usize = 100;

pub(super) const SHAPE_NULL: i32 = 0;
pub(super) const SHAPE_POLYGON: i32 = 5;
const SHAPE_POLYGON_Z: i32 = 15;
const SHAPE_POLYGON_M: i32 = 25;

fn is_polygon_type(t: i32) -> bool {
    matches!(t, SHAPE_POLYGON | SHAPE_POLYGON_Z | SHAPE_POLYGON_M)
}

fn slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8], String> {
    data.get(offset..offset + len)
        .ok_or_else(|| format!("truncated at byte {offset} (wanted {len} bytes of {})", data.len()))
}

/// Parse every record of a polygon `.shp` file. Null shapes yield `None`.
pub(super) fn read_polygons(data: &[u8]) -> Result<Vec<Option<MultiPolygon<f64>>>, String> {
    let header = slice(data, 0, HEADER_LEN)?;
    if BigEndian::read_i32(&header[0..4]) != FILE_CODE {
        return Err("bad file code, not a shapefile".into());
    }
    let version = LittleEndian::read_i32(&header[28..32]);
    if version != VERSION {
        return Err(format!("unsupported version {version}"));
    }
    let layer_type = LittleEndian::read_i32(&header[32..36]);
    if layer_type != SHAPE_NULL && !is_polygon_type(layer_type) {
        return Err(format!("shape type {layer_type} is not a polygon layer"));
    }

    let mut shapes = Vec::new();
    let mut pos = HEADER_LEN;
    while pos + 8 <= data.len() {
        let content_words = BigEndian::read_i32(&data[pos + 4..pos + 8]);
        if content_words < 0 {
            return Err(format!("negative record length at byte {pos}"));
        }
        let content = slice(data, pos + 8, content_words as usize * 2)?;
        shapes.push(read_record(content)?);
        pos += 8 + content_words as usize * 2;
    }
    Ok(shapes)
}

fn read_record(content: &[u8]) -> Result<Option<MultiPolygon<f64>>, String> {
    let shape_type = LittleEndian::read_i32(slice(content, 0, 4)?);
    if shape_type == SHAPE_NULL {
        return Ok(None);
    }
    if !is_polygon_type(shape_type) {
        return Err(format!("record shape type {shape_type} in polygon layer"));
    }

    // Skip the 4 bytes of type and the 32-byte record bbox.
    let counts = slice(content, 36, 8)?;
    let num_parts = LittleEndian::read_i32(&counts[0..4]).max(0) as usize;
    let num_points = LittleEndian::read_i32(&counts[4..8]).max(0) as usize;

    let parts_raw = slice(content, 44, num_parts * 4)?;
    let mut parts: Vec<usize> = parts_raw
        .chunks_exact(4)
        .map(|c| LittleEndian::read_i32(c).max(0) as usize)
        .collect();
    parts.push(num_points);

    let points_raw = slice(content, 44 + num_parts * 4, num_points * 16)?;
    let points: Vec<Coord<f64>> = points_raw
        .chunks_exact(16)
        .map(|c| Coord {
            x: LittleEndian::read_f64(&c[0..8]),
            y: LittleEndian::read_f64(&c[8..16]),
        })
        .collect();

    let mut rings = Vec::with_capacity(num_parts);
    for w in parts.windows(2) {
        let (start, end) = (w[0], w[1].min(points.len()));
        if start >= end {
            continue;
        }
        let mut ring = LineString::from(points[start..end].to_vec());
        ring.close();
        if ring.0.len() >= 4 {
            rings.push(ring);
        }
    }

    Ok(assemble_rings(rings))
}

/// Group shapefile rings into polygons. Clockwise rings are exteriors;
/// counter-clockwise rings are holes of the smallest exterior containing them.
pub(super) fn assemble_rings(rings: Vec<LineString<f64>>) -> Option<MultiPolygon<f64>> {
    let mut exteriors: Vec<(Polygon<f64>, Vec<LineString<f64>>)> = Vec::new();
    let mut holes = Vec::new();

    for ring in rings {
        let signed = Polygon::new(ring.clone(), vec![]).signed_area();
        if signed == 0.0 {
            continue;
        }
        if signed < 0.0 {
            exteriors.push((Polygon::new(ring, vec![]), Vec::new()));
        } else {
            holes.push(ring);
        }
    }

    // Writers that ignore winding produce only counter-clockwise rings.
    if exteriors.is_empty() {
        exteriors = holes.drain(..).map(|r| (Polygon::new(r, vec![]), Vec::new())).collect();
    }

    for hole in holes {
        let inside = Point::from(hole.0[0]);
        let owner = exteriors
            .iter()
            .enumerate()
            .filter(|(_, (ext, _))| ext.contains(&inside) || ext.intersects(&inside))
            .min_by(|a, b| {
                a.1 .0
                    .unsigned_area()
                    .partial_cmp(&b.1 .0.unsigned_area())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i);
        match owner {
            Some(i) => exteriors[i].1.push(hole),
            None => exteriors.push((Polygon::new(hole, vec![]), Vec::new())),
        }
    }

    if exteriors.is_empty() {
        return None;
    }
    let polygons = exteriors
        .into_iter()
        .map(|(ext, holes)| {
            let (exterior, _) = ext.into_inner();
            Polygon::new(exterior, holes).orient(Direction::Default)
        })
        .collect();
    Some(MultiPolygon::new(polygons))
}
