use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use geo::orient::Direction;
use geo::{BoundingRect, Orient};
use geo_types::{Coord, Geometry, MultiPolygon, Polygon, Rect};
use tracing::debug;

use super::dbf::{DbfField, FieldKind, DESCRIPTOR_LEN, END_OF_FILE, FIELD_TERMINATOR};
use super::shp::{FILE_CODE, HEADER_LEN, SHAPE_NULL, SHAPE_POLYGON, VERSION};
use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{AttributeValue, FeatureCollection};

const MAX_CHAR_LEN: usize = 254;
const NUMERIC_LEN: u8 = 19;
const FLOAT_DECIMALS: u8 = 8;

/// Write polygon features as `.shp`, `.shx`, `.dbf` and, when the CRS is
/// known, `.prj`.
///
/// Field types are inferred from the property values: integers become
/// `N(19,0)`, any float makes the column `N(19,8)`, booleans become `L` and
/// everything else is stored as text.
pub fn write_shapefile(path: impl AsRef<Path>, features: &FeatureCollection, crs: Option<&CRS>) -> Result<()> {
    let path = path.as_ref();

    let mut shapes = Vec::with_capacity(features.len());
    for feature in features {
        let shape = match &feature.geometry {
            None => None,
            Some(Geometry::Polygon(p)) => Some(MultiPolygon::new(vec![p.clone()])),
            Some(Geometry::MultiPolygon(mp)) => Some(mp.clone()),
            Some(other) => {
                return Err(Error::InvalidParameter {
                    name: "geometry",
                    value: format!("{other:?}").chars().take(40).collect(),
                    reason: "only polygon layers can be written".into(),
                })
            }
        };
        shapes.push(shape);
    }

    let (shp, shx) = encode_shapes(&shapes);
    std::fs::write(path.with_extension("shp"), shp)?;
    std::fs::write(path.with_extension("shx"), shx)?;
    write_dbf(&path.with_extension("dbf"), features)?;

    if let Some(wkt) = crs.and_then(prj_text) {
        std::fs::write(path.with_extension("prj"), wkt)?;
    }

    debug!("Wrote {} features to {}", features.len(), path.display());
    Ok(())
}

fn prj_text(crs: &CRS) -> Option<String> {
    if let Some(wkt) = crs.wkt() {
        return Some(wkt.to_string());
    }
    const GEOGCS: &str = "GEOGCS[\"GCS_WGS_1984\",DATUM[\"D_WGS_1984\",SPHEROID[\"WGS_1984\",6378137.0,298.257223563]],PRIMEM[\"Greenwich\",0.0],UNIT[\"Degree\",0.0174532925199433]]";
    if crs.epsg() == Some(4326) {
        return Some(GEOGCS.to_string());
    }
    let (zone, north) = crs.utm_zone()?;
    let false_northing = if north { 0.0 } else { 10_000_000.0 };
    let central_meridian = zone as f64 * 6.0 - 183.0;
    Some(format!(
        "PROJCS[\"WGS_1984_UTM_Zone_{zone}{hemi}\",{GEOGCS},PROJECTION[\"Transverse_Mercator\"],\
PARAMETER[\"False_Easting\",500000.0],PARAMETER[\"False_Northing\",{false_northing:.1}],\
PARAMETER[\"Central_Meridian\",{central_meridian:.1}],PARAMETER[\"Scale_Factor\",0.9996],\
PARAMETER[\"Latitude_Of_Origin\",0.0],UNIT[\"Meter\",1.0]]",
        hemi = if north { "N" } else { "S" },
    ))
}

fn write_header(buf: &mut Vec<u8>, file_len_bytes: usize, bbox: Option<Rect<f64>>) {
    buf.extend_from_slice(&FILE_CODE.to_be_bytes());
    buf.extend_from_slice(&[0u8; 20]);
    buf.extend_from_slice(&((file_len_bytes / 2) as i32).to_be_bytes());
    buf.extend_from_slice(&VERSION.to_le_bytes());
    buf.extend_from_slice(&SHAPE_POLYGON.to_le_bytes());
    let (min, max) = bbox.map(|r| (r.min(), r.max())).unwrap_or((Coord { x: 0.0, y: 0.0 }, Coord { x: 0.0, y: 0.0 }));
    for v in [min.x, min.y, max.x, max.y, 0.0, 0.0, 0.0, 0.0] {
        buf.extend_from_slice(&v.to_le_bytes());
    }
}

fn encode_polygon_content(mp: &MultiPolygon<f64>) -> Vec<u8> {
    // Shapefile winding is the reverse of the OGC convention.
    let rings: Vec<_> = mp
        .0
        .iter()
        .map(|p: &Polygon<f64>| p.orient(Direction::Reversed))
        .flat_map(|p| {
            let (ext, holes) = p.into_inner();
            std::iter::once(ext).chain(holes)
        })
        .collect();
    let num_points: usize = rings.iter().map(|r| r.0.len()).sum();
    let rect = mp.bounding_rect();

    let mut c = Vec::with_capacity(44 + rings.len() * 4 + num_points * 16);
    c.extend_from_slice(&SHAPE_POLYGON.to_le_bytes());
    let (min, max) = rect.map(|r| (r.min(), r.max())).unwrap_or((Coord { x: 0.0, y: 0.0 }, Coord { x: 0.0, y: 0.0 }));
    for v in [min.x, min.y, max.x, max.y] {
        c.extend_from_slice(&v.to_le_bytes());
    }
    c.extend_from_slice(&(rings.len() as i32).to_le_bytes());
    c.extend_from_slice(&(num_points as i32).to_le_bytes());
    let mut start = 0;
    for r in &rings {
        c.extend_from_slice(&(start as i32).to_le_bytes());
        start += r.0.len();
    }
    for r in &rings {
        for coord in &r.0 {
            c.extend_from_slice(&coord.x.to_le_bytes());
            c.extend_from_slice(&coord.y.to_le_bytes());
        }
    }
    c
}

fn encode_shapes(shapes: &[Option<MultiPolygon<f64>>]) -> (Vec<u8>, Vec<u8>) {
    let contents: Vec<Vec<u8>> = shapes
        .iter()
        .map(|s| match s {
            Some(mp) => encode_polygon_content(mp),
            None => SHAPE_NULL.to_le_bytes().to_vec(),
        })
        .collect();

    let bbox = shapes
        .iter()
        .flatten()
        .filter_map(|mp| mp.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
                (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
            )
        });

    let shp_len = HEADER_LEN + contents.iter().map(|c| 8 + c.len()).sum::<usize>();
    let shx_len = HEADER_LEN + contents.len() * 8;

    let mut shp = Vec::with_capacity(shp_len);
    let mut shx = Vec::with_capacity(shx_len);
    write_header(&mut shp, shp_len, bbox);
    write_header(&mut shx, shx_len, bbox);

    for (i, content) in contents.iter().enumerate() {
        let offset_words = (shp.len() / 2) as i32;
        let len_words = (content.len() / 2) as i32;
        shx.extend_from_slice(&offset_words.to_be_bytes());
        shx.extend_from_slice(&len_words.to_be_bytes());
        shp.extend_from_slice(&(i as i32 + 1).to_be_bytes());
        shp.extend_from_slice(&len_words.to_be_bytes());
        shp.extend_from_slice(content);
    }
    (shp, shx)
}

fn infer_fields(features: &FeatureCollection) -> Vec<DbfField> {
    let mut names: Vec<&String> = features.iter().flat_map(|f| f.properties.keys()).collect();
    names.sort();
    names.dedup();

    names
        .into_iter()
        .map(|name| {
            let values = features.iter().filter_map(|f| f.properties.get(name)).filter(|v| !v.is_missing());
            let (mut ints, mut floats, mut bools, mut texts, mut width) = (0, 0, 0, 0, 1usize);
            for v in values {
                match v {
                    AttributeValue::Int(_) => ints += 1,
                    AttributeValue::Float(_) => floats += 1,
                    AttributeValue::Bool(_) => bools += 1,
                    _ => texts += 1,
                }
                width = width.max(v.to_string().len());
            }
            let truncated: String = name.chars().take(10).collect();
            let (kind, length, decimals) = if texts > 0 || (bools > 0 && ints + floats > 0) {
                (FieldKind::Character, width.min(MAX_CHAR_LEN) as u8, 0)
            } else if bools > 0 {
                (FieldKind::Logical, 1, 0)
            } else if floats > 0 {
                (FieldKind::Numeric, NUMERIC_LEN, FLOAT_DECIMALS)
            } else if ints > 0 {
                (FieldKind::Numeric, NUMERIC_LEN, 0)
            } else {
                (FieldKind::Character, 1, 0)
            };
            DbfField { name: truncated, kind, length, decimals }
        })
        .collect()
}

fn format_value(field: &DbfField, value: Option<&AttributeValue>) -> Vec<u8> {
    let len = field.length as usize;
    let text = match (field.kind, value) {
        (_, None) => String::new(),
        (_, Some(v)) if v.is_missing() => String::new(),
        (FieldKind::Logical, Some(AttributeValue::Bool(b))) => (if *b { "T" } else { "F" }).to_string(),
        (FieldKind::Numeric, Some(v)) if field.decimals > 0 => {
            v.as_f64().map(|x| format!("{x:>len$.prec$}", prec = field.decimals as usize)).unwrap_or_default()
        }
        (FieldKind::Numeric, Some(v)) => format!("{v:>len$}"),
        (_, Some(v)) => v.to_string(),
    };
    let mut bytes = text.into_bytes();
    bytes.truncate(len);
    if field.kind == FieldKind::Numeric {
        let mut padded = vec![b' '; len - bytes.len()];
        padded.extend(bytes);
        padded
    } else {
        bytes.resize(len, b' ');
        bytes
    }
}

fn write_dbf(path: &Path, features: &FeatureCollection) -> Result<()> {
    let fields = infer_fields(features);
    let header_len = DESCRIPTOR_LEN + fields.len() * DESCRIPTOR_LEN + 1;
    let record_len = 1 + fields.iter().map(|f| f.length as usize).sum::<usize>();

    let mut w = BufWriter::new(File::create(path)?);
    w.write_u8(0x03)?;
    w.write_all(&[95, 1, 1])?;
    w.write_u32::<LittleEndian>(features.len() as u32)?;
    w.write_u16::<LittleEndian>(header_len as u16)?;
    w.write_u16::<LittleEndian>(record_len as u16)?;
    w.write_all(&[0u8; 20])?;

    for field in &fields {
        let mut name = [0u8; 11];
        for (dst, src) in name.iter_mut().zip(field.name.bytes().take(10)) {
            *dst = src;
        }
        w.write_all(&name)?;
        w.write_u8(field.kind.code())?;
        w.write_all(&[0u8; 4])?;
        w.write_u8(field.length)?;
        w.write_u8(field.decimals)?;
        w.write_all(&[0u8; 14])?;
    }
    w.write_u8(FIELD_TERMINATOR)?;

    let mut names: Vec<&String> = features.iter().flat_map(|f| f.properties.keys()).collect();
    names.sort();
    names.dedup();

    for feature in features {
        w.write_u8(b' ')?;
        for (field, key) in fields.iter().zip(&names) {
            w.write_all(&format_value(field, feature.properties.get(*key)))?;
        }
    }
    w.write_u8(END_OF_FILE)?;
    w.flush()?;
    Ok(())
}
