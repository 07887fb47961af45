//! ESRI Shapefile polygon layers: `.shp` geometry, `.dbf` attributes and the
//! `.prj` CRS sidecar.

mod dbf;
mod shp;
mod writer;

pub use dbf::{DbfField, FieldKind};
pub use writer::write_shapefile;

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{Feature, FeatureCollection};

/// A polygon layer read from disk.
#[derive(Debug, Clone)]
pub struct ShapefileLayer {
    pub features: FeatureCollection,
    pub fields: Vec<DbfField>,
    /// `None` when the `.prj` sidecar is absent
    pub crs: Option<CRS>,
}

/// Locate a sidecar next to `path`, accepting lower- or upper-case extensions.
fn sidecar(path: &Path, ext: &str) -> Option<PathBuf> {
    [ext.to_ascii_lowercase(), ext.to_ascii_uppercase()]
        .iter()
        .map(|e| path.with_extension(e))
        .find(|p| p.is_file())
}

/// Read a polygon shapefile with its attribute table and CRS.
///
/// Records whose shape is null or whose `.dbf` row is marked deleted are
/// skipped; the remaining features carry the record number as their id.
pub fn read_shapefile(path: impl AsRef<Path>) -> Result<ShapefileLayer> {
    let path = path.as_ref();
    let invalid = |reason: String| Error::InvalidShapefile { path: path.display().to_string(), reason };

    let shp_bytes = std::fs::read(path)?;
    let shapes = shp::read_polygons(&shp_bytes).map_err(invalid)?;

    let dbf_path = sidecar(path, "dbf").ok_or_else(|| invalid("missing .dbf sidecar".into()))?;
    let dbf_bytes = std::fs::read(&dbf_path)?;
    let table = dbf::read_table(&dbf_bytes).map_err(invalid)?;

    if table.records.len() != shapes.len() {
        return Err(invalid(format!(
            "{} shapes but {} attribute records",
            shapes.len(),
            table.records.len()
        )));
    }

    let crs = match sidecar(path, "prj") {
        Some(prj) => Some(CRS::from_wkt(&std::fs::read_to_string(prj)?)?),
        None => None,
    };

    let mut features = FeatureCollection::new();
    for (idx, (shape, record)) in shapes.into_iter().zip(table.records).enumerate() {
        let (Some(geometry), Some(properties)) = (shape, record) else {
            continue;
        };
        let mut feature = Feature::new(geometry);
        feature.properties = properties;
        feature.id = Some(idx.to_string());
        features.push(feature);
    }

    debug!(
        "Read {} polygon features from {} ({})",
        features.len(),
        path.display(),
        crs.as_ref().map(|c| c.identifier()).unwrap_or_else(|| "no .prj".into())
    );

    Ok(ShapefileLayer { features, fields: table.fields, crs })
}
