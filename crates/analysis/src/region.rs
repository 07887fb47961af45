//! Protected-area boundaries clipped to the analysis bounding box

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use geo::{Centroid, Geometry, GeodesicArea, MultiPolygon, Polygon};
use tidemark_algorithms::vector::{clip_to_bbox, reproject_geometry};
use tidemark_core::crs::{Transformer, CRS};
use tidemark_core::io::read_shapefile;
use tidemark_core::vector::{AttributeValue, Feature, FeatureCollection};
use tidemark_core::BBox;
use tracing::{debug, info};

use crate::config::AttributeMap;
use crate::error::{AnalysisError, Result};

/// One protected area, clipped and in EPSG:4326.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRecord {
    pub name: Option<String>,
    pub code: Option<String>,
    pub kind: Option<String>,
    pub management: Option<String>,
    pub remark: Option<String>,
    /// Area in hectares as recorded in the source table
    pub area_ha: Option<f64>,
    /// Every source attribute, unmodified
    pub attributes: BTreeMap<String, AttributeValue>,
    pub geometry: MultiPolygon<f64>,
}

fn text(props: &BTreeMap<String, AttributeValue>, field: &str) -> Option<String> {
    props.get(field).filter(|v| !v.is_missing()).map(|v| v.to_string().trim().to_string())
}

impl RegionRecord {
    fn from_feature(feature: &Feature, geometry: MultiPolygon<f64>, fields: &AttributeMap) -> Self {
        let props = &feature.properties;
        Self {
            name: text(props, &fields.name),
            code: text(props, &fields.code),
            kind: text(props, &fields.kind),
            management: text(props, &fields.management),
            remark: text(props, &fields.remark),
            area_ha: props.get(&fields.area).and_then(AttributeValue::as_f64),
            attributes: props.clone(),
            geometry,
        }
    }

    /// Attribute rendered for display; missing values become `-`.
    pub fn display(&self, field: &str) -> String {
        self.attributes.get(field).map(ToString::to_string).unwrap_or_else(|| "-".into())
    }
}

/// The protected region of a session. Loaded once and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    source: PathBuf,
    bbox: BBox,
    records: Vec<RegionRecord>,
}

impl Region {
    pub fn new(source: impl Into<PathBuf>, bbox: BBox, records: Vec<RegionRecord>) -> Self {
        Self { source: source.into(), bbox, records }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn bbox(&self) -> &BBox {
        &self.bbox
    }

    pub fn records(&self) -> &[RegionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All polygons of all records.
    pub fn multipolygon(&self) -> MultiPolygon<f64> {
        MultiPolygon::new(self.polygons().cloned().collect())
    }

    fn polygons(&self) -> impl Iterator<Item = &Polygon<f64>> {
        self.records.iter().flat_map(|r| r.geometry.0.iter())
    }

    /// Mean of the polygon centroids as (lon, lat); the bounding-box centre
    /// when there are no polygons.
    pub fn centroid(&self) -> (f64, f64) {
        let (mut sx, mut sy, mut n) = (0.0, 0.0, 0usize);
        for c in self.polygons().filter_map(|p| p.centroid()) {
            sx += c.x();
            sy += c.y();
            n += 1;
        }
        if n == 0 {
            self.bbox.center()
        } else {
            (sx / n as f64, sy / n as f64)
        }
    }

    /// Clipped area on the WGS84 ellipsoid.
    pub fn geodesic_area_ha(&self) -> f64 {
        self.polygons().map(|p| p.geodesic_area_unsigned()).sum::<f64>() / 10_000.0
    }

    /// Clipped features with their attributes, missing values replaced by `-`.
    pub fn to_features(&self) -> FeatureCollection {
        self.records
            .iter()
            .map(|r| {
                let mut f = Feature::new(r.geometry.clone());
                for (key, value) in &r.attributes {
                    if value.is_missing() {
                        f.set_property(key.clone(), "-");
                    } else {
                        f.set_property(key.clone(), value.clone());
                    }
                }
                f
            })
            .collect()
    }

    /// Table rows for `fields`, display-normalized.
    pub fn rows(&self, fields: &[String]) -> Vec<Vec<String>> {
        self.records.iter().map(|r| fields.iter().map(|f| r.display(f)).collect()).collect()
    }
}

/// Reads a boundary shapefile, projects it to EPSG:4326 and clips it.
#[derive(Debug, Clone, Default)]
pub struct RegionLoader {
    fields: AttributeMap,
}

impl RegionLoader {
    pub fn new(fields: AttributeMap) -> Self {
        Self { fields }
    }

    /// Load the polygons of `path` that intersect `bbox` (degrees).
    ///
    /// Missing or unreadable files, an unknown CRS and an empty clip all fail
    /// with [`AnalysisError::DataUnavailable`].
    pub fn load(&self, path: &Path, bbox: &BBox) -> Result<Region> {
        let unavailable = |reason: String| AnalysisError::DataUnavailable { path: path.to_path_buf(), reason };

        if !path.is_file() {
            return Err(unavailable("file not found".into()));
        }
        let layer = read_shapefile(path).map_err(|e| unavailable(e.to_string()))?;
        let crs = layer
            .crs
            .ok_or_else(|| unavailable("no .prj sidecar, coordinate reference system unknown".into()))?;
        crs.ensure_supported().map_err(|e| unavailable(e.to_string()))?;
        let to_wgs84 = Transformer::new(&crs, &CRS::wgs84()).map_err(|e| unavailable(e.to_string()))?;
        debug!("Boundary layer {} in {}", path.display(), crs.identifier());

        let records: Vec<RegionRecord> = layer
            .features
            .iter()
            .filter_map(|f| {
                let geom: Geometry<f64> = reproject_geometry(f.geometry.as_ref()?, &to_wgs84);
                let clipped = clip_to_bbox(&geom, bbox)?;
                Some(RegionRecord::from_feature(f, clipped, &self.fields))
            })
            .collect();

        if records.is_empty() {
            return Err(unavailable(format!(
                "none of {} boundary polygons intersect {:?}",
                layer.features.len(),
                bbox.to_array()
            )));
        }
        info!(
            "Loaded {} of {} protected areas inside the bounding box",
            records.len(),
            layer.features.len()
        );
        Ok(Region::new(path, *bbox, records))
    }
}
