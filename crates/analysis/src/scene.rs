//! Imagery archive seam: scene search and band reads onto an analysis grid

use std::collections::BTreeMap;

use tidemark_core::{BBox, GridSpec, Raster};

use crate::error::Result;

/// Scenes of one collection over a bounding box within a calendar year.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneQuery {
    pub collection: String,
    /// Degrees
    pub bbox: BBox,
    pub year: i32,
    /// Scenes must have cloud cover strictly below this percentage
    pub cloud_cover_max: f64,
}

impl SceneQuery {
    /// RFC 3339 interval spanning the whole year.
    pub fn datetime(&self) -> String {
        format!("{y}-01-01T00:00:00Z/{y}-12-31T23:59:59Z", y = self.year)
    }

    pub fn accepts(&self, scene: &Scene) -> bool {
        scene.cloud_cover.is_some_and(|c| c < self.cloud_cover_max)
    }
}

/// One acquisition with the hrefs of its band assets.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub id: String,
    pub datetime: Option<String>,
    pub cloud_cover: Option<f64>,
    pub epsg: Option<u32>,
    /// Asset key to href
    pub assets: BTreeMap<String, String>,
    /// Digital-number offset still present in the reflectances, if any
    pub boa_offset: Option<f64>,
}

impl Scene {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            datetime: None,
            cloud_cover: None,
            epsg: None,
            assets: BTreeMap::new(),
            boa_offset: None,
        }
    }

    pub fn with_cloud_cover(mut self, percent: f64) -> Self {
        self.cloud_cover = Some(percent);
        self
    }

    pub fn with_asset(mut self, key: impl Into<String>, href: impl Into<String>) -> Self {
        self.assets.insert(key.into(), href.into());
        self
    }

    pub fn has_assets(&self, keys: &[&str]) -> bool {
        keys.iter().all(|k| self.assets.contains_key(*k))
    }
}

/// Source of scenes and band pixels.
///
/// `read_band` returns the band resampled onto `grid`, nodata as NaN.
pub trait SceneSource: Send + Sync {
    fn scenes(&self, query: &SceneQuery) -> Result<Vec<Scene>>;

    fn read_band(&self, scene: &Scene, asset: &str, grid: &GridSpec) -> Result<Raster<f64>>;

    /// Short description for logs and reports.
    fn describe(&self) -> String {
        "scene source".into()
    }
}
