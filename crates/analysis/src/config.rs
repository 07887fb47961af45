//! Pipeline configuration loaded from `tidemark.toml`.
//!
//! Every field has a default, so an empty file (or no file at all) runs the
//! Sampang coast analysis over 2015, 2020 and 2025.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tidemark_cloud::StacCatalog;
use tidemark_core::BBox;
use tracing::{debug, info};

use crate::error::{AnalysisError, Result};
use crate::palette::{LayerClass, Palette};

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "tidemark.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Analysis years, processed in this order
    pub years: Vec<i32>,
    pub region: RegionConfig,
    pub imagery: ImageryConfig,
    pub layers: LayerSet,
    pub map: MapConfig,
    pub palette: Palette,
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            years: vec![2015, 2020, 2025],
            region: RegionConfig::default(),
            imagery: ImageryConfig::default(),
            layers: LayerSet::default(),
            map: MapConfig::default(),
            palette: Palette::default(),
            output: OutputConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegionConfig {
    /// Protected-area boundary shapefile
    pub path: PathBuf,
    /// West, south, east, north in degrees
    pub bbox: [f64; 4],
    pub attributes: AttributeMap,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./Kawasan_Konservasi/Kawasan_Konservasi.shp"),
            bbox: [113.35, -7.22, 113.38, -7.19],
            attributes: AttributeMap::default(),
        }
    }
}

/// Source field names of the region attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttributeMap {
    pub name: String,
    pub code: String,
    pub kind: String,
    pub management: String,
    pub remark: String,
    /// Area in hectares
    pub area: String,
}

impl Default for AttributeMap {
    fn default() -> Self {
        Self {
            name: "NAMOBJ".into(),
            code: "KODKWS".into(),
            kind: "JNSRPR".into(),
            management: "WKLPR".into(),
            remark: "REMARK".into(),
            area: "LUASHA".into(),
        }
    }
}

impl AttributeMap {
    /// Field names in popup order
    pub fn popup_fields(&self) -> Vec<String> {
        [&self.name, &self.code, &self.kind, &self.management, &self.remark, &self.area]
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn tooltip_fields(&self) -> Vec<String> {
        vec![self.name.clone(), self.area.clone()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageryConfig {
    /// `earth-search`, `planetary-computer`, or a STAC API root URL
    pub catalog: String,
    pub collection: String,
    pub green_asset: String,
    pub swir_asset: String,
    /// Scenes must have cloud cover strictly below this percentage
    pub cloud_cover_max: f64,
    /// Analysis grid cell size in metres
    pub gsd: f64,
    /// Index values above this are water
    pub threshold: f64,
    /// Remove the 1000 DN offset of processing baseline 04.00+ scenes
    pub harmonize: bool,
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Environment variable holding an optional bearer token
    pub token_env: String,
    pub max_items: usize,
    /// Tile requests in flight per band read
    pub concurrency: usize,
}

impl Default for ImageryConfig {
    fn default() -> Self {
        Self {
            catalog: "earth-search".into(),
            collection: "sentinel-2-l2a".into(),
            green_asset: "green".into(),
            swir_asset: "swir16".into(),
            cloud_cover_max: 10.0,
            gsd: 10.0,
            threshold: 0.0,
            harmonize: true,
            timeout_secs: 60,
            max_retries: 0,
            token_env: "TIDEMARK_STAC_TOKEN".into(),
            max_items: 200,
            concurrency: 8,
        }
    }
}

impl ImageryConfig {
    pub fn catalog(&self) -> StacCatalog {
        StacCatalog::from_str_or_url(&self.catalog)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Derived layers written per year, plus the boundary overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayerSet {
    pub water: bool,
    pub land: bool,
    pub land_in_region: bool,
    pub boundary: bool,
}

impl Default for LayerSet {
    fn default() -> Self {
        Self { water: true, land: true, land_in_region: true, boundary: true }
    }
}

impl LayerSet {
    pub fn includes(&self, class: LayerClass) -> bool {
        match class {
            LayerClass::Water => self.water,
            LayerClass::Land => self.land,
            LayerClass::LandInRegion => self.land_in_region,
            LayerClass::Boundary => self.boundary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Basemap {
    pub name: String,
    pub url: String,
    pub attribution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_zoom: Option<u8>,
}

impl Basemap {
    fn new(name: &str, url: &str, attribution: &str, max_zoom: Option<u8>) -> Self {
        Self { name: name.into(), url: url.into(), attribution: attribution.into(), max_zoom }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapConfig {
    pub zoom: u8,
    pub basemaps: Vec<Basemap>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            zoom: 14,
            basemaps: vec![
                Basemap::new(
                    "OpenStreetMap",
                    "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
                    "&copy; OpenStreetMap contributors",
                    Some(19),
                ),
                Basemap::new("Google Satellite", "https://mt1.google.com/vt/lyrs=s&x={x}&y={y}&z={z}", "Google", Some(19)),
                Basemap::new(
                    "Esri World Imagery",
                    "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
                    "Esri",
                    Some(19),
                ),
                Basemap::new(
                    "OpenTopoMap",
                    "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png",
                    "&copy; OpenTopoMap (CC-BY-SA)",
                    None,
                ),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// Write `rasters/classes_<year>.tif`
    pub export_rasters: bool,
    /// Also write the clipped region as a shapefile
    pub shapefile_export: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("tidemark-output"), export_rasters: false, shapefile_export: false }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load `explicit`, or `tidemark.toml` from the working directory when it
    /// exists, or the defaults. The result is validated.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let path = match explicit {
            Some(p) if !p.is_file() => {
                return Err(AnalysisError::Config(format!("config file {} not found", p.display())));
            }
            Some(p) => Some(p.to_path_buf()),
            None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()),
        };

        let (config, source) = match path {
            Some(path) => {
                let text = std::fs::read_to_string(&path)?;
                let config = Self::from_toml_str(&text)
                    .map_err(|e| AnalysisError::Config(format!("{}: {e}", path.display())))?;
                info!("Loaded configuration from {}", path.display());
                (config, ConfigSource::File(path))
            }
            None => {
                debug!("No {DEFAULT_CONFIG_FILE} found, using defaults");
                (Self::default(), ConfigSource::Default)
            }
        };
        config.validate()?;
        Ok((config, source))
    }

    pub fn bbox(&self) -> Result<BBox> {
        let [w, s, e, n] = self.region.bbox;
        let bbox = BBox::try_new(w, s, e, n).map_err(|e| AnalysisError::Config(format!("region.bbox: {e}")))?;
        if w < -180.0 || e > 180.0 || s < -90.0 || n > 90.0 {
            return Err(AnalysisError::Config(format!("region.bbox {:?} is outside longitude/latitude range", self.region.bbox)));
        }
        Ok(bbox)
    }

    /// Check everything that would otherwise fail halfway through a run.
    pub fn validate(&self) -> Result<()> {
        if self.years.is_empty() {
            return Err(AnalysisError::Config("no analysis years configured".into()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.years.iter().find(|y| !seen.insert(**y)) {
            return Err(AnalysisError::Config(format!("year {dup} is listed twice")));
        }
        self.bbox()?;

        let img = &self.imagery;
        if !(img.gsd.is_finite() && img.gsd > 0.0) {
            return Err(AnalysisError::Config(format!("imagery.gsd must be positive, got {}", img.gsd)));
        }
        if !(-1.0..=1.0).contains(&img.threshold) {
            return Err(AnalysisError::Config(format!("imagery.threshold must be within [-1, 1], got {}", img.threshold)));
        }
        if !(img.cloud_cover_max > 0.0 && img.cloud_cover_max <= 100.0) {
            return Err(AnalysisError::Config(format!(
                "imagery.cloud_cover_max must be within (0, 100], got {}",
                img.cloud_cover_max
            )));
        }
        if img.green_asset.is_empty() || img.swir_asset.is_empty() {
            return Err(AnalysisError::Config("imagery band asset keys must not be empty".into()));
        }
        if img.concurrency == 0 || img.max_items == 0 {
            return Err(AnalysisError::Config("imagery.concurrency and imagery.max_items must be at least 1".into()));
        }
        if self.map.basemaps.is_empty() {
            return Err(AnalysisError::Config("map.basemaps must name at least one base map".into()));
        }

        self.palette.validate(&self.years)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_sampang() {
        let c = Config::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.years, vec![2015, 2020, 2025]);
        assert_eq!(c.bbox().unwrap(), BBox::new(113.35, -7.22, 113.38, -7.19));
        assert_eq!(c.imagery.catalog(), StacCatalog::EarthSearch);
        assert_eq!(c.imagery.timeout(), Duration::from_secs(60));
        assert_eq!(c.imagery.max_retries, 0);
        assert_eq!(c.map.zoom, 14);
        assert_eq!(c.map.basemaps.len(), 4);
        assert_eq!(c.region.attributes.tooltip_fields(), vec!["NAMOBJ", "LUASHA"]);
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn partial_file_overrides() {
        let c = Config::from_toml_str(
            r##"
            years = [2020, 2025]

            [imagery]
            catalog = "planetary-computer"
            green_asset = "B03"
            swir_asset = "B11"
            cloud_cover_max = 20

            [palette.water]
            "2020" = "#000000"
            "2025" = "#FFFFFF"
            "##,
        )
        .unwrap();
        assert_eq!(c.years, vec![2020, 2025]);
        assert_eq!(c.imagery.catalog(), StacCatalog::PlanetaryComputer);
        assert_eq!(c.imagery.gsd, 10.0);
        assert_eq!(c.palette.water.len(), 2);
        // land colours keep their defaults
        assert!(c.validate().is_ok());
    }

    #[test]
    fn toml_round_trip() {
        let c = Config::default();
        let text = c.to_toml_string().unwrap();
        assert_eq!(Config::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn rejects_bad_values() {
        let mut c = Config::default();
        c.years = vec![2015, 2020, 2015];
        assert!(c.validate().unwrap_err().to_string().contains("2015"));

        let mut c = Config::default();
        c.years.clear();
        assert!(c.validate().is_err());

        let mut c = Config::default();
        c.region.bbox = [113.38, -7.22, 113.35, -7.19];
        assert!(c.validate().is_err());

        let mut c = Config::default();
        c.imagery.gsd = 0.0;
        assert!(c.validate().is_err());

        let mut c = Config::default();
        c.imagery.threshold = 1.5;
        assert!(c.validate().is_err());

        let mut c = Config::default();
        c.years.push(2030);
        let err = c.validate().unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));
        assert!(err.to_string().contains("2030"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml_str("[imagery]\ncloud = 5\n").is_err());
    }

    #[test]
    fn missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/tidemark.toml"))).unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tidemark.toml");
        std::fs::write(&path, "[map]\nzoom = 12\n").unwrap();
        let (c, source) = Config::load(Some(&path)).unwrap();
        assert_eq!(c.map.zoom, 12);
        assert_eq!(source, ConfigSource::File(path));
    }
}
