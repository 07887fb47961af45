//! Writes a finished run to the output directory

use std::path::{Path, PathBuf};

use tidemark_core::crs::CRS;
use tidemark_core::io::{write_geojson, write_geotiff, write_shapefile, GeoTiffOptions};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::layers::{build_layers, Manifest};
use crate::region::Region;
use crate::report::Report;
use crate::session::SessionRun;

pub const REPORT_FILE: &str = "report.json";
pub const LAYERS_DIR: &str = "layers";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const REGION_FILE: &str = "region.geojson";
pub const RASTERS_DIR: &str = "rasters";

/// Output directory writer. Reads the run, never feeds anything back.
#[derive(Debug, Clone)]
pub struct OutputSink {
    dir: PathBuf,
    export_rasters: bool,
    shapefile_export: bool,
}

impl OutputSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), export_rasters: false, shapefile_export: false }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.output.dir)
            .with_rasters(config.output.export_rasters)
            .with_shapefile(config.output.shapefile_export)
    }

    pub fn with_rasters(mut self, yes: bool) -> Self {
        self.export_rasters = yes;
        self
    }

    pub fn with_shapefile(mut self, yes: bool) -> Self {
        self.shapefile_export = yes;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write report, layers, manifest, region export and optional rasters.
    /// Returns the paths written.
    pub fn write(&self, region: &Region, run: &SessionRun, config: &Config, source: &str) -> Result<Vec<PathBuf>> {
        let layers_dir = self.dir.join(LAYERS_DIR);
        std::fs::create_dir_all(&layers_dir)?;
        let mut written = Vec::new();

        let report_path = self.dir.join(REPORT_FILE);
        Report::new(region, &run.outcomes, source).write(&report_path)?;
        written.push(report_path);

        let layers = build_layers(region, run, config)?;
        for layer in &layers {
            let path = layers_dir.join(layer.file_name());
            layer.write(&path)?;
            debug!("{} features -> {}", layer.features.len(), path.display());
            written.push(path);
        }
        let manifest_path = layers_dir.join(MANIFEST_FILE);
        Manifest::new(region, &layers, config).write(&manifest_path)?;
        written.push(manifest_path);

        written.extend(self.export_region(region, None)?);

        if self.export_rasters {
            let dir = self.dir.join(RASTERS_DIR);
            std::fs::create_dir_all(&dir)?;
            for output in &run.outputs {
                let path = dir.join(format!("classes_{}.tif", output.result.year));
                write_geotiff(&output.classes, &path, &GeoTiffOptions::uint8())?;
                written.push(path);
            }
        }

        info!("Wrote {} files to {}", written.len(), self.dir.display());
        Ok(written)
    }

    /// Clipped boundary as GeoJSON (`region.geojson` unless `path` is given)
    /// and, when enabled, as a shapefile beside it.
    pub fn export_region(&self, region: &Region, path: Option<&Path>) -> Result<Vec<PathBuf>> {
        let geojson_path = path.map(Path::to_path_buf).unwrap_or_else(|| self.dir.join(REGION_FILE));
        if let Some(parent) = geojson_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let features = region.to_features();
        write_geojson(&geojson_path, &features)?;
        let mut written = vec![geojson_path.clone()];

        if self.shapefile_export {
            let shp = geojson_path.with_extension("shp");
            write_shapefile(&shp, &features, Some(&CRS::wgs84()))?;
            written.extend(["shp", "shx", "dbf", "prj"].map(|ext| shp.with_extension(ext)));
        }
        Ok(written)
    }
}
