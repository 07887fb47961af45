//! Scene source backed by a STAC API and Cloud Optimized GeoTIFF assets

use std::sync::Arc;

use tidemark_algorithms::imagery::{resample_nearest, BOA_ADD_OFFSET};
use tidemark_cloud::blocking::StacClientBlocking;
use tidemark_cloud::{
    BearerAuth, CloudAuth, CloudError, CogReaderOptions, HttpClient, NoAuth, StacClientOptions, StacItem,
    StacSearchParams,
};
use tidemark_core::crs::CRS;
use tidemark_core::{BBox, GridSpec, Raster};
use tracing::{debug, info, warn};

use crate::config::ImageryConfig;
use crate::error::Result;
use crate::scene::{Scene, SceneQuery, SceneSource};

/// Source pixels read beyond the grid on each side, so nearest-neighbour
/// lookups at the edges always hit a source cell.
const EDGE_PIXELS: f64 = 2.0;

/// Baseline from which L2A reflectances carry [`BOA_ADD_OFFSET`].
const OFFSET_BASELINE: f64 = 4.0;

pub struct StacSceneSource {
    client: StacClientBlocking,
    bands: [String; 2],
    cog_options: CogReaderOptions,
}

impl StacSceneSource {
    /// Connect to the configured catalog and check its landing page.
    ///
    /// A bearer token is sent when the environment variable named by
    /// `token_env` is set. Rejected credentials fail with
    /// [`crate::AnalysisError::Authentication`].
    pub fn connect(imagery: &ImageryConfig) -> Result<Self> {
        let catalog = imagery.catalog();
        let auth: Arc<dyn CloudAuth> = match BearerAuth::from_env(&imagery.token_env) {
            Ok(bearer) => {
                debug!("Using bearer token from {}", imagery.token_env);
                Arc::new(bearer.scoped_to(&catalog.root_url()))
            }
            Err(_) => Arc::new(NoAuth),
        };
        let http = HttpClient::new(imagery.timeout(), imagery.max_retries)?.with_auth(auth);
        let options = StacClientOptions { max_items: imagery.max_items, ..StacClientOptions::default() };
        let client = StacClientBlocking::new(catalog, http, options)?;
        client.check_landing_page()?;

        Ok(Self {
            client,
            bands: [imagery.green_asset.clone(), imagery.swir_asset.clone()],
            cog_options: CogReaderOptions { max_concurrent_fetches: imagery.concurrency, ..CogReaderOptions::default() },
        })
    }

    fn scene_from_item(&self, item: &StacItem) -> Option<Scene> {
        let missing: Vec<&str> = self
            .bands
            .iter()
            .map(String::as_str)
            .filter(|key| item.asset(key).is_none())
            .collect();
        if !missing.is_empty() {
            warn!("Skipping {}: no {} asset", item.id, missing.join("/"));
            return None;
        }

        let boa_offset = match item.processing_baseline() {
            Some(b) if b >= OFFSET_BASELINE && !item.boa_offset_applied() => Some(BOA_ADD_OFFSET),
            _ => None,
        };
        Some(Scene {
            id: item.id.clone(),
            datetime: item.properties.datetime.clone(),
            cloud_cover: item.properties.eo_cloud_cover,
            epsg: item.epsg(),
            assets: self
                .bands
                .iter()
                .filter_map(|key| Some((key.clone(), item.asset(key)?.href.clone())))
                .collect(),
            boa_offset,
        })
    }
}

impl SceneSource for StacSceneSource {
    fn scenes(&self, query: &SceneQuery) -> Result<Vec<Scene>> {
        let params = StacSearchParams::new()
            .collection(&query.collection)
            .bbox(query.bbox.to_array())
            .datetime(query.datetime())
            .cloud_cover_below(query.cloud_cover_max);
        let items = self.client.search_all(&params)?;
        info!("{} returned {} {} items for {}", self.client.catalog(), items.len(), query.collection, query.year);

        Ok(items.iter().filter_map(|item| self.scene_from_item(item)).collect())
    }

    fn read_band(&self, scene: &Scene, asset: &str, grid: &GridSpec) -> Result<Raster<f64>> {
        let href = scene.assets.get(asset).ok_or_else(|| CloudError::MissingAsset {
            item: scene.id.clone(),
            asset: asset.to_string(),
        })?;
        let url = self.client.sign_href(href)?;
        let mut cog = self.client.open_cog(&url, self.cog_options.clone())?;

        let cog_crs = cog
            .crs()
            .cloned()
            .or_else(|| scene.epsg.map(CRS::from_epsg))
            .ok_or_else(|| tidemark_core::Error::UnsupportedCrs(format!("{} has no CRS", scene.id)))?;
        let meta = cog.metadata();
        let pad = EDGE_PIXELS * meta.geo_transform.cell_size();
        let b = grid.bounds().reproject(&grid.crs, &cog_crs)?;
        let window = BBox::new(b.min_x - pad, b.min_y - pad, b.max_x + pad, b.max_y + pad);
        let level = cog.level_for_resolution(grid.transform.cell_size());
        debug!("{} {}: reading level {} of {}x{}", scene.id, asset, level, meta.width, meta.height);

        let mut raster: Raster<f64> = cog.read_bbox(&window, level)?;
        if raster.crs().is_none() {
            raster.set_crs(Some(cog_crs));
        }
        // Sentinel-2 marks nodata with 0 even when the file carries no tag
        if raster.nodata().is_none() {
            raster.set_nodata(Some(0.0));
        }
        Ok(resample_nearest(&raster, grid)?)
    }

    fn describe(&self) -> String {
        self.client.catalog().to_string()
    }
}

