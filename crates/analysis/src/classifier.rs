//! Per-year water/land classification of the bounding box

use geo::{Coord, MapCoords, MultiPolygon};
use tidemark_algorithms::imagery::{classify_water, median_composite, mndwi, remove_offset, WaterClass};
use tidemark_algorithms::statistics::class_areas;
use tidemark_algorithms::vector::{polygonize, rasterize_polygons, Connectivity};
use tidemark_core::crs::{Transformer, CRS};
use tidemark_core::{GridSpec, Raster};
use tracing::{debug, info, warn};

use crate::config::ImageryConfig;
use crate::error::ClassifyError;
use crate::model::{ClassificationOutput, ClassificationResult, Hectares, YearPolygons};
use crate::region::Region;
use crate::scene::{SceneQuery, SceneSource};

/// Computes the water/land partition of a region's bounding box for a year.
pub trait ChangeClassifier: Send + Sync {
    fn classify(&self, region: &Region, year: i32) -> Result<ClassificationOutput, ClassifyError>;

    /// Everything besides region and year that changes the output; part of
    /// the session's memoization key.
    fn settings_key(&self) -> String;
}

/// Inputs of the normalized-difference water classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierSettings {
    pub collection: String,
    pub green_asset: String,
    pub swir_asset: String,
    pub cloud_cover_max: f64,
    /// Grid cell size in metres
    pub gsd: f64,
    pub threshold: f64,
    pub harmonize: bool,
}

impl From<&ImageryConfig> for ClassifierSettings {
    fn from(c: &ImageryConfig) -> Self {
        Self {
            collection: c.collection.clone(),
            green_asset: c.green_asset.clone(),
            swir_asset: c.swir_asset.clone(),
            cloud_cover_max: c.cloud_cover_max,
            gsd: c.gsd,
            threshold: c.threshold,
            harmonize: c.harmonize,
        }
    }
}

/// Median-composite water index classifier over a [`SceneSource`].
///
/// Index = (green - swir) / (green + swir); values above the threshold are
/// water, the rest is land.
pub struct NdwiClassifier<S> {
    source: S,
    settings: ClassifierSettings,
}

impl<S: SceneSource> NdwiClassifier<S> {
    pub fn new(source: S, settings: ClassifierSettings) -> Self {
        Self { source, settings }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    /// Analysis grid: `gsd` cells in the UTM zone of the bounding-box centre.
    pub fn grid(&self, region: &Region) -> Result<GridSpec, ClassifyError> {
        let bbox = region.bbox();
        let (lon, lat) = bbox.center();
        let utm = CRS::utm_for_lonlat(lon, lat);
        let extent = bbox.reproject(&CRS::wgs84(), &utm)?;
        Ok(GridSpec::covering(&extent, self.settings.gsd, utm)?)
    }

    pub fn query(&self, region: &Region, year: i32) -> SceneQuery {
        SceneQuery {
            collection: self.settings.collection.clone(),
            bbox: *region.bbox(),
            year,
            cloud_cover_max: self.settings.cloud_cover_max,
        }
    }

    /// Median green and SWIR composites over the readable scenes, with the
    /// number of scenes used.
    fn composites(&self, query: &SceneQuery, grid: &GridSpec) -> Result<(Raster<f64>, Raster<f64>, usize), ClassifyError> {
        let year = query.year;
        let scenes: Vec<_> = self.source.scenes(query)?.into_iter().filter(|s| query.accepts(s)).collect();
        if scenes.is_empty() {
            return Err(ClassifyError::NoScenes { year, max_cloud: query.cloud_cover_max });
        }
        info!("{}: {} scenes below {}% cloud", year, scenes.len(), query.cloud_cover_max);

        let (green_key, swir_key) = (&self.settings.green_asset, &self.settings.swir_asset);
        let mut greens = Vec::with_capacity(scenes.len());
        let mut swirs = Vec::with_capacity(scenes.len());
        for scene in &scenes {
            let bands = self
                .source
                .read_band(scene, green_key, grid)
                .and_then(|g| Ok((g, self.source.read_band(scene, swir_key, grid)?)));
            let (mut green, mut swir) = match bands {
                Ok(bands) => bands,
                Err(e) if e.is_auth() => return Err(e.into()),
                Err(e) => {
                    warn!("{}: skipping scene {}: {}", year, scene.id, e);
                    continue;
                }
            };
            if let (true, Some(offset)) = (self.settings.harmonize, scene.boa_offset) {
                debug!("{}: removing {} DN offset", scene.id, offset);
                remove_offset(&mut green, offset);
                remove_offset(&mut swir, offset);
            }
            greens.push(green);
            swirs.push(swir);
        }
        if greens.is_empty() {
            return Err(ClassifyError::NoReadableScenes { year, attempted: scenes.len() });
        }

        Ok((median_composite(&greens)?, median_composite(&swirs)?, greens.len()))
    }
}

/// Cells whose centre lies inside the region's bounding box.
fn study_mask(region: &Region, grid: &GridSpec) -> Result<Raster<u8>, ClassifyError> {
    let to_wgs84 = Transformer::new(&grid.crs, &CRS::wgs84())?;
    let bbox = region.bbox();
    let mut mask = grid.raster(0u8);
    for row in 0..grid.rows {
        for col in 0..grid.cols {
            let (x, y) = grid.cell_center(row, col);
            let (lon, lat) = to_wgs84.transform(x, y);
            if bbox.contains_point(lon, lat) {
                mask.set(row, col, 1)?;
            }
        }
    }
    Ok(mask)
}

fn transform_polygons(polygons: &MultiPolygon<f64>, transformer: &Transformer) -> MultiPolygon<f64> {
    polygons.map_coords(|c| {
        let (x, y) = transformer.transform(c.x, c.y);
        Coord { x, y }
    })
}

/// 1 where `keep` holds for the cell's class, study and zone values.
fn select(
    classes: &Raster<u8>,
    study: &Raster<u8>,
    zone: &Raster<u8>,
    keep: impl Fn(WaterClass, bool) -> bool,
) -> Result<Raster<u8>, ClassifyError> {
    let values: Vec<u8> = classes
        .data()
        .iter()
        .zip(study.data().iter())
        .zip(zone.data().iter())
        .map(|((&c, &s), &z)| u8::from(s != 0 && keep(WaterClass::from_code(c), z != 0)))
        .collect();
    Ok(classes.with_values(values)?)
}

impl<S: SceneSource> ChangeClassifier for NdwiClassifier<S> {
    fn classify(&self, region: &Region, year: i32) -> Result<ClassificationOutput, ClassifyError> {
        let grid = self.grid(region)?;
        debug!("{}: {}x{} grid of {} m cells in {}", year, grid.cols, grid.rows, self.settings.gsd, grid.crs);

        let (green, swir, scenes) = self.composites(&self.query(region, year), &grid)?;
        let index = mndwi(&green, &swir)?;
        let classes = classify_water(&index, self.settings.threshold)?;

        let to_grid = Transformer::new(&CRS::wgs84(), &grid.crs)?;
        let study = study_mask(region, &grid)?;
        let zone = rasterize_polygons(&transform_polygons(&region.multipolygon(), &to_grid), &grid)?;
        let areas = class_areas(&classes, &study, &zone)?;

        let result = ClassificationResult {
            year,
            water: Hectares::from_m2(areas.water_m2()),
            land: Hectares::from_m2(areas.land_m2()),
            land_in_region: Hectares::from_m2(areas.land_in_zone_m2()),
            unclassified: Hectares::from_m2(areas.unclassified_m2()),
            scenes,
        };
        info!(
            "{}: water {} ha, land {} ha, land in protected region {} ha",
            year, result.water, result.land, result.land_in_region
        );

        let to_wgs84 = Transformer::new(&grid.crs, &CRS::wgs84())?;
        let vectorize = |keep: &dyn Fn(WaterClass, bool) -> bool| -> Result<MultiPolygon<f64>, ClassifyError> {
            let mask = select(&classes, &study, &zone, keep)?;
            Ok(transform_polygons(&polygonize(&mask, 1, Connectivity::Eight)?, &to_wgs84))
        };
        let polygons = YearPolygons {
            water: vectorize(&|c: WaterClass, _: bool| c == WaterClass::Water)?,
            land: vectorize(&|c: WaterClass, _: bool| c == WaterClass::Land)?,
            land_in_region: vectorize(&|c: WaterClass, inside: bool| c == WaterClass::Land && inside)?,
        };

        let outside: Vec<u8> = classes
            .data()
            .iter()
            .zip(study.data().iter())
            .map(|(&c, &s)| if s != 0 { c } else { WaterClass::Unclassified.code() })
            .collect();
        let mut classes = classes.with_values(outside)?;
        classes.set_nodata(Some(WaterClass::Unclassified.code()));

        Ok(ClassificationOutput { result, polygons, classes })
    }

    fn settings_key(&self) -> String {
        let s = &self.settings;
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            self.source.describe(),
            s.collection,
            s.green_asset,
            s.swir_asset,
            s.cloud_cover_max,
            s.gsd,
            s.threshold,
            s.harmonize
        )
    }
}
