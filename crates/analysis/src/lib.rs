//! # Tidemark Analysis
//!
//! Coastal water/land change inside a bounding box, related to a
//! protected-area boundary dataset.
//!
//! A run goes through three stages:
//!
//! - [`RegionLoader`]: boundary shapefile to clipped EPSG:4326 polygons
//! - [`ChangeClassifier`]: per-year median composite, water index, class
//!   areas and class polygons; [`NdwiClassifier`] reads scenes from any
//!   [`SceneSource`], such as [`StacSceneSource`]
//! - [`OutputSink`]: report, styled GeoJSON layers, map manifest and exports
//!
//! [`Session`] memoizes regions and results and turns failed years into
//! zero placeholders.

pub mod classifier;
pub mod config;
pub mod error;
pub mod layers;
pub mod model;
pub mod palette;
pub mod region;
pub mod report;
pub mod scene;
pub mod session;
pub mod sink;
pub mod stac_source;

pub use classifier::{ChangeClassifier, ClassifierSettings, NdwiClassifier};
pub use config::{Config, ConfigSource};
pub use error::{AnalysisError, ClassifyError, Result};
pub use layers::{MapLayer, Manifest};
pub use model::{ClassificationOutput, ClassificationResult, Hectares, YearOutcome, YearPolygons};
pub use palette::{Color, LayerClass, LayerStyle, Palette};
pub use region::{Region, RegionLoader, RegionRecord};
pub use report::{render_table, ChangeSummary, Report};
pub use scene::{Scene, SceneQuery, SceneSource};
pub use session::{Session, SessionRun};
pub use sink::OutputSink;
pub use stac_source::StacSceneSource;
