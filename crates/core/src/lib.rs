//! # Tidemark Core
//!
//! Core types and I/O shared by the tidemark crates.
//!
//! This crate provides:
//! - `Raster<T>` and `GridSpec`: georeferenced grids
//! - `GeoTransform`: north-up pixel/map mapping
//! - `CRS`: WGS84 geographic and UTM reference systems with a built-in transformer
//! - `BBox`: axis-aligned extents
//! - Vector features with typed attributes
//! - GeoTIFF, GeoJSON and Shapefile I/O

pub mod crs;
pub mod error;
pub mod extent;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use extent::BBox;
pub use raster::{GeoTransform, GridSpec, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::{Transformer, CRS};
    pub use crate::error::{Error, Result};
    pub use crate::extent::BBox;
    pub use crate::raster::{GeoTransform, GridSpec, Raster, RasterElement};
    pub use crate::vector::{AttributeValue, Feature, FeatureCollection};
}
