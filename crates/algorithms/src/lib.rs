//! # Tidemark Algorithms
//!
//! Raster and vector kernels for coastal water mapping.
//!
//! ## Modules
//!
//! - **imagery**: water indices, median composites, resampling, thresholding
//! - **statistics**: class areas inside study-area and zone masks
//! - **vector**: clipping, reprojection, rasterization, polygonization

pub mod imagery;
pub mod statistics;
pub mod vector;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::imagery::{
        classify_water, median_composite, mndwi, normalized_difference, remove_offset, resample_nearest,
        WaterClass,
    };
    pub use crate::statistics::{class_areas, ClassAreas, ClassCounts};
    pub use crate::vector::{
        clip_to_bbox, polygonize, Connectivity, rasterize_polygons, reproject_features, reproject_geometry,
    };
    pub use tidemark_core::prelude::*;
}
