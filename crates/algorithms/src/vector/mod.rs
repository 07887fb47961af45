//! Vector operations for region and class-mask geometry
//!
//! - Clip: intersect polygons with a rectangle, keeping holes
//! - Reproject: transform geometries between supported CRSs
//! - Rasterize: burn polygons into a cell mask by cell centre
//! - Polygonize: trace 4- or 8-connected class regions into polygons

mod clip;
mod polygonize;
mod rasterize;
mod reproject;

pub use clip::clip_to_bbox;
pub use polygonize::{polygonize, Connectivity};
pub use rasterize::rasterize_polygons;
pub use reproject::{reproject_features, reproject_geometry};
