//! Raster data structures

mod element;
mod geotransform;
mod grid;
mod spec;

pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::Raster;
pub use spec::GridSpec;
