//! Reading and writing rasters and vector layers

pub mod geojson;
mod geotiff;
pub mod shapefile;

pub use self::geojson::{to_geojson, write_geojson};
pub use self::geotiff::{
    read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer, GeoTiffOptions, PixelType,
};
pub use self::shapefile::{read_shapefile, write_shapefile, ShapefileLayer};
