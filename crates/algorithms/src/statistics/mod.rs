//! Statistics over classified rasters
//!
//! - **class_area**: cell counts and areas per water class inside zones

pub mod class_area;

pub use class_area::{class_areas, ClassAreas, ClassCounts};
