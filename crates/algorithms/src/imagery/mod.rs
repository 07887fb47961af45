//! Imagery kernels for water mapping
//!
//! - Water index: MNDWI over a generic normalized difference
//! - Median compositing of scene stacks
//! - Nearest-neighbour resampling onto an analysis grid
//! - L2A offset harmonization
//! - Water / land thresholding

mod classify;
mod composite;
mod harmonize;
mod indices;
mod resample;

pub use classify::{classify_water, WaterClass};
pub use composite::median_composite;
pub use harmonize::{remove_offset, BOA_ADD_OFFSET};
pub use indices::{mndwi, normalized_difference};
pub use resample::resample_nearest;
