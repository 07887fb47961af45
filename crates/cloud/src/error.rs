//! Error types for STAC search and COG reading.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The archive rejected the credentials (401/403) or signing failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("invalid TIFF: {reason}")]
    InvalidTiff { reason: String },

    #[error("unsupported compression: {0}")]
    UnsupportedCompression(u16),

    #[error("unsupported predictor: {0}")]
    UnsupportedPredictor(u16),

    #[error("unsupported data type: bits_per_sample={bps}, sample_format={sf}")]
    UnsupportedDataType { bps: u16, sf: u16 },

    #[error("unsupported planar configuration: {0} (only chunky=1 supported)")]
    UnsupportedPlanarConfig(u16),

    #[error("bbox does not intersect raster extent")]
    BBoxOutside,

    #[error("decompression failed: {0}")]
    Decompress(String),

    #[error("STAC error: {0}")]
    Stac(String),

    #[error("asset '{asset}' not found in item '{item}'")]
    MissingAsset { item: String, asset: String },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error(transparent)]
    Core(#[from] tidemark_core::Error),
}

impl CloudError {
    pub fn is_auth(&self) -> bool {
        matches!(self, CloudError::Auth(_))
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
