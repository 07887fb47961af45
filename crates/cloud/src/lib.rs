//! # Tidemark Cloud
//!
//! STAC item search and Cloud Optimized GeoTIFF reading over HTTP range
//! requests.
//!
//! Only the tiles intersecting a bounding box are fetched; decoded tiles are
//! kept in an LRU cache and requests run concurrently.
//!
//! ## Features
//!
//! - `deflate` (default): DEFLATE decompression via `flate2`
//! - `lzw` (default): LZW decompression via `weezl`
//! - `native` (default): blocking API on a current-thread Tokio runtime

pub mod auth;
pub mod cache;
pub mod cog_reader;
pub mod decompress;
pub mod error;
pub mod geotiff_keys;
pub mod http;
pub mod ifd;
pub mod stac_client;
pub mod stac_models;
pub mod tile_index;

mod sync_api;

pub use auth::{BearerAuth, CloudAuth, NoAuth};
pub use cog_reader::{CogMetadata, CogReader, CogReaderOptions};
pub use error::{CloudError, Result};
pub use http::HttpClient;
pub use stac_client::{StacCatalog, StacClient, StacClientOptions};
pub use stac_models::{StacAsset, StacItem, StacItemCollection, StacSearchParams};

/// Blocking API (native only).
#[cfg(feature = "native")]
pub mod blocking {
    pub use crate::sync_api::*;
}
