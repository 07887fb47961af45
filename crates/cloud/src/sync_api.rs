//! Blocking API for native callers.
//!
//! Wraps the async [`StacClient`] and [`CogReader`] with a current-thread
//! Tokio runtime so synchronous pipelines don't manage one themselves.

#[cfg(feature = "native")]
mod inner {
    use std::sync::Arc;

    use tidemark_core::crs::CRS;
    use tidemark_core::raster::{Raster, RasterElement};
    use tidemark_core::BBox;
    use tokio::runtime::Runtime;

    use crate::cog_reader::{CogMetadata, CogReader, CogReaderOptions};
    use crate::error::{CloudError, Result};
    use crate::http::HttpClient;
    use crate::stac_client::{StacCatalog, StacClient, StacClientOptions};
    use crate::stac_models::{StacItem, StacItemCollection, StacSearchParams};

    fn runtime() -> Result<Arc<Runtime>> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map(Arc::new)
            .map_err(|e| CloudError::Runtime(e.to_string()))
    }

    /// Blocking wrapper around [`StacClient`]. COG readers opened through it
    /// share its runtime.
    pub struct StacClientBlocking {
        rt: Arc<Runtime>,
        inner: StacClient,
    }

    impl StacClientBlocking {
        pub fn new(catalog: StacCatalog, http: HttpClient, options: StacClientOptions) -> Result<Self> {
            Ok(Self { rt: runtime()?, inner: StacClient::new(catalog, http, options) })
        }

        pub fn catalog(&self) -> &StacCatalog {
            self.inner.catalog()
        }

        pub fn check_landing_page(&self) -> Result<()> {
            self.rt.block_on(self.inner.check_landing_page())
        }

        pub fn search(&self, params: &StacSearchParams) -> Result<StacItemCollection> {
            self.rt.block_on(self.inner.search(params))
        }

        pub fn search_all(&self, params: &StacSearchParams) -> Result<Vec<StacItem>> {
            self.rt.block_on(self.inner.search_all(params))
        }

        pub fn sign_href(&self, href: &str) -> Result<String> {
            self.rt.block_on(self.inner.sign_href(href))
        }

        /// Signed href of `key` on `item`.
        pub fn asset_href(&self, item: &StacItem, key: &str) -> Result<String> {
            self.rt.block_on(self.inner.asset_href(item, key))
        }

        pub fn open_cog(&self, url: &str, options: CogReaderOptions) -> Result<CogReaderBlocking> {
            let inner = self.rt.block_on(CogReader::open(self.inner.http(), url, options))?;
            Ok(CogReaderBlocking { rt: Arc::clone(&self.rt), inner })
        }
    }

    /// Blocking wrapper around [`CogReader`].
    pub struct CogReaderBlocking {
        rt: Arc<Runtime>,
        inner: CogReader,
    }

    impl CogReaderBlocking {
        /// Open a remote COG on a runtime of its own.
        pub fn open(client: &HttpClient, url: &str, options: CogReaderOptions) -> Result<Self> {
            let rt = runtime()?;
            let inner = rt.block_on(CogReader::open(client, url, options))?;
            Ok(Self { rt, inner })
        }

        pub fn metadata(&self) -> CogMetadata {
            self.inner.metadata()
        }

        pub fn crs(&self) -> Option<&CRS> {
            self.inner.crs()
        }

        pub fn level_for_resolution(&self, cell_size: f64) -> usize {
            self.inner.level_for_resolution(cell_size)
        }

        pub fn read_bbox<T: RasterElement>(&mut self, bbox: &BBox, level: usize) -> Result<Raster<T>> {
            self.rt.block_on(self.inner.read_bbox(bbox, level))
        }
    }
}

#[cfg(feature = "native")]
pub use inner::*;
