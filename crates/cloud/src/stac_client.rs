//! Async STAC Item Search client for Earth Search, Planetary Computer and
//! custom endpoints.

use tracing::{debug, info};

use crate::error::{CloudError, Result};
use crate::http::HttpClient;
use crate::stac_models::{StacItem, StacItemCollection, StacLink, StacSearchParams};

const PC_SIGN_URL: &str = "https://planetarycomputer.microsoft.com/api/sas/v1/sign";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StacCatalog {
    PlanetaryComputer,
    EarthSearch,
    /// Root URL of any STAC API.
    Custom(String),
}

impl StacCatalog {
    pub fn root_url(&self) -> String {
        match self {
            Self::PlanetaryComputer => "https://planetarycomputer.microsoft.com/api/stac/v1".to_string(),
            Self::EarthSearch => "https://earth-search.aws.element84.com/v1".to_string(),
            Self::Custom(base) => base.trim_end_matches('/').trim_end_matches("/search").to_string(),
        }
    }

    pub fn search_url(&self) -> String {
        format!("{}/search", self.root_url())
    }

    /// `"pc"`, `"planetary-computer"`, `"es"`, `"earth-search"`, or a URL.
    pub fn from_str_or_url(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pc" | "planetary-computer" | "planetarycomputer" => Self::PlanetaryComputer,
            "es" | "earth-search" | "earthsearch" => Self::EarthSearch,
            _ => Self::Custom(s.to_string()),
        }
    }

    /// Whether asset hrefs need SAS signing before they can be read.
    pub fn needs_signing(&self) -> bool {
        matches!(self, Self::PlanetaryComputer)
    }
}

impl std::fmt::Display for StacCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PlanetaryComputer => write!(f, "Planetary Computer"),
            Self::EarthSearch => write!(f, "Earth Search"),
            Self::Custom(url) => write!(f, "{url}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StacClientOptions {
    /// Upper bound on items collected across pages (default 200)
    pub max_items: usize,
    /// Page size requested from the server (default 100)
    pub page_size: u32,
    /// Override of the href signing endpoint
    pub sign_url: Option<String>,
}

impl Default for StacClientOptions {
    fn default() -> Self {
        Self { max_items: 200, page_size: 100, sign_url: None }
    }
}

pub struct StacClient {
    catalog: StacCatalog,
    http: HttpClient,
    options: StacClientOptions,
}

impl StacClient {
    pub fn new(catalog: StacCatalog, http: HttpClient, options: StacClientOptions) -> Self {
        Self { catalog, http, options }
    }

    pub fn catalog(&self) -> &StacCatalog {
        &self.catalog
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Request the landing page. Rejected credentials surface as
    /// [`CloudError::Auth`].
    pub async fn check_landing_page(&self) -> Result<()> {
        let landing: serde_json::Value = self.http.get_json(&self.catalog.root_url()).await?;
        info!(
            "Connected to {} ({})",
            self.catalog,
            landing.get("title").and_then(|t| t.as_str()).unwrap_or("untitled catalog")
        );
        Ok(())
    }

    /// One page of results.
    pub async fn search(&self, params: &StacSearchParams) -> Result<StacItemCollection> {
        self.http.post_json(&self.catalog.search_url(), params).await
    }

    /// Follow `next` links until exhausted or `max_items` is reached.
    pub async fn search_all(&self, params: &StacSearchParams) -> Result<Vec<StacItem>> {
        let mut params = params.clone();
        params.limit.get_or_insert(self.options.page_size);

        let mut items = Vec::new();
        let mut page = self.search(&params).await?;
        loop {
            let next = page.next_link().cloned();
            let got = page.features.len();
            items.append(&mut page.features);
            debug!("STAC page: {} items ({} total)", got, items.len());

            match next {
                Some(link) if got > 0 && items.len() < self.options.max_items => {
                    page = self.follow(&link, &params).await?;
                }
                _ => break,
            }
        }
        items.truncate(self.options.max_items);
        Ok(items)
    }

    async fn follow(&self, link: &StacLink, params: &StacSearchParams) -> Result<StacItemCollection> {
        if !link.method.as_deref().unwrap_or("GET").eq_ignore_ascii_case("POST") {
            return self.http.get_json(&link.href).await;
        }
        let body = match (&link.body, link.merge.unwrap_or(false)) {
            (Some(extra), true) => {
                let mut base = serde_json::to_value(params)?;
                if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
                    base.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                base
            }
            (Some(body), false) => body.clone(),
            (None, _) => serde_json::to_value(params)?,
        };
        self.http.post_json(&link.href, &body).await
    }

    /// Signed, readable href for an asset. Unchanged for catalogs that serve
    /// public assets.
    pub async fn sign_href(&self, href: &str) -> Result<String> {
        let endpoint = match (&self.options.sign_url, self.catalog.needs_signing()) {
            (Some(url), _) => url.as_str(),
            (None, true) => PC_SIGN_URL,
            (None, false) => return Ok(href.to_string()),
        };
        let url = reqwest::Url::parse_with_params(endpoint, &[("href", href)])
            .map_err(|e| CloudError::Auth(format!("bad signing endpoint {endpoint}: {e}")))?;

        let signed: serde_json::Value = self.http.get_json(url.as_str()).await.map_err(|e| match e {
            CloudError::Auth(_) => e,
            other => CloudError::Auth(format!("signing {href} failed: {other}")),
        })?;
        signed["href"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CloudError::Auth("signing response has no href".into()))
    }

    /// Look up `key` on `item` and return its signed href.
    pub async fn asset_href(&self, item: &StacItem, key: &str) -> Result<String> {
        let asset = item
            .asset(key)
            .ok_or_else(|| CloudError::MissingAsset { item: item.id.clone(), asset: key.to_string() })?;
        self.sign_href(&asset.href).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_urls() {
        assert_eq!(
            StacCatalog::PlanetaryComputer.search_url(),
            "https://planetarycomputer.microsoft.com/api/stac/v1/search"
        );
        assert_eq!(StacCatalog::EarthSearch.search_url(), "https://earth-search.aws.element84.com/v1/search");
        for base in ["https://example.com/stac", "https://example.com/stac/", "https://example.com/stac/search"] {
            let c = StacCatalog::Custom(base.into());
            assert_eq!(c.root_url(), "https://example.com/stac");
            assert_eq!(c.search_url(), "https://example.com/stac/search");
        }
    }

    #[test]
    fn catalog_shorthands() {
        assert_eq!(StacCatalog::from_str_or_url("PC"), StacCatalog::PlanetaryComputer);
        assert_eq!(StacCatalog::from_str_or_url("earth-search"), StacCatalog::EarthSearch);
        assert_eq!(
            StacCatalog::from_str_or_url("https://stac.example.com"),
            StacCatalog::Custom("https://stac.example.com".into())
        );
        assert!(StacCatalog::PlanetaryComputer.needs_signing());
        assert!(!StacCatalog::EarthSearch.needs_signing());
    }
}
