//! STAC Item Search request and response types.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Comparison operators of the STAC `query` extension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOp {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eq: Option<serde_json::Value>,
}

/// Body for `POST /search`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StacSearchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<BTreeMap<String, QueryOp>>,

    /// Pagination token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl StacSearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// `[west, south, east, north]` in degrees.
    pub fn bbox(mut self, bbox: [f64; 4]) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// RFC 3339 instant or `start/end` interval.
    pub fn datetime(mut self, dt: impl Into<String>) -> Self {
        self.datetime = Some(dt.into());
        self
    }

    pub fn collection(mut self, id: impl Into<String>) -> Self {
        self.collections.get_or_insert_with(Vec::new).push(id.into());
        self
    }

    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }

    /// Only items whose `eo:cloud_cover` is strictly below `percent`.
    pub fn cloud_cover_below(mut self, percent: f64) -> Self {
        self.query
            .get_or_insert_with(BTreeMap::new)
            .insert("eo:cloud_cover".into(), QueryOp { lt: Some(percent), ..Default::default() });
        self
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItemCollection {
    #[serde(rename = "type")]
    pub type_: String,

    pub features: Vec<StacItem>,

    #[serde(default)]
    pub links: Vec<StacLink>,

    #[serde(rename = "numberMatched", skip_serializing_if = "Option::is_none")]
    pub number_matched: Option<u64>,

    #[serde(rename = "numberReturned", skip_serializing_if = "Option::is_none")]
    pub number_returned: Option<u64>,
}

impl StacItemCollection {
    pub fn next_link(&self) -> Option<&StacLink> {
        self.links.iter().find(|l| l.rel == "next")
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItem {
    #[serde(rename = "type", default)]
    pub type_: String,

    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    pub properties: StacItemProperties,

    #[serde(default)]
    pub assets: HashMap<String, StacAsset>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

impl StacItem {
    pub fn asset(&self, key: &str) -> Option<&StacAsset> {
        self.assets.get(key)
    }

    /// EPSG code from `proj:epsg`, or from `proj:code` (`"EPSG:32749"`).
    pub fn epsg(&self) -> Option<u32> {
        let extra = &self.properties.extra;
        extra
            .get("proj:epsg")
            .and_then(|v| v.as_u64())
            .map(|v| v as u32)
            .or_else(|| extra.get("proj:code")?.as_str()?.strip_prefix("EPSG:")?.parse().ok())
    }

    /// Sentinel-2 processing baseline as a number (`"04.00"` -> 4.0).
    pub fn processing_baseline(&self) -> Option<f64> {
        match self.properties.extra.get("s2:processing_baseline")? {
            serde_json::Value::String(s) => s.trim().parse().ok(),
            serde_json::Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Whether the archive already removed the L2A BOA offset.
    pub fn boa_offset_applied(&self) -> bool {
        self.properties
            .extra
            .get("earthsearch:boa_offset_applied")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItemProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    #[serde(rename = "eo:cloud_cover", skip_serializing_if = "Option::is_none")]
    pub eo_cloud_cover: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacAsset {
    pub href: String,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacLink {
    pub rel: String,

    pub href: String,

    /// `"POST"` for body-based pagination; GET when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,

    /// Merge `body` over the previous request body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<bool>,
}
