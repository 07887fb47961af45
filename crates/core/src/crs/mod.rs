//! Coordinate Reference System handling

mod epsg;
mod transform;
mod utm;
mod wkt;

pub use epsg::proj_string;
pub use transform::Transformer;
pub use utm::{parse_utm_epsg, utm_epsg_for};

use proj4rs::proj::Proj;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// EPSG code if known
    epsg: Option<u32>,
    /// WKT the CRS was parsed from, if any
    wkt: Option<String>,
    /// proj definition used for transformation
    proj: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self { epsg: Some(code), wkt: None, proj: proj_string(code) }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(epsg::WGS84)
    }

    /// WGS84 / UTM zone CRS (EPSG:326nn north, 327nn south)
    pub fn utm(zone: u32, north: bool) -> Self {
        Self::from_epsg(if north { 32600 } else { 32700 } + zone)
    }

    /// UTM zone CRS containing a longitude/latitude point
    pub fn utm_for_lonlat(lon: f64, lat: f64) -> Self {
        Self::from_epsg(utm_epsg_for(lon, lat))
    }

    /// Resolve an ESRI `.prj` / OGC WKT string.
    ///
    /// An `AUTHORITY["EPSG", ...]` clause naming a known code wins, then
    /// WGS84 geographic and WGS84 UTM zone names. Anything else is turned
    /// into a proj definition from its datum and projection parameters.
    pub fn from_wkt(text: &str) -> Result<Self> {
        let resolved = wkt::resolve(text)?;
        let proj = match resolved.epsg {
            Some(code) => proj_string(code),
            None => resolved.proj,
        };
        Ok(Self { epsg: resolved.epsg, wkt: Some(text.trim().to_string()), proj })
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// proj definition, when one is known
    pub fn proj(&self) -> Option<&str> {
        self.proj.as_deref()
    }

    /// Coordinates are longitude/latitude degrees
    pub fn is_geographic(&self) -> bool {
        self.proj
            .as_deref()
            .map(|p| p.contains("+proj=longlat") || p.contains("+proj=latlong"))
            .unwrap_or(false)
    }

    /// `(zone, north)` when this is a WGS84 UTM CRS
    pub fn utm_zone(&self) -> Option<(u32, bool)> {
        self.epsg.and_then(parse_utm_epsg)
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        match (self.epsg, other.epsg) {
            (Some(a), Some(b)) => a == b,
            _ => match (&self.proj, &other.proj) {
                (Some(a), Some(b)) => a == b,
                _ => matches!((&self.wkt, &other.wkt), (Some(a), Some(b)) if a == b),
            },
        }
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        match (self.epsg, &self.wkt) {
            (Some(code), _) => format!("EPSG:{}", code),
            (None, Some(wkt)) => format!("WKT:{}", wkt.chars().take(50).collect::<String>()),
            (None, None) => "Unknown".to_string(),
        }
    }

    pub(crate) fn to_proj(&self) -> Result<Proj> {
        let definition = self.proj.as_deref().ok_or_else(|| Error::UnsupportedCrs(self.identifier()))?;
        Proj::from_proj_string(definition).map_err(|e| Error::UnsupportedCrs(format!("{}: {:?}", self, e)))
    }

    /// Error unless this CRS can be handled by [`Transformer`].
    pub fn ensure_supported(&self) -> Result<()> {
        self.to_proj().map(|_| ())
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}
