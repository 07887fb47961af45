//! GeoJSON export of feature collections.

use std::path::Path;

use geojson::{feature::Id, JsonObject};

use crate::error::Result;
use crate::vector::{Feature, FeatureCollection};

fn to_geojson_feature(feature: &Feature) -> Result<geojson::Feature> {
    let mut properties = JsonObject::new();
    for (key, value) in &feature.properties {
        properties.insert(key.clone(), serde_json::to_value(value)?);
    }
    Ok(geojson::Feature {
        bbox: None,
        geometry: feature.geometry.as_ref().map(|g| geojson::Geometry::new(geojson::Value::from(g))),
        id: feature.id.clone().map(Id::String),
        properties: Some(properties),
        foreign_members: None,
    })
}

/// Convert to a `geojson` collection. Coordinates are written as-is, so the
/// caller is responsible for passing longitude/latitude data.
pub fn to_geojson(collection: &FeatureCollection) -> Result<geojson::FeatureCollection> {
    Ok(geojson::FeatureCollection {
        bbox: None,
        features: collection.iter().map(to_geojson_feature).collect::<Result<_>>()?,
        foreign_members: None,
    })
}

pub fn write_geojson(path: impl AsRef<Path>, collection: &FeatureCollection) -> Result<()> {
    let fc = to_geojson(collection)?;
    std::fs::write(path.as_ref(), fc.to_string())?;
    Ok(())
}
