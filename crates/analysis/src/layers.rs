//! Styled map layers and the manifest a map front-end loads them from

use std::path::Path;

use geo::{GeodesicArea, MultiPolygon};
use geojson::JsonObject;
use serde::Serialize;
use tidemark_core::io::to_geojson;
use tidemark_core::vector::{Feature, FeatureCollection};

use crate::config::{Basemap, Config};
use crate::error::Result;
use crate::palette::{LayerClass, LayerStyle, Palette};
use crate::region::Region;
use crate::session::SessionRun;

/// One overlay: polygons of a class (and year), in EPSG:4326.
#[derive(Debug, Clone)]
pub struct MapLayer {
    pub name: String,
    pub class: LayerClass,
    pub year: Option<i32>,
    pub style: LayerStyle,
    pub features: FeatureCollection,
}

fn styled(mut feature: Feature, style: &LayerStyle) -> Feature {
    feature.set_property("color", style.stroke.as_str());
    feature.set_property("fillColor", style.fill.as_str());
    feature.set_property("weight", style.weight);
    feature.set_property("fillOpacity", style.fill_opacity);
    feature
}

impl MapLayer {
    /// Layer of one class and year; each polygon becomes a feature carrying
    /// its geodesic area.
    pub fn yearly(class: LayerClass, year: i32, polygons: &MultiPolygon<f64>, palette: &Palette) -> Result<Self> {
        let style = palette.style(class, Some(year))?;
        let features = polygons
            .iter()
            .map(|p| {
                let area_ha = (p.geodesic_area_unsigned() / 100.0).round() / 100.0;
                let f = Feature::new(p.clone())
                    .with_property("class", class.slug())
                    .with_property("year", i64::from(year))
                    .with_property("area_ha", area_ha);
                styled(f, &style)
            })
            .collect();
        Ok(Self { name: format!("{} ({year})", class.label()), class, year: Some(year), style, features })
    }

    /// The protected-area polygons with their attributes.
    pub fn boundary(region: &Region, palette: &Palette) -> Result<Self> {
        let style = palette.style(LayerClass::Boundary, None)?;
        let features = region.to_features().into_iter().map(|f| styled(f, &style)).collect();
        Ok(Self { name: LayerClass::Boundary.label().to_string(), class: LayerClass::Boundary, year: None, style, features })
    }

    /// File stem, e.g. `water_2015` or `boundary`.
    pub fn slug(&self) -> String {
        match self.year {
            Some(y) => format!("{}_{y}", self.class.slug()),
            None => self.class.slug().to_string(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.geojson", self.slug())
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// GeoJSON with the layer name and style as foreign members of the
    /// collection.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut fc = to_geojson(&self.features)?;
        let mut members = JsonObject::new();
        members.insert("name".into(), self.name.clone().into());
        members.insert("style".into(), serde_json::to_value(&self.style)?);
        fc.foreign_members = Some(members);
        std::fs::write(path, fc.to_string())?;
        Ok(())
    }
}

/// Boundary overlay first, then the configured classes of each computed
/// year in year order. Failed years have no layers.
pub fn build_layers(region: &Region, run: &SessionRun, config: &Config) -> Result<Vec<MapLayer>> {
    let mut layers = Vec::new();
    if config.layers.boundary {
        layers.push(MapLayer::boundary(region, &config.palette)?);
    }
    for output in &run.outputs {
        for class in LayerClass::YEARLY.into_iter().filter(|c| config.layers.includes(*c)) {
            if let Some(polygons) = output.polygons.get(class) {
                layers.push(MapLayer::yearly(class, output.result.year, polygons, &config.palette)?);
            }
        }
    }
    Ok(layers)
}

#[derive(Debug, Clone, Serialize)]
pub struct OverlayEntry {
    pub name: String,
    pub file: String,
    pub class: LayerClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub style: LayerStyle,
    pub features: usize,
    /// Attribute fields shown on hover and click; boundary layer only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popup: Option<Vec<String>>,
}

/// What a map front-end needs to show the layers.
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    /// (lat, lon), the region centroid
    pub center: [f64; 2],
    pub zoom: u8,
    pub basemaps: Vec<Basemap>,
    pub overlays: Vec<OverlayEntry>,
}

impl Manifest {
    pub fn new(region: &Region, layers: &[MapLayer], config: &Config) -> Self {
        let (lon, lat) = region.centroid();
        let fields = &config.region.attributes;
        let overlays = layers
            .iter()
            .map(|l| {
                let boundary = l.class == LayerClass::Boundary;
                OverlayEntry {
                    name: l.name.clone(),
                    file: l.file_name(),
                    class: l.class,
                    year: l.year,
                    style: l.style.clone(),
                    features: l.features.len(),
                    tooltip: boundary.then(|| fields.tooltip_fields()),
                    popup: boundary.then(|| fields.popup_fields()),
                }
            })
            .collect();
        Self { center: [lat, lon], zoom: config.map.zoom, basemaps: config.map.basemaps.clone(), overlays }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use geo::polygon;
    use tidemark_core::BBox;

    fn square() -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: 113.35, y: -7.22),
            (x: 113.36, y: -7.22),
            (x: 113.36, y: -7.21),
            (x: 113.35, y: -7.21),
            (x: 113.35, y: -7.22),
        ]])
    }

    #[test]
    fn yearly_layer_is_styled() {
        let layer = MapLayer::yearly(LayerClass::Water, 2015, &square(), &Palette::default()).unwrap();
        assert_eq!(layer.slug(), "water_2015");
        assert_eq!(layer.name, "Water (2015)");
        assert_eq!(layer.features.len(), 1);
        let f = &layer.features.features[0];
        assert_eq!(f.get_property("fillColor").unwrap().to_string(), "#4B8BBE");
        assert_eq!(f.get_property("weight").unwrap().as_f64(), Some(1.8));
        // 0.01 degree square near the equator is about 122 ha
        let area = f.get_property("area_ha").unwrap().as_f64().unwrap();
        assert!((115.0..130.0).contains(&area), "{area}");
    }

    #[test]
    fn empty_class_yields_empty_layer() {
        let layer = MapLayer::yearly(LayerClass::Land, 2020, &MultiPolygon::new(vec![]), &Palette::default()).unwrap();
        assert!(layer.is_empty());
    }

    #[test]
    fn missing_colour_is_an_error() {
        assert!(MapLayer::yearly(LayerClass::Water, 1999, &square(), &Palette::default()).is_err());
    }

    #[test]
    fn manifest_lists_boundary_fields() {
        let region = Region::new("k.shp", BBox::new(113.35, -7.22, 113.38, -7.19), vec![]);
        let config = Config::default();
        let layers = vec![
            MapLayer::boundary(&region, &config.palette).unwrap(),
            MapLayer::yearly(LayerClass::Water, 2015, &square(), &config.palette).unwrap(),
        ];
        let m = Manifest::new(&region, &layers, &config);
        assert_eq!(m.zoom, 14);
        assert_abs_diff_eq!(m.center[0], -7.205, epsilon = 1e-9);
        assert_abs_diff_eq!(m.center[1], 113.365, epsilon = 1e-9);
        assert_eq!(m.overlays[0].file, "boundary.geojson");
        assert_eq!(m.overlays[0].tooltip.as_deref(), Some(&["NAMOBJ".to_string(), "LUASHA".to_string()][..]));
        assert!(m.overlays[1].popup.is_none());

        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["overlays"][1]["style"]["fillOpacity"], 0.5);
        assert_eq!(json["basemaps"][1]["name"], "Google Satellite");
    }
}
