//! Per-year layer colours and the fixed stroke/fill styles of each layer class

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// A `#RRGGBB` colour.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(String);

impl Color {
    pub fn parse(s: &str) -> Result<Self> {
        let hex = s.trim();
        let valid = hex.len() == 7 && hex.starts_with('#') && hex[1..].chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(AnalysisError::Config(format!("'{s}' is not a #RRGGBB colour")));
        }
        Ok(Self(hex.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Color {
    type Error = AnalysisError;

    fn try_from(s: String) -> Result<Self> {
        Color::parse(&s)
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a map layer shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerClass {
    Water,
    Land,
    LandInRegion,
    Boundary,
}

impl LayerClass {
    /// Year-tagged classes, in drawing order.
    pub const YEARLY: [LayerClass; 3] = [LayerClass::Water, LayerClass::Land, LayerClass::LandInRegion];

    pub fn slug(self) -> &'static str {
        match self {
            LayerClass::Water => "water",
            LayerClass::Land => "land",
            LayerClass::LandInRegion => "land_in_region",
            LayerClass::Boundary => "boundary",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LayerClass::Water => "Water",
            LayerClass::Land => "Land",
            LayerClass::LandInRegion => "Land in protected region",
            LayerClass::Boundary => "Protected areas",
        }
    }

    /// (stroke weight, fill opacity)
    fn stroke(self) -> (f64, f64) {
        match self {
            LayerClass::Water => (1.8, 0.5),
            LayerClass::Land => (1.8, 0.4),
            LayerClass::LandInRegion => (2.5, 0.6),
            LayerClass::Boundary => (3.0, 0.5),
        }
    }
}

impl fmt::Display for LayerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Serialized with Leaflet path-option names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerStyle {
    #[serde(rename = "color")]
    pub stroke: Color,
    #[serde(rename = "fillColor")]
    pub fill: Color,
    pub weight: f64,
    #[serde(rename = "fillOpacity")]
    pub fill_opacity: f64,
}

/// Colour per class and year. Years are table keys (`"2015" = "#4B8BBE"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Palette {
    pub boundary_fill: Color,
    pub boundary_stroke: Color,
    pub water: BTreeMap<String, Color>,
    pub land: BTreeMap<String, Color>,
    pub land_in_region: BTreeMap<String, Color>,
}

fn colors(entries: [(&str, &str); 3]) -> BTreeMap<String, Color> {
    entries.iter().map(|(y, c)| (y.to_string(), Color(c.to_string()))).collect()
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            boundary_fill: Color("#FFD700".into()),
            boundary_stroke: Color("#FF8C00".into()),
            water: colors([("2015", "#4B8BBE"), ("2020", "#306998"), ("2025", "#FFE873")]),
            land: colors([("2015", "#2E8B57"), ("2020", "#228B22"), ("2025", "#8B4513")]),
            land_in_region: colors([("2015", "#DC143C"), ("2020", "#B22222"), ("2025", "#8B0000")]),
        }
    }
}

impl Palette {
    fn table(&self, class: LayerClass) -> Option<&BTreeMap<String, Color>> {
        match class {
            LayerClass::Water => Some(&self.water),
            LayerClass::Land => Some(&self.land),
            LayerClass::LandInRegion => Some(&self.land_in_region),
            LayerClass::Boundary => None,
        }
    }

    pub fn color(&self, class: LayerClass, year: i32) -> Option<&Color> {
        self.table(class)?.get(&year.to_string())
    }

    /// Style of a yearly layer; the boundary layer ignores `year`.
    pub fn style(&self, class: LayerClass, year: Option<i32>) -> Result<LayerStyle> {
        let (weight, fill_opacity) = class.stroke();
        let (stroke, fill) = match (class, year) {
            (LayerClass::Boundary, _) => (self.boundary_stroke.clone(), self.boundary_fill.clone()),
            (_, Some(y)) => {
                let c = self
                    .color(class, y)
                    .ok_or_else(|| AnalysisError::Config(format!("palette has no {} colour for {y}", class.slug())))?;
                (c.clone(), c.clone())
            }
            (_, None) => {
                return Err(AnalysisError::Config(format!("{} layers need a year", class.slug())));
            }
        };
        Ok(LayerStyle { stroke, fill, weight, fill_opacity })
    }

    /// Every yearly class needs a colour for every configured year.
    pub fn validate(&self, years: &[i32]) -> Result<()> {
        let missing: Vec<String> = LayerClass::YEARLY
            .iter()
            .flat_map(|&class| {
                years
                    .iter()
                    .filter(move |&&y| self.color(class, y).is_none())
                    .map(move |y| format!("{}/{y}", class.slug()))
            })
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AnalysisError::Config(format!("palette is missing colours for {}", missing.join(", "))))
        }
    }
}
