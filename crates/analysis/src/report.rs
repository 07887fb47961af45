//! Results table, change summary and `report.json`

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;
use crate::model::{Hectares, YearOutcome};
use crate::region::Region;

pub const TABLE_HEADERS: [&str; 4] =
    ["Year", "Water Area (ha)", "Land Area (ha)", "Land-in-Protected-Region Area (ha)"];

/// Plain-text table of the per-year areas, one row per outcome in order.
/// Failed years are marked with `*`.
pub fn render_table(outcomes: &[YearOutcome]) -> String {
    let rows: Vec<[String; 4]> = outcomes
        .iter()
        .map(|o| {
            let r = &o.result;
            let year = if o.is_failed() { format!("{}*", r.year) } else { r.year.to_string() };
            [year, r.water.to_string(), r.land.to_string(), r.land_in_region.to_string()]
        })
        .collect();

    let widths: Vec<usize> = (0..4)
        .map(|i| rows.iter().map(|r| r[i].len()).chain([TABLE_HEADERS[i].len()]).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    let line = |cells: [&str; 4], out: &mut String| {
        let mut text = format!("{:<w$}", cells[0], w = widths[0]);
        for i in 1..4 {
            text.push_str(&format!("  {:>w$}", cells[i], w = widths[i]));
        }
        out.push_str(text.trim_end());
        out.push('\n');
    };
    line(TABLE_HEADERS, &mut out);
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    line([rule[0].as_str(), rule[1].as_str(), rule[2].as_str(), rule[3].as_str()], &mut out);
    for r in &rows {
        line([r[0].as_str(), r[1].as_str(), r[2].as_str(), r[3].as_str()], &mut out);
    }
    out
}

/// Change of land inside the protected region between two years.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalChange {
    pub from: i32,
    pub to: i32,
    pub land_in_region_delta: Hectares,
    /// Hectares per year
    pub rate: f64,
}

/// Differences between the computed years. Failed years are left out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeSummary {
    pub first_year: i32,
    pub last_year: i32,
    pub water_delta: Hectares,
    pub land_delta: Hectares,
    pub intervals: Vec<IntervalChange>,
    /// Whether the latest interval changed land in the region faster than the
    /// one before; `None` with fewer than two intervals.
    pub accelerating: Option<bool>,
}

impl ChangeSummary {
    pub fn from_outcomes(outcomes: &[YearOutcome]) -> Option<Self> {
        let ok: Vec<_> = outcomes.iter().filter(|o| !o.is_failed()).map(|o| &o.result).collect();
        let (first, last) = (ok.first()?, ok.last()?);
        if ok.len() < 2 {
            return None;
        }

        let intervals: Vec<IntervalChange> = ok
            .windows(2)
            .map(|w| {
                let delta = w[1].land_in_region - w[0].land_in_region;
                let span = (w[1].year - w[0].year).max(1) as f64;
                IntervalChange { from: w[0].year, to: w[1].year, land_in_region_delta: delta, rate: delta.value() / span }
            })
            .collect();
        let accelerating = match intervals.as_slice() {
            [.., prev, latest] => Some(latest.rate.abs() > prev.rate.abs()),
            _ => None,
        };

        Some(Self {
            first_year: first.year,
            last_year: last.year,
            water_delta: last.water - first.water,
            land_delta: last.land - first.land,
            intervals,
            accelerating,
        })
    }

    /// One line per finding.
    pub fn describe(&self) -> Vec<String> {
        let (a, b) = (self.first_year, self.last_year);
        let mut lines = vec![
            format!("Water area {a}-{b}: {} ha", signed(self.water_delta)),
            format!("Land area {a}-{b}: {} ha", signed(self.land_delta)),
        ];
        for i in &self.intervals {
            lines.push(format!(
                "Land in protected region {}-{}: {} ha ({:+.2} ha/yr)",
                i.from,
                i.to,
                signed(i.land_in_region_delta),
                i.rate
            ));
        }
        match self.accelerating {
            Some(true) => lines.push("Change of land in the protected region is accelerating".into()),
            Some(false) => lines.push("Change of land in the protected region is slowing".into()),
            None => {}
        }
        lines
    }
}

fn signed(h: Hectares) -> String {
    if h.hundredths() > 0 {
        format!("+{h}")
    } else {
        h.to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionSummary {
    pub source: PathBuf,
    /// West, south, east, north
    pub bbox: [f64; 4],
    pub bbox_area_ha: f64,
    pub protected_areas: usize,
    pub protected_area_ha: f64,
    /// (lon, lat)
    pub centroid: (f64, f64),
}

impl RegionSummary {
    pub fn of(region: &Region) -> Self {
        Self {
            source: region.source().to_path_buf(),
            bbox: region.bbox().to_array(),
            bbox_area_ha: region.bbox().geodesic_area_m2() / 10_000.0,
            protected_areas: region.len(),
            protected_area_ha: region.geodesic_area_ha(),
            centroid: region.centroid(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct YearRow {
    #[serde(flatten)]
    pub outcome: YearOutcome,
    /// (water + land) / bounding-box area
    pub coverage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generator: String,
    pub source: String,
    pub region: RegionSummary,
    pub years: Vec<YearRow>,
    pub change: Option<ChangeSummary>,
}

impl Report {
    pub fn new(region: &Region, outcomes: &[YearOutcome], source: impl Into<String>) -> Self {
        let summary = RegionSummary::of(region);
        let years = outcomes
            .iter()
            .map(|o| YearRow { outcome: o.clone(), coverage: coverage(o, summary.bbox_area_ha) })
            .collect();
        Self {
            generator: concat!("tidemark ", env!("CARGO_PKG_VERSION")).to_string(),
            source: source.into(),
            region: summary,
            years,
            change: ChangeSummary::from_outcomes(outcomes),
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &YearOutcome> {
        self.years.iter().map(|r| &r.outcome).filter(|o| o.is_failed())
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Share of the bounding box that received a class.
pub fn coverage(outcome: &YearOutcome, bbox_area_ha: f64) -> f64 {
    if bbox_area_ha <= 0.0 {
        return 0.0;
    }
    let ratio = outcome.result.classified().value() / bbox_area_ha;
    (ratio * 10_000.0).round() / 10_000.0
}
