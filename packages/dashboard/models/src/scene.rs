//! Serializable view models produced by the dashboard views.
//!
//! Scenes are what a renderer would draw: positions in pixels, fills as
//! hex colours, and the values behind each mark for tooltips. They carry
//! no drawing instructions of their own.

use outage_map_geography_models::{RaceCategory, RegionId};
use outage_map_outage_models::{AggregateKey, MonthRange, YearMonth};
use serde::{Deserialize, Serialize};

use crate::events::Granularity;

/// One month bar of the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarMark {
    pub period: YearMonth,
    pub total: u64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A year caption under the timeline axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearLabel {
    pub year: i32,
    /// Centre between the year's first and last month band.
    pub x: f64,
}

/// Pixel extent of the brush drawn over the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrushExtent {
    pub x0: f64,
    pub x1: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineScene {
    /// What the bars aggregate.
    pub key: AggregateKey,
    /// Inner chart width.
    pub width: f64,
    /// Inner chart height.
    pub height: f64,
    pub bandwidth: f64,
    /// Upper end of the y domain.
    pub y_max: u64,
    pub bars: Vec<BarMark>,
    pub year_labels: Vec<YearLabel>,
    /// The selected range drawn as a brush, if any.
    pub brush: Option<BrushExtent>,
}

/// One county of the choropleth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionFill {
    pub region_id: RegionId,
    pub name: Option<String>,
    pub state_code: String,
    /// Outage count in the active range; `None` without outage rows.
    pub outage_count: Option<u64>,
    /// Outages per resident; `None` when the metric is unavailable.
    pub metric: Option<f64>,
    pub fill: String,
    pub selected: bool,
    /// `(lon, lat)` anchor for the tooltip.
    pub centroid: Option<(f64, f64)>,
}

/// A colour stop of the choropleth legend gradient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendStop {
    pub value: f64,
    /// Position along the legend in percent.
    pub offset: f64,
    pub colour: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoroplethScene {
    pub range: Option<MonthRange>,
    pub granularity: Granularity,
    /// Colour domain `(min, max)`; `None` when no county has a metric.
    pub extent: Option<(f64, f64)>,
    pub legend: Vec<LegendStop>,
    pub regions: Vec<RegionFill>,
}

impl ChoroplethScene {
    #[must_use]
    pub fn region(&self, id: RegionId) -> Option<&RegionFill> {
        self.regions.iter().find(|r| r.region_id == id)
    }
}

/// One slice of a tile's pie chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieArc {
    pub category: RaceCategory,
    pub value: f64,
    /// Radians, clockwise from twelve o'clock.
    pub start_angle: f64,
    pub end_angle: f64,
    pub colour: String,
}

/// A laid-out cartogram tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileMark {
    pub state_code: String,
    pub grid_x: u32,
    pub grid_y: u32,
    /// Left edge in pixels.
    pub x: f64,
    /// Top edge in pixels.
    pub y: f64,
    /// Side length in pixels.
    pub size: f64,
    pub fill: String,
    pub affected_proportion: f64,
    pub non_white_proportion: f64,
    pub pie_radius: f64,
    pub arcs: Vec<PieArc>,
}

impl TileMark {
    /// Centre of the tile, where the pie chart is drawn.
    #[must_use]
    pub const fn centre(&self) -> (f64, f64) {
        (self.x + self.size / 2.0, self.y + self.size / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartogramScene {
    pub range: Option<MonthRange>,
    pub tiles: Vec<TileMark>,
}

impl CartogramScene {
    #[must_use]
    pub fn tile(&self, state_code: &str) -> Option<&TileMark> {
        self.tiles.iter().find(|t| t.state_code == state_code)
    }
}
