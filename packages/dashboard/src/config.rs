//! View dimensions, scales and colours.
//!
//! Every field has a default matching the embedded `dashboard.toml`, and
//! any subset can be overridden from a TOML file with a `[dashboard]`
//! table.

use outage_map_geography_models::RaceCategory;
use serde::{Deserialize, Serialize};

use crate::colour::Rgb;
use crate::scale::ScaleKind;

/// The embedded default configuration, kept in sync with
/// [`DashboardConfig::default`].
pub const DEFAULT_DASHBOARD_TOML: &str = include_str!("../dashboard.toml");

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub container_width: f64,
    pub container_height: f64,
    pub margin: Margin,
    pub padding_inner: f64,
    pub padding_outer: f64,
    pub align: f64,
    /// Bar width as a fraction of the band width.
    pub bar_width_ratio: f64,
    /// Pixel row the tallest bar reaches.
    pub y_range_top: f64,
}

impl TimelineConfig {
    /// Inner chart width.
    #[must_use]
    pub const fn width(&self) -> f64 {
        self.container_width - self.margin.left - self.margin.right
    }

    /// Inner chart height.
    #[must_use]
    pub const fn height(&self) -> f64 {
        self.container_height - self.margin.top - self.margin.bottom
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            container_width: 1300.0,
            container_height: 150.0,
            margin: Margin {
                top: 10.0,
                right: 10.0,
                bottom: 20.0,
                left: 30.0,
            },
            padding_inner: 0.2,
            padding_outer: 0.1,
            align: 0.5,
            bar_width_ratio: 0.5,
            y_range_top: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoroplethConfig {
    pub colour_light: Rgb,
    pub colour_dark: Rgb,
    /// Fill of counties whose metric is unavailable.
    pub colour_no_data: Rgb,
    pub scale: ScaleKind,
    /// Number of legend gradient stops, spread evenly over the extent.
    pub legend_stops: usize,
}

impl Default for ChoroplethConfig {
    fn default() -> Self {
        Self {
            colour_light: Rgb::new(0xfd, 0xf6, 0xc1),
            colour_dark: Rgb::new(0x0e, 0x10, 0x31),
            colour_no_data: Rgb::new(0xcc, 0xcc, 0xcc),
            scale: ScaleKind::Sqrt,
            legend_stops: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartogramConfig {
    pub min_square_size: f64,
    pub max_square_size: f64,
    /// Vertical distance between grid rows that do not touch.
    pub square_spacing: f64,
    pub size_scale: ScaleKind,
    /// Pie radius as a fraction of `min_square_size`.
    pub pie_radius_ratio: f64,
    pub diverging_midpoint: f64,
    pub colour_low: Rgb,
    pub colour_mid: Rgb,
    pub colour_high: Rgb,
    /// Pie colours, assigned to categories in pie order.
    pub race_palette: Vec<Rgb>,
}

impl CartogramConfig {
    #[must_use]
    pub const fn pie_radius(&self) -> f64 {
        self.min_square_size * self.pie_radius_ratio
    }
}

impl Default for CartogramConfig {
    fn default() -> Self {
        Self {
            min_square_size: 70.0,
            max_square_size: 150.0,
            square_spacing: 80.0,
            size_scale: ScaleKind::Sqrt,
            pie_radius_ratio: 0.4,
            diverging_midpoint: 0.5,
            colour_low: Rgb::new(0x21, 0x66, 0xac),
            colour_mid: Rgb::new(0xf7, 0xf7, 0xf7),
            colour_high: Rgb::new(0xb2, 0x18, 0x2b),
            race_palette: vec![
                Rgb::new(0xe1, 0x57, 0x59),
                Rgb::new(0xf2, 0x8e, 0x2c),
                Rgb::new(0x76, 0xb7, 0xb2),
                Rgb::new(0x59, 0xa1, 0x4f),
                Rgb::new(0xed, 0xc9, 0x49),
                Rgb::new(0xaf, 0x7a, 0xa1),
            ],
        }
    }
}

/// Configuration of all three views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub timeline: TimelineConfig,
    pub choropleth: ChoroplethConfig,
    pub cartogram: CartogramConfig,
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    dashboard: DashboardConfig,
}

impl DashboardConfig {
    /// Parses the `[dashboard]` table of a TOML document. Missing fields
    /// keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a value has the wrong
    /// type (including colours that are not `#rrggbb`).
    pub fn from_toml_str(toml_str: &str) -> Result<Self, toml::de::Error> {
        let file: ConfigFile = toml::de::from_str(toml_str)?;
        Ok(file.dashboard)
    }

    /// Category names in pie order, the domain of the pie colour scale.
    pub fn race_domain() -> impl Iterator<Item = &'static str> {
        RaceCategory::PIE_ORDER.iter().map(AsRef::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_config_matches_default() {
        let embedded = DashboardConfig::from_toml_str(DEFAULT_DASHBOARD_TOML).unwrap();
        assert_eq!(embedded, DashboardConfig::default());
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let config = DashboardConfig::from_toml_str(
            "[dashboard.cartogram]\nsize_scale = \"linear\"\nsquare_spacing = 90.0\n",
        )
        .unwrap();
        assert_eq!(config.cartogram.size_scale, ScaleKind::Linear);
        assert!((config.cartogram.square_spacing - 90.0).abs() < f64::EPSILON);
        assert!((config.cartogram.min_square_size - 70.0).abs() < f64::EPSILON);
        assert_eq!(config.timeline, TimelineConfig::default());
    }

    #[test]
    fn rejects_bad_colours() {
        let result =
            DashboardConfig::from_toml_str("[dashboard.choropleth]\ncolour_dark = \"navy\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn inner_timeline_size() {
        let config = TimelineConfig::default();
        assert!((config.width() - 1260.0).abs() < f64::EPSILON);
        assert!((config.height() - 120.0).abs() < f64::EPSILON);
        assert!((CartogramConfig::default().pie_radius() - 28.0).abs() < 1e-9);
    }
}
