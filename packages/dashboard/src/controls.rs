//! UI controls and user gestures, translated into dispatcher events.

use outage_map_dashboard_models::{ControlState, DashboardEvent};
use outage_map_geography_models::RegionId;
use outage_map_outage_models::{MonthRange, YearMonth};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

use crate::SelectionError;
use crate::choropleth::ClickTarget;

/// One user gesture on the dashboard.
///
/// Serializes with an `action` tag, so a replay script reads as
/// `{ action = "click_region", region = "06037" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(tag = "action", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Interaction {
    /// A finished brush over the timeline, in pixels.
    Brush { x0: f64, x1: f64 },
    ClearBrush,
    /// Sets the month range directly.
    SelectRange { start: YearMonth, end: YearMonth },
    ClickRegion { region: RegionId },
    /// A click on the map at a coordinate.
    ClickPoint { lon: f64, lat: f64 },
    ClickBackground,
    ToggleGranularity,
    ToggleDisplay,
    Reset,
}

impl Interaction {
    /// The map click this interaction stands for, if any.
    #[must_use]
    pub const fn click_target(&self) -> Option<ClickTarget> {
        match *self {
            Self::ClickRegion { region } => Some(ClickTarget::Region { region }),
            Self::ClickPoint { lon, lat } => Some(ClickTarget::Point { lon, lat }),
            Self::ClickBackground => Some(ClickTarget::Background),
            _ => None,
        }
    }
}

/// The granularity toggle, display toggle and reset button.
pub struct Controls;

impl Controls {
    #[must_use]
    pub const fn toggle_granularity(current: ControlState) -> DashboardEvent {
        ControlState {
            granularity: current.granularity.toggled(),
            display: current.display,
        }
        .to_event()
    }

    #[must_use]
    pub const fn toggle_display(current: ControlState) -> DashboardEvent {
        ControlState {
            granularity: current.granularity,
            display: current.display.toggled(),
        }
        .to_event()
    }

    /// The reset button clears the county selection and the brush.
    #[must_use]
    pub const fn reset() -> [DashboardEvent; 2] {
        [
            DashboardEvent::ResetCounty,
            DashboardEvent::TimeRangeChanged(None),
        ]
    }

    /// A range typed in directly.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::InvalidRange`] if `start` is after `end`.
    pub fn select_range(
        start: YearMonth,
        end: YearMonth,
    ) -> Result<DashboardEvent, SelectionError> {
        Ok(DashboardEvent::TimeRangeChanged(Some(MonthRange::new(
            start, end,
        )?)))
    }
}

#[cfg(test)]
mod tests {
    use outage_map_dashboard_models::{Granularity, MapDisplay};

    use super::*;

    #[test]
    fn toggles_flip_one_control() {
        let current = ControlState::default();
        assert_eq!(
            Controls::toggle_granularity(current),
            DashboardEvent::RegionChanged {
                granularity: Granularity::State,
                display: MapDisplay::Map,
            }
        );
        assert_eq!(
            Controls::toggle_display(current),
            DashboardEvent::RegionChanged {
                granularity: Granularity::County,
                display: MapDisplay::Cartogram,
            }
        );
    }

    #[test]
    fn reversed_range_is_rejected() {
        let result = Controls::select_range("2021-05".parse().unwrap(), "2021-03".parse().unwrap());
        assert!(matches!(result, Err(SelectionError::InvalidRange(_))));
    }

    #[test]
    fn interactions_parse_from_toml() {
        #[derive(Deserialize)]
        struct Script {
            interactions: Vec<Interaction>,
        }

        let script: Script = toml::de::from_str(
            r#"
            [[interactions]]
            action = "click_region"
            region = "06037"

            [[interactions]]
            action = "select_range"
            start = "2021-03"
            end = "2021-05"

            [[interactions]]
            action = "reset"
            "#,
        )
        .unwrap();

        assert_eq!(
            script.interactions,
            [
                Interaction::ClickRegion {
                    region: RegionId::new(6037).unwrap()
                },
                Interaction::SelectRange {
                    start: "2021-03".parse().unwrap(),
                    end: "2021-05".parse().unwrap(),
                },
                Interaction::Reset,
            ]
        );
        assert_eq!(script.interactions[2].to_string(), "reset");
    }
}
