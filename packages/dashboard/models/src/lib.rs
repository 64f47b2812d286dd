#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Events, session state and scenes shared by the dashboard views.
//!
//! Views communicate only through [`DashboardEvent`]s. The session they
//! read ([`SelectionState`] and [`ControlState`]) changes only by applying
//! those events, so any sequence of events can be replayed into the same
//! state.

pub mod events;
pub mod scene;

use std::collections::BTreeSet;

use outage_map_geography_models::RegionId;
use outage_map_outage_models::MonthRange;
use serde::{Deserialize, Serialize};

pub use events::{DashboardEvent, EventKind, Granularity, HandlerKey, MapDisplay};
pub use scene::{CartogramScene, ChoroplethScene, TimelineScene};

/// The counties and month range every view filters by.
///
/// Starts empty. An empty county set means "all counties", and a `None`
/// range means "all months".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    pub selected_region_ids: BTreeSet<RegionId>,
    pub selected_date_range: Option<MonthRange>,
}

impl SelectionState {
    /// Applies an event, replacing the affected field wholesale. Returns
    /// `true` if the state changed.
    pub fn apply(&mut self, event: &DashboardEvent) -> bool {
        let before = self.clone();
        match event {
            DashboardEvent::SelectCounty(ids) => {
                self.selected_region_ids.clone_from(ids);
            }
            DashboardEvent::ResetCounty => self.selected_region_ids.clear(),
            DashboardEvent::TimeRangeChanged(range) => self.selected_date_range = *range,
            DashboardEvent::RegionChanged { .. } => {}
        }
        *self != before
    }

    #[must_use]
    pub fn is_selected(&self, id: RegionId) -> bool {
        self.selected_region_ids.contains(&id)
    }
}

/// State of the granularity and display toggles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlState {
    pub granularity: Granularity,
    pub display: MapDisplay,
}

impl ControlState {
    /// Applies a `regionChanged` event; other events are ignored. Returns
    /// `true` if the state changed.
    pub fn apply(&mut self, event: &DashboardEvent) -> bool {
        if let DashboardEvent::RegionChanged {
            granularity,
            display,
        } = event
        {
            let next = Self {
                granularity: *granularity,
                display: *display,
            };
            let changed = *self != next;
            *self = next;
            changed
        } else {
            false
        }
    }

    /// The event that moves the controls to this state.
    #[must_use]
    pub const fn to_event(self) -> DashboardEvent {
        DashboardEvent::RegionChanged {
            granularity: self.granularity,
            display: self.display,
        }
    }
}

/// Everything currently on screen.
///
/// Only the active geographic view's scene is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub selection: SelectionState,
    pub controls: ControlState,
    pub timeline: TimelineScene,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choropleth: Option<ChoroplethScene>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cartogram: Option<CartogramScene>,
}
