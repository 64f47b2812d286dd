//! The dashboard's event vocabulary.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use outage_map_geography_models::RegionId;
use outage_map_outage_models::MonthRange;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Discriminant of a [`DashboardEvent`], used to route subscriptions.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum EventKind {
    SelectCounty,
    ResetCounty,
    RegionChanged,
    TimeRangeChanged,
}

impl EventKind {
    pub const ALL: &'static [Self] = &[
        Self::SelectCounty,
        Self::ResetCounty,
        Self::RegionChanged,
        Self::TimeRangeChanged,
    ];
}

/// What a click on the choropleth selects.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Granularity {
    /// A click toggles the county under the pointer.
    #[default]
    County,
    /// A click toggles every county of the clicked county's state.
    State,
}

impl Granularity {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::County => Self::State,
            Self::State => Self::County,
        }
    }
}

/// Which geographic view is shown next to the timeline.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum MapDisplay {
    #[default]
    Map,
    Cartogram,
}

impl MapDisplay {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Map => Self::Cartogram,
            Self::Cartogram => Self::Map,
        }
    }
}

/// An event published on the dashboard dispatcher.
///
/// Serializes as `{"event": "selectCounty", "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum DashboardEvent {
    /// The full set of selected counties, replacing the previous set. May
    /// be empty.
    SelectCounty(BTreeSet<RegionId>),
    /// Clears the county selection.
    ResetCounty,
    /// The granularity or display control changed.
    RegionChanged {
        granularity: Granularity,
        display: MapDisplay,
    },
    /// The brushed month range, or `None` when the brush was cleared.
    TimeRangeChanged(Option<MonthRange>),
}

impl DashboardEvent {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::SelectCounty(_) => EventKind::SelectCounty,
            Self::ResetCounty => EventKind::ResetCounty,
            Self::RegionChanged { .. } => EventKind::RegionChanged,
            Self::TimeRangeChanged(_) => EventKind::TimeRangeChanged,
        }
    }
}

impl fmt::Display for DashboardEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelectCounty(ids) => write!(f, "selectCounty({} counties)", ids.len()),
            Self::ResetCounty => f.write_str("resetCounty"),
            Self::RegionChanged {
                granularity,
                display,
            } => write!(f, "regionChanged({granularity}, {display})"),
            Self::TimeRangeChanged(Some(range)) => write!(f, "timeRangeChanged({range})"),
            Self::TimeRangeChanged(None) => f.write_str("timeRangeChanged(cleared)"),
        }
    }
}

/// A namespaced subscription key such as `timeRangeChanged.choropleth`.
///
/// A handler name is unique per event kind; the same name may be
/// subscribed to several kinds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerKey {
    pub event: EventKind,
    pub handler: String,
}

impl HandlerKey {
    #[must_use]
    pub fn new(event: EventKind, handler: impl Into<String>) -> Self {
        Self {
            event,
            handler: handler.into(),
        }
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.event, self.handler)
    }
}

impl FromStr for HandlerKey {
    type Err = InvalidHandlerKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidHandlerKeyError { raw: s.to_string() };
        let (event, handler) = s.split_once('.').ok_or_else(invalid)?;
        let event = event.parse::<EventKind>().map_err(|_| invalid())?;
        if handler.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(event, handler))
    }
}

/// Error returned when a string is not `<event>.<handler>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidHandlerKeyError {
    /// The rejected input.
    pub raw: String,
}

impl fmt::Display for InvalidHandlerKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid handler key '{}': expected <event>.<handler>",
            self.raw
        )
    }
}

impl std::error::Error for InvalidHandlerKeyError {}
