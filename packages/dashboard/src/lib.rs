#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The outage dashboard: three coordinated views over a prepared
//! [`Dataset`].
//!
//! The timeline, choropleth and cartogram never call each other. User
//! gestures become [`DashboardEvent`]s, the [`Dispatcher`] delivers them
//! to the session reducers first and then to each view, and views redraw
//! lazily from the shared [`DashboardState`] when a snapshot is taken.

pub mod cache;
pub mod cartogram;
pub mod choropleth;
pub mod colour;
pub mod config;
pub mod controls;
pub mod dispatcher;
pub mod scale;
pub mod timeline;

use outage_map_dashboard_models::{
    ControlState, DashboardEvent, DashboardSnapshot, EventKind, HandlerKey, MapDisplay,
    SelectionState,
};
use outage_map_geography_models::RegionId;
use outage_map_outage_models::InvalidRangeError;
use outage_map_prep::Dataset;
use thiserror::Error;

pub use config::DashboardConfig;
pub use controls::{Controls, Interaction};
pub use dispatcher::{DispatchReport, Dispatcher};

use cartogram::CartogramView;
use choropleth::ChoroplethView;
use timeline::TimelineView;

/// A user gesture that cannot be turned into an event.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("County {0} is not on the map")]
    UnknownRegion(RegionId),

    /// A brush was given before the timeline had any bars.
    #[error("The timeline has no bars to brush")]
    EmptyTimeline,

    #[error(transparent)]
    InvalidRange(#[from] InvalidRangeError),
}

/// Failure of a single event handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// Everything the handlers read and write.
#[derive(Debug)]
pub struct DashboardState {
    pub dataset: Dataset,
    pub selection: SelectionState,
    pub controls: ControlState,
    pub timeline: TimelineView,
    pub choropleth: ChoroplethView,
    pub cartogram: CartogramView,
}

/// A dashboard session over one dataset.
#[derive(Debug)]
pub struct Dashboard {
    state: DashboardState,
    dispatcher: Dispatcher<DashboardState>,
}

impl Dashboard {
    /// Creates a session with an empty selection and the default controls.
    #[must_use]
    pub fn new(dataset: Dataset, config: DashboardConfig) -> Self {
        let state = DashboardState {
            dataset,
            selection: SelectionState::default(),
            controls: ControlState::default(),
            timeline: TimelineView::new(config.timeline),
            choropleth: ChoroplethView::new(config.choropleth),
            cartogram: CartogramView::new(config.cartogram),
        };

        let mut dispatcher = Dispatcher::new();
        register_handlers(&mut dispatcher);

        Self { state, dispatcher }
    }

    #[must_use]
    pub const fn state(&self) -> &DashboardState {
        &self.state
    }

    /// The dispatcher, for subscribing additional handlers. They run after
    /// the built-in ones.
    pub const fn dispatcher_mut(&mut self) -> &mut Dispatcher<DashboardState> {
        &mut self.dispatcher
    }

    /// Delivers `event` to every subscribed handler.
    pub fn publish(&mut self, event: &DashboardEvent) -> DispatchReport {
        self.dispatcher.publish(&mut self.state, event)
    }

    /// Translates a gesture into events and publishes them in order.
    ///
    /// # Errors
    ///
    /// Returns a [`SelectionError`] if the gesture does not map to a valid
    /// event; nothing is published in that case.
    pub fn apply(
        &mut self,
        interaction: &Interaction,
    ) -> Result<Vec<DispatchReport>, SelectionError> {
        log::debug!("Interaction: {interaction}");
        let state = &mut self.state;

        let events = if let Some(target) = interaction.click_target() {
            vec![ChoroplethView::click(
                &state.dataset,
                &state.selection,
                state.controls.granularity,
                target,
            )?]
        } else {
            match *interaction {
                Interaction::Brush { x0, x1 } => {
                    if state.timeline.scene().is_none() {
                        state.timeline.render(&state.dataset, &state.selection);
                    }
                    vec![state.timeline.brush_end(Some((x0, x1)))?]
                }
                Interaction::ClearBrush => vec![DashboardEvent::TimeRangeChanged(None)],
                Interaction::SelectRange { start, end } => {
                    vec![Controls::select_range(start, end)?]
                }
                Interaction::ToggleGranularity => {
                    vec![Controls::toggle_granularity(state.controls)]
                }
                Interaction::ToggleDisplay => vec![Controls::toggle_display(state.controls)],
                Interaction::Reset => Controls::reset().to_vec(),
                Interaction::ClickRegion { .. }
                | Interaction::ClickPoint { .. }
                | Interaction::ClickBackground => Vec::new(),
            }
        };

        Ok(events.iter().map(|event| self.publish(event)).collect())
    }

    /// Renders whatever is stale and returns the timeline together with
    /// the active geographic view.
    pub fn snapshot(&mut self) -> DashboardSnapshot {
        let state = &mut self.state;

        let timeline = match state.timeline.scene() {
            Some(scene) => scene.clone(),
            None => state.timeline.render(&state.dataset, &state.selection).clone(),
        };

        let (choropleth, cartogram) = match state.controls.display {
            MapDisplay::Map => {
                let scene = match state.choropleth.scene() {
                    Some(scene) => scene.clone(),
                    None => state
                        .choropleth
                        .render(&state.dataset, &state.selection, state.controls.granularity)
                        .clone(),
                };
                (Some(scene), None)
            }
            MapDisplay::Cartogram => {
                let scene = match state.cartogram.scene() {
                    Some(scene) => scene.clone(),
                    None => {
                        let tiles = state.dataset.tiles(state.selection.selected_date_range);
                        state.cartogram.render(&tiles, &state.selection).clone()
                    }
                };
                (None, Some(scene))
            }
        };

        DashboardSnapshot {
            selection: state.selection.clone(),
            controls: state.controls,
            timeline,
            choropleth,
            cartogram,
        }
    }
}

/// Session reducers first, so views always see the updated session.
fn register_handlers(dispatcher: &mut Dispatcher<DashboardState>) {
    dispatcher.subscribe(
        HandlerKey::new(EventKind::SelectCounty, "session"),
        |state: &mut DashboardState, event: &DashboardEvent| {
            if let DashboardEvent::SelectCounty(ids) = event {
                let unknown = ids.iter().find(|id| state.dataset.region(**id).is_none());
                if let Some(id) = unknown {
                    return Err(SelectionError::UnknownRegion(*id).into());
                }
            }
            state.selection.apply(event);
            Ok(())
        },
    );
    for kind in [EventKind::ResetCounty, EventKind::TimeRangeChanged] {
        dispatcher.subscribe(
            HandlerKey::new(kind, "session"),
            |state: &mut DashboardState, event: &DashboardEvent| {
                state.selection.apply(event);
                Ok(())
            },
        );
    }
    dispatcher.subscribe(
        HandlerKey::new(EventKind::RegionChanged, "session"),
        |state: &mut DashboardState, event: &DashboardEvent| {
            state.controls.apply(event);
            Ok(())
        },
    );

    for kind in [
        EventKind::SelectCounty,
        EventKind::ResetCounty,
        EventKind::TimeRangeChanged,
    ] {
        dispatcher.subscribe(
            HandlerKey::new(kind, "timeline"),
            |state: &mut DashboardState, event: &DashboardEvent| {
                state.timeline.on_event(event);
                Ok(())
            },
        );
    }

    for kind in EventKind::ALL {
        dispatcher.subscribe(
            HandlerKey::new(*kind, "choropleth"),
            |state: &mut DashboardState, event: &DashboardEvent| {
                state.choropleth.on_event(&state.dataset, event)?;
                Ok(())
            },
        );
    }

    dispatcher.subscribe(
        HandlerKey::new(EventKind::TimeRangeChanged, "cartogram"),
        |state: &mut DashboardState, event: &DashboardEvent| {
            state.cartogram.on_event(event);
            Ok(())
        },
    );
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use outage_map_dashboard_models::Granularity;
    use outage_map_outage_models::MonthRange;
    use outage_map_prep::fixtures;

    use super::*;

    fn dashboard() -> Dashboard {
        Dashboard::new(fixtures::dataset(), DashboardConfig::default())
    }

    fn la() -> RegionId {
        RegionId::new(6037).unwrap()
    }

    fn spring() -> MonthRange {
        MonthRange::new("2021-03".parse().unwrap(), "2021-05".parse().unwrap()).unwrap()
    }

    fn la_metric(dashboard: &mut Dashboard) -> Option<f64> {
        dashboard
            .snapshot()
            .choropleth
            .and_then(|scene| scene.region(la()).and_then(|r| r.metric))
    }

    #[test]
    fn session_reducers_run_first() {
        let dashboard = dashboard();
        assert_eq!(
            dashboard.dispatcher.handlers(EventKind::TimeRangeChanged),
            ["session", "timeline", "choropleth", "cartogram"]
        );
        assert_eq!(
            dashboard.dispatcher.handlers(EventKind::RegionChanged),
            ["session", "choropleth"]
        );
    }

    #[test]
    fn republishing_an_event_changes_nothing() {
        let mut dashboard = dashboard();
        let event = DashboardEvent::TimeRangeChanged(Some(spring()));

        assert!(dashboard.publish(&event).is_ok());
        let once = dashboard.snapshot();
        assert!(dashboard.publish(&event).is_ok());
        assert_eq!(dashboard.snapshot(), once);
    }

    #[test]
    fn clearing_the_range_restores_all_time_metric() {
        let mut dashboard = dashboard();
        let all_time = la_metric(&mut dashboard);

        dashboard.publish(&DashboardEvent::TimeRangeChanged(Some(spring())));
        let filtered = la_metric(&mut dashboard);
        assert_ne!(filtered, all_time);
        assert!((filtered.unwrap() - 0.006).abs() < 1e-12);

        dashboard.publish(&DashboardEvent::TimeRangeChanged(None));
        assert_eq!(la_metric(&mut dashboard), all_time);
    }

    #[test]
    fn clicking_twice_publishes_an_empty_selection() {
        let mut dashboard = dashboard();
        let click = Interaction::ClickRegion { region: la() };

        dashboard.apply(&click).unwrap();
        assert!(dashboard.state().selection.is_selected(la()));

        let reports = dashboard.apply(&click).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].event, EventKind::SelectCounty);
        assert!(dashboard.state().selection.selected_region_ids.is_empty());
    }

    #[test]
    fn reset_clears_counties_and_range() {
        let mut dashboard = dashboard();
        dashboard.apply(&Interaction::ClickRegion { region: la() }).unwrap();
        dashboard
            .apply(&Interaction::SelectRange {
                start: spring().start(),
                end: spring().end(),
            })
            .unwrap();

        let reports = dashboard.apply(&Interaction::Reset).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(dashboard.state().selection, SelectionState::default());
    }

    #[test]
    fn selection_narrows_the_timeline() {
        let mut dashboard = dashboard();
        let global = dashboard.snapshot().timeline;
        dashboard.apply(&Interaction::ClickRegion { region: la() }).unwrap();
        let selected = dashboard.snapshot().timeline;

        assert_eq!(global.y_max, 30);
        assert_eq!(selected.bars.len(), 12);
        let marked: Vec<bool> = dashboard
            .snapshot()
            .choropleth
            .unwrap()
            .regions
            .iter()
            .map(|r| r.selected)
            .collect();
        assert_eq!(marked.iter().filter(|m| **m).count(), 1);
    }

    #[test]
    fn brushing_before_any_snapshot_renders_the_timeline() {
        let mut dashboard = dashboard();
        let reports = dashboard.apply(&Interaction::Brush { x0: 0.0, x1: 1260.0 }).unwrap();
        assert_eq!(reports[0].event, EventKind::TimeRangeChanged);
        assert_eq!(
            dashboard.state().selection.selected_date_range,
            MonthRange::new("2020-01".parse().unwrap(), "2021-12".parse().unwrap()).ok()
        );
    }

    #[test]
    fn display_toggle_switches_the_geographic_view() {
        let mut dashboard = dashboard();
        assert!(dashboard.snapshot().cartogram.is_none());

        dashboard.apply(&Interaction::ToggleDisplay).unwrap();
        let snapshot = dashboard.snapshot();
        assert!(snapshot.choropleth.is_none());
        assert_eq!(snapshot.cartogram.unwrap().tiles.len(), 2);
        assert_eq!(snapshot.controls.display, MapDisplay::Cartogram);
    }

    #[test]
    fn state_granularity_selects_whole_states() {
        let mut dashboard = dashboard();
        dashboard.apply(&Interaction::ToggleGranularity).unwrap();
        assert_eq!(dashboard.state().controls.granularity, Granularity::State);

        dashboard.apply(&Interaction::ClickPoint { lon: 0.5, lat: 0.5 }).unwrap();
        let expected: BTreeSet<RegionId> = [6001, 6037]
            .into_iter()
            .filter_map(RegionId::new)
            .collect();
        assert_eq!(dashboard.state().selection.selected_region_ids, expected);
    }

    #[test]
    fn failing_handlers_do_not_block_the_session() {
        let mut dashboard = dashboard();
        dashboard.dispatcher_mut().subscribe(
            HandlerKey::new(EventKind::SelectCounty, "audit"),
            |_: &mut DashboardState, _: &DashboardEvent| {
                Err(HandlerError::Failed("audit log unavailable".to_string()))
            },
        );

        let reports = dashboard.apply(&Interaction::ClickRegion { region: la() }).unwrap();
        assert_eq!(reports[0].failures.len(), 1);
        assert!(dashboard.state().selection.is_selected(la()));
    }

    #[test]
    fn unknown_counties_are_reported() {
        let mut dashboard = dashboard();
        let stray = RegionId::new(6999).unwrap();
        let report = dashboard.publish(&DashboardEvent::SelectCounty(BTreeSet::from([stray])));

        let keys: Vec<String> = report.failures.iter().map(|f| f.key.to_string()).collect();
        assert_eq!(keys, ["selectCounty.session", "selectCounty.choropleth"]);
        assert!(dashboard.state().selection.selected_region_ids.is_empty());
        assert!(dashboard.apply(&Interaction::ClickRegion { region: stray }).is_err());
    }

    #[test]
    fn rejected_selection_keeps_the_previous_one() {
        let mut dashboard = dashboard();
        dashboard.apply(&Interaction::ClickRegion { region: la() }).unwrap();
        let before = dashboard.snapshot().timeline;

        let stray = RegionId::new(6999).unwrap();
        let event = DashboardEvent::SelectCounty(BTreeSet::from([la(), stray]));
        let report = dashboard.publish(&event);
        assert!(!report.is_ok());

        assert_eq!(
            dashboard.state().selection.selected_region_ids,
            BTreeSet::from([la()])
        );
        assert_eq!(dashboard.snapshot().timeline, before);
    }

    #[test]
    fn snapshot_serializes_with_event_names() {
        let mut dashboard = dashboard();
        let json = serde_json::to_value(dashboard.snapshot()).unwrap();
        assert!(json["timeline"]["bars"].is_array());
        assert!(json.get("cartogram").is_none());

        let event = serde_json::to_value(DashboardEvent::TimeRangeChanged(None)).unwrap();
        assert_eq!(event["event"], "timeRangeChanged");
    }
}
