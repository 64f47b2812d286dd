//! Monthly outage bars with a brushable time axis.

use chrono::Days;
use outage_map_dashboard_models::scene::{BarMark, BrushExtent, TimelineScene, YearLabel};
use outage_map_dashboard_models::{DashboardEvent, SelectionState};
use outage_map_outage_models::{AggregateKey, MonthRange, YearMonth};
use outage_map_prep::Dataset;

use crate::SelectionError;
use crate::config::TimelineConfig;
use crate::scale::{BandScale, ContinuousScale, TimeScale};

/// Scales of the last render, kept for brush inversion.
#[derive(Debug, Clone, Copy)]
struct Axes {
    time: TimeScale,
}

/// The timeline view.
#[derive(Debug)]
pub struct TimelineView {
    config: TimelineConfig,
    scene: Option<TimelineScene>,
    axes: Option<Axes>,
}

impl TimelineView {
    #[must_use]
    pub const fn new(config: TimelineConfig) -> Self {
        Self {
            config,
            scene: None,
            axes: None,
        }
    }

    /// The last rendered scene, unless an event made it stale.
    #[must_use]
    pub const fn scene(&self) -> Option<&TimelineScene> {
        self.scene.as_ref()
    }

    /// Marks the scene stale when the selection changes.
    pub fn on_event(&mut self, event: &DashboardEvent) {
        match event {
            DashboardEvent::SelectCounty(_)
            | DashboardEvent::ResetCounty
            | DashboardEvent::TimeRangeChanged(_) => self.scene = None,
            DashboardEvent::RegionChanged { .. } => {}
        }
    }

    /// Aggregates the selected counties (all counties for an empty
    /// selection) and lays out one bar per month.
    #[allow(clippy::cast_precision_loss)]
    pub fn render(&mut self, dataset: &Dataset, selection: &SelectionState) -> &TimelineScene {
        let months = dataset.aggregate(&selection.selected_region_ids);
        let width = self.config.width();
        let height = self.config.height();

        let band = BandScale::new(
            months.len(),
            (0.0, width),
            self.config.padding_inner,
            self.config.padding_outer,
            self.config.align,
        );

        let y_max = months
            .iter()
            .map(|m| m.total_outage_count)
            .max()
            .unwrap_or(0);
        // A zero domain would put empty bars at mid height.
        let y = ContinuousScale::linear(
            (0.0, y_max.max(1) as f64),
            (height, self.config.y_range_top),
        );

        let bars: Vec<BarMark> = months
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let top = y.apply(m.total_outage_count as f64);
                BarMark {
                    period: m.period,
                    total: m.total_outage_count,
                    x: band.position(i),
                    y: top,
                    width: band.bandwidth() * self.config.bar_width_ratio,
                    height: height - top,
                }
            })
            .collect();

        let mut year_labels: Vec<YearLabel> = Vec::new();
        for chunk in bars.chunk_by(|a, b| a.period.year() == b.period.year()) {
            if let (Some(first), Some(last)) = (chunk.first(), chunk.last()) {
                year_labels.push(YearLabel {
                    year: first.period.year(),
                    x: f64::midpoint(first.x, last.x),
                });
            }
        }

        self.axes = bars.first().map(|first| Axes {
            time: TimeScale::new(first.period, &band),
        });

        let brush = match (self.axes, selection.selected_date_range) {
            (Some(axes), Some(range)) => brush_extent(&axes.time, range),
            _ => None,
        };

        let key = months
            .first()
            .map_or(AggregateKey::Global, |m| m.key.clone());

        log::debug!(
            "Timeline: {} months, y max {y_max}, {} selected counties",
            bars.len(),
            selection.selected_region_ids.len()
        );

        self.scene.insert(TimelineScene {
            key,
            width,
            height,
            bandwidth: band.bandwidth(),
            y_max,
            bars,
            year_labels,
            brush,
        })
    }

    /// Converts a brush pixel extent into a month range.
    ///
    /// `None`, a zero-width extent and an extent that collapses to no full
    /// day all clear the range. The end month is the month containing the
    /// last day covered by the brush.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::EmptyTimeline`] if a non-empty brush is
    /// given before any bar was rendered.
    pub fn brush_range(
        &self,
        extent: Option<(f64, f64)>,
    ) -> Result<Option<MonthRange>, SelectionError> {
        let Some((a, b)) = extent else {
            return Ok(None);
        };
        if (a - b).abs() < f64::EPSILON || !a.is_finite() || !b.is_finite() {
            return Ok(None);
        }
        let axes = self.axes.ok_or(SelectionError::EmptyTimeline)?;

        let (x0, x1) = if a < b { (a, b) } else { (b, a) };
        let (Some(start), Some(end)) = (axes.time.invert(x0), axes.time.invert(x1)) else {
            return Err(SelectionError::EmptyTimeline);
        };
        if start >= end {
            return Ok(None);
        }

        let last_day = end.checked_sub_days(Days::new(1)).unwrap_or(end);
        Ok(Some(MonthRange::ordered(
            YearMonth::from_date(start),
            YearMonth::from_date(last_day),
        )))
    }

    /// The event a finished brush gesture publishes.
    ///
    /// # Errors
    ///
    /// See [`TimelineView::brush_range`].
    pub fn brush_end(&self, extent: Option<(f64, f64)>) -> Result<DashboardEvent, SelectionError> {
        let range = self.brush_range(extent)?;
        log::debug!(
            "Brush end: {}",
            range.map_or_else(|| "cleared".to_string(), |r| r.to_string())
        );
        Ok(DashboardEvent::TimeRangeChanged(range))
    }
}

fn brush_extent(time: &TimeScale, range: MonthRange) -> Option<BrushExtent> {
    let start = range.start().first_day()?;
    let end = range.end().offset(1).first_day()?;
    Some(BrushExtent {
        x0: time.apply(start),
        x1: time.apply(end),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use outage_map_geography_models::RegionId;
    use outage_map_prep::fixtures;

    use super::*;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    fn rendered() -> (TimelineView, Dataset) {
        let dataset = fixtures::dataset();
        let mut view = TimelineView::new(TimelineConfig::default());
        view.render(&dataset, &SelectionState::default());
        (view, dataset)
    }

    #[test]
    fn empty_selection_matches_full_selection() {
        let (mut view, dataset) = rendered();
        let all = view.scene().unwrap().bars.clone();

        let every: BTreeSet<RegionId> = dataset.records().map(|r| r.region_id).collect();
        let selection = SelectionState {
            selected_region_ids: every,
            selected_date_range: None,
        };
        let full = view.render(&dataset, &selection).bars.clone();

        assert_eq!(all, full);
    }

    #[test]
    fn twelve_bars_per_year_with_labels() {
        let (view, _) = rendered();
        let scene = view.scene().unwrap();

        // Fixture rows cover 2020 and 2021.
        assert_eq!(scene.bars.len(), 24);
        assert_eq!(scene.year_labels.len(), 2);
        assert_eq!(scene.year_labels[0].year, 2020);
        let expected = f64::midpoint(scene.bars[0].x, scene.bars[11].x);
        assert!((scene.year_labels[0].x - expected).abs() < 1e-9);
        assert!((scene.bars[0].width - scene.bandwidth / 2.0).abs() < 1e-9);
        assert_eq!(scene.y_max, 30);
    }

    #[test]
    fn zero_width_brush_clears() {
        let (view, _) = rendered();
        assert_eq!(
            view.brush_end(Some((400.0, 400.0))).unwrap(),
            DashboardEvent::TimeRangeChanged(None)
        );
        assert_eq!(view.brush_end(None).unwrap(), DashboardEvent::TimeRangeChanged(None));
    }

    #[test]
    fn brush_snaps_to_months() {
        let (view, _) = rendered();
        let scene = view.scene().unwrap();
        let step = scene.bars[1].x - scene.bars[0].x;
        let gap = step - scene.bandwidth;
        // Cell of month i starts half a gap before its bar.
        let cell = |i: usize| scene.bars[i].x - gap / 2.0;

        // From the start of 2021-03 to the start of 2021-06.
        let range = view.brush_range(Some((cell(14), cell(17)))).unwrap().unwrap();
        assert_eq!(range, MonthRange::new(ym("2021-03"), ym("2021-05")).unwrap());

        // Dragging right to left gives the same range.
        let reversed = view.brush_range(Some((cell(17), cell(14)))).unwrap().unwrap();
        assert_eq!(reversed, range);

        // Mid-month endpoints floor to their months.
        let inner = view
            .brush_range(Some((cell(14) + step / 2.0, cell(16) + step / 2.0)))
            .unwrap()
            .unwrap();
        assert_eq!(inner, MonthRange::new(ym("2021-03"), ym("2021-05")).unwrap());
    }

    #[test]
    fn selected_range_is_drawn_as_brush() {
        let dataset = fixtures::dataset();
        let mut view = TimelineView::new(TimelineConfig::default());
        let range = MonthRange::new(ym("2021-03"), ym("2021-05")).unwrap();
        let selection = SelectionState {
            selected_region_ids: BTreeSet::new(),
            selected_date_range: Some(range),
        };
        let scene = view.render(&dataset, &selection).clone();
        let brush = scene.brush.unwrap();

        let round_trip = view.brush_range(Some((brush.x0, brush.x1))).unwrap();
        assert_eq!(round_trip, Some(range));
    }

    #[test]
    fn brushing_before_render_fails() {
        let view = TimelineView::new(TimelineConfig::default());
        assert!(matches!(
            view.brush_range(Some((0.0, 10.0))),
            Err(SelectionError::EmptyTimeline)
        ));
    }
}
