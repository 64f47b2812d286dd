//! County choropleth of outages per resident.

use std::collections::BTreeSet;

use outage_map_dashboard_models::scene::{ChoroplethScene, LegendStop, RegionFill};
use outage_map_dashboard_models::{DashboardEvent, Granularity, SelectionState};
use outage_map_geography_models::RegionId;
use outage_map_prep::Dataset;
use serde::{Deserialize, Serialize};

use crate::SelectionError;
use crate::cache::RangeSumCache;
use crate::colour::SequentialScale;
use crate::config::ChoroplethConfig;

/// Where a click on the map landed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum ClickTarget {
    Region { region: RegionId },
    /// A map coordinate, resolved by hit testing.
    Point { lon: f64, lat: f64 },
    Background,
}

#[derive(Debug)]
pub struct ChoroplethView {
    config: ChoroplethConfig,
    cache: RangeSumCache,
    scene: Option<ChoroplethScene>,
}

impl ChoroplethView {
    #[must_use]
    pub fn new(config: ChoroplethConfig) -> Self {
        Self {
            config,
            cache: RangeSumCache::new(),
            scene: None,
        }
    }

    #[must_use]
    pub const fn scene(&self) -> Option<&ChoroplethScene> {
        self.scene.as_ref()
    }

    #[must_use]
    pub const fn cache(&self) -> &RangeSumCache {
        &self.cache
    }

    /// Reacts to a published event.
    ///
    /// A range change drops the cached range sums. Any selection change
    /// makes the scene stale.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::UnknownRegion`] if a `selectCounty` event
    /// names a county that is not on the map.
    pub fn on_event(
        &mut self,
        dataset: &Dataset,
        event: &DashboardEvent,
    ) -> Result<(), SelectionError> {
        match event {
            DashboardEvent::TimeRangeChanged(_) => {
                self.cache.invalidate();
                self.scene = None;
            }
            DashboardEvent::SelectCounty(ids) => {
                self.scene = None;
                if let Some(unknown) = ids.iter().find(|id| dataset.region(**id).is_none()) {
                    return Err(SelectionError::UnknownRegion(*unknown));
                }
            }
            DashboardEvent::ResetCounty | DashboardEvent::RegionChanged { .. } => {
                self.scene = None;
            }
        }
        Ok(())
    }

    /// Colours every county by its outage count in the selected range
    /// divided by its population.
    ///
    /// The population is the mean estimate of the years the range covers.
    /// Counties without outage rows or without population data get the
    /// no-data colour.
    #[allow(clippy::cast_precision_loss)]
    pub fn render(
        &mut self,
        dataset: &Dataset,
        selection: &SelectionState,
        granularity: Granularity,
    ) -> &ChoroplethScene {
        let range = selection.selected_date_range;
        let years = range.map(|r| r.years());
        let sums = self.cache.sums(dataset, range);

        let values: Vec<(RegionId, Option<u64>, Option<f64>)> = dataset
            .regions()
            .values()
            .map(|region| {
                let count = sums.get(&region.id).copied().flatten();
                let population = region
                    .population
                    .as_ref()
                    .and_then(|p| p.representative(years.clone()));
                let metric = match (count, population) {
                    (Some(count), Some(population)) if population > 0.0 => {
                        Some(count as f64 / population)
                    }
                    (Some(_), Some(_)) => Some(0.0),
                    _ => None,
                };
                (region.id, count, metric)
            })
            .collect();

        let extent = values
            .iter()
            .filter_map(|(_, _, metric)| *metric)
            .fold(None, |acc: Option<(f64, f64)>, v| {
                Some(acc.map_or((v, v), |(lo, hi)| (lo.min(v), hi.max(v))))
            });

        let scale = extent.map(|domain| {
            SequentialScale::new(
                self.config.scale,
                domain,
                self.config.colour_light,
                self.config.colour_dark,
            )
        });

        let regions = values
            .into_iter()
            .filter_map(|(id, outage_count, metric)| {
                let region = dataset.region(id)?;
                let fill = match (metric, &scale) {
                    (Some(value), Some(scale)) => scale.colour(value),
                    _ => self.config.colour_no_data,
                };
                Some(RegionFill {
                    region_id: id,
                    name: region.name.clone(),
                    state_code: region.state_code.clone(),
                    outage_count,
                    metric,
                    fill: fill.to_string(),
                    selected: selection.is_selected(id),
                    centroid: dataset.index().centroid(id),
                })
            })
            .collect::<Vec<_>>();

        let legend = match (extent, &scale) {
            (Some(extent), Some(scale)) => legend_stops(extent, self.config.legend_stops, scale),
            _ => Vec::new(),
        };

        let unavailable = regions.iter().filter(|r| r.metric.is_none()).count();
        log::debug!(
            "Choropleth: {} counties, {unavailable} without metric, range {}",
            regions.len(),
            range.map_or_else(|| "all".to_string(), |r| r.to_string())
        );

        self.scene.insert(ChoroplethScene {
            range,
            granularity,
            extent,
            legend,
            regions,
        })
    }

    /// The event a click publishes.
    ///
    /// At county granularity the clicked county is toggled. At state
    /// granularity every county of its state is added, or removed if they
    /// were all selected already. The event always carries the full
    /// resulting set, which may be empty. A click outside every county
    /// resets the selection.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::UnknownRegion`] for a region id that is
    /// not on the map.
    pub fn click(
        dataset: &Dataset,
        selection: &SelectionState,
        granularity: Granularity,
        target: ClickTarget,
    ) -> Result<DashboardEvent, SelectionError> {
        let id = match target {
            ClickTarget::Region { region } => region,
            ClickTarget::Point { lon, lat } => match dataset.locate(lon, lat) {
                Some(id) => id,
                None => return Ok(DashboardEvent::ResetCounty),
            },
            ClickTarget::Background => return Ok(DashboardEvent::ResetCounty),
        };
        let region = dataset.region(id).ok_or(SelectionError::UnknownRegion(id))?;

        let mut selected = selection.selected_region_ids.clone();
        match granularity {
            Granularity::County => {
                if !selected.remove(&id) {
                    selected.insert(id);
                }
            }
            Granularity::State => {
                let state: BTreeSet<RegionId> = dataset.regions_in_state(&region.state_code);
                if state.is_subset(&selected) {
                    selected.retain(|id| !state.contains(id));
                } else {
                    selected.extend(state);
                }
            }
        }

        log::debug!("Click on {id} ({granularity}): {} selected", selected.len());
        Ok(DashboardEvent::SelectCounty(selected))
    }
}

/// Evenly spaced gradient stops over `extent`.
fn legend_stops(extent: (f64, f64), count: usize, scale: &SequentialScale) -> Vec<LegendStop> {
    let (lo, hi) = extent;
    let last = count.saturating_sub(1).max(1);
    (0..count)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f64 / last as f64;
            let value = (hi - lo).mul_add(t, lo);
            LegendStop {
                value,
                offset: t * 100.0,
                colour: scale.colour(value).to_string(),
            }
        })
        .collect()
}
