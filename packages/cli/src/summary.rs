//! Plain-text summaries of the dataset and of a dashboard snapshot.

use std::fmt::Write as _;

use outage_map_dashboard_models::{DashboardSnapshot, MapDisplay};
use outage_map_prep::Dataset;
use outage_map_prep::quality::DropReason;

/// Number of counties listed in a snapshot summary.
const TOP_COUNTIES: usize = 5;

/// Dataset size, covered period and data-quality counts.
#[must_use]
pub fn dataset(dataset: &Dataset) -> String {
    let mut out = String::new();
    let quality = dataset.quality();

    let _ = writeln!(out, "Counties:        {}", dataset.regions().len());
    let _ = writeln!(out, "Outage rows:     {}", dataset.record_count());
    let _ = writeln!(out, "States:          {}", dataset.states().len());
    let _ = writeln!(
        out,
        "Period:          {}",
        dataset
            .period()
            .map_or_else(|| "none".to_string(), |p| p.to_string())
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Coerced values:  {}", quality.total_coercions());
    for reason in [
        DropReason::InvalidRegionId,
        DropReason::InvalidPeriod,
        DropReason::UnknownState,
        DropReason::Excluded,
    ] {
        let _ = writeln!(
            out,
            "Dropped ({reason:?}): {}",
            quality.total_dropped(reason)
        );
    }
    let _ = writeln!(
        out,
        "Without outages: {}",
        quality.regions_without_outages.len()
    );
    let _ = writeln!(
        out,
        "Without population: {}",
        quality.regions_without_population.len()
    );
    let _ = writeln!(
        out,
        "Outages without boundary: {}",
        quality.outages_without_region.len()
    );

    out
}

/// Selection, timeline peak and the active geographic view.
#[must_use]
pub fn snapshot(snapshot: &DashboardSnapshot) -> String {
    let mut out = String::new();
    let selection = &snapshot.selection;

    let _ = writeln!(
        out,
        "Selection: {} counties, range {}",
        selection.selected_region_ids.len(),
        selection
            .selected_date_range
            .map_or_else(|| "all months".to_string(), |r| r.to_string())
    );
    let _ = writeln!(
        out,
        "Controls:  {} granularity, {} view",
        snapshot.controls.granularity, snapshot.controls.display
    );

    let peak = snapshot
        .timeline
        .bars
        .iter()
        .max_by_key(|b| b.total)
        .map_or_else(|| "no bars".to_string(), |b| format!("{} in {}", b.total, b.period));
    let _ = writeln!(out, "Timeline:  {} months, peak {peak}", snapshot.timeline.bars.len());

    match snapshot.controls.display {
        MapDisplay::Map => {
            if let Some(scene) = &snapshot.choropleth {
                let mut ranked: Vec<_> = scene
                    .regions
                    .iter()
                    .filter_map(|r| r.metric.map(|m| (r, m)))
                    .collect();
                ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
                let _ = writeln!(out, "Top counties by outages per resident:");
                for (region, metric) in ranked.into_iter().take(TOP_COUNTIES) {
                    let _ = writeln!(
                        out,
                        "  {} {:<24} {metric:.6}{}",
                        region.region_id,
                        region.name.as_deref().unwrap_or("?"),
                        if region.selected { " *" } else { "" }
                    );
                }
            }
        }
        MapDisplay::Cartogram => {
            if let Some(scene) = &snapshot.cartogram {
                let _ = writeln!(out, "States by affected share:");
                let mut tiles: Vec<_> = scene.tiles.iter().collect();
                tiles.sort_by(|a, b| b.affected_proportion.total_cmp(&a.affected_proportion));
                for tile in tiles.into_iter().take(TOP_COUNTIES) {
                    let _ = writeln!(
                        out,
                        "  {} {:.6} (size {:.0})",
                        tile.state_code, tile.affected_proportion, tile.size
                    );
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use outage_map_dashboard::{Dashboard, DashboardConfig, Interaction};
    use outage_map_prep::fixtures;

    use super::*;

    #[test]
    fn dataset_summary_counts_exclusions() {
        let text = dataset(&fixtures::dataset());
        assert!(text.contains("Counties:        3"));
        assert!(text.contains("Period:          2020-01"));
        assert!(text.contains("Dropped (Excluded): 3"));
    }

    #[test]
    fn snapshot_summary_follows_display() {
        let mut dashboard = Dashboard::new(fixtures::dataset(), DashboardConfig::default());
        let map = snapshot(&dashboard.snapshot());
        assert!(map.contains("Top counties"));
        assert!(map.contains("Los Angeles"));

        dashboard.apply(&Interaction::ToggleDisplay).unwrap();
        let cartogram = snapshot(&dashboard.snapshot());
        assert!(cartogram.contains("States by affected share"));
    }
}
