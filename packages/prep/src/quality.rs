//! Data-quality bookkeeping.
//!
//! The loaders are lenient: malformed numbers become zero and join misses
//! leave fields empty. Each of those events is counted here so the
//! leniency never hides a broken export.

use std::collections::{BTreeMap, BTreeSet};

use outage_map_geography_models::RegionId;
use serde::{Deserialize, Serialize};

/// Why a row was dropped entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// The region key could not be canonicalized.
    InvalidRegionId,
    /// Year or month was missing or out of range.
    InvalidPeriod,
    /// The row belongs to an excluded state.
    Excluded,
    /// The state code is not a known state.
    UnknownState,
}

/// Counts of every lenient decision made while preparing the dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualityReport {
    /// `"<file>.<column>"` -> number of values coerced to zero.
    pub coerced_values: BTreeMap<String, u64>,
    /// `"<file>"` -> reason -> number of dropped rows.
    pub dropped_rows: BTreeMap<String, BTreeMap<DropReason, u64>>,
    /// Counties with a boundary but no outage rows.
    pub regions_without_outages: BTreeSet<RegionId>,
    /// Counties with a boundary but no population row.
    pub regions_without_population: BTreeSet<RegionId>,
    /// Counties whose boundary geometry could not be used.
    pub regions_without_boundary: BTreeSet<RegionId>,
    /// Counties with outage rows but no boundary.
    pub outages_without_region: BTreeSet<RegionId>,
    /// States with outage rows but no cartogram reference row.
    pub states_without_reference: BTreeSet<String>,
}

impl DataQualityReport {
    /// Records a value coerced to zero.
    pub fn record_coercion(&mut self, file: &str, column: &str) {
        *self
            .coerced_values
            .entry(format!("{file}.{column}"))
            .or_insert(0) += 1;
    }

    /// Records a dropped row.
    pub fn record_drop(&mut self, file: &str, reason: DropReason) {
        *self
            .dropped_rows
            .entry(file.to_string())
            .or_default()
            .entry(reason)
            .or_insert(0) += 1;
    }

    /// Total number of coerced values.
    #[must_use]
    pub fn total_coercions(&self) -> u64 {
        self.coerced_values.values().sum()
    }

    /// Total number of dropped rows for `reason` across files.
    #[must_use]
    pub fn total_dropped(&self, reason: DropReason) -> u64 {
        self.dropped_rows
            .values()
            .filter_map(|reasons| reasons.get(&reason))
            .sum()
    }

    /// Returns `true` if nothing was coerced, dropped (apart from
    /// configured exclusions) or left unjoined.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.coerced_values.is_empty()
            && self
                .dropped_rows
                .values()
                .flat_map(BTreeMap::keys)
                .all(|reason| *reason == DropReason::Excluded)
            && self.regions_without_outages.is_empty()
            && self.regions_without_population.is_empty()
            && self.regions_without_boundary.is_empty()
            && self.outages_without_region.is_empty()
            && self.states_without_reference.is_empty()
    }

    /// Logs the report once: a warning when anything was masked, a debug
    /// line otherwise.
    pub fn log_summary(&self) {
        if self.is_clean() {
            log::debug!("Data quality: no coercions or join misses");
            return;
        }

        log::warn!(
            "Data quality: {} values coerced to zero, {} invalid region ids, \
             {} invalid periods, {} unknown states, {} excluded rows",
            self.total_coercions(),
            self.total_dropped(DropReason::InvalidRegionId),
            self.total_dropped(DropReason::InvalidPeriod),
            self.total_dropped(DropReason::UnknownState),
            self.total_dropped(DropReason::Excluded),
        );
        log::warn!(
            "Data quality: {} counties without outages, {} without population, \
             {} without boundary, {} outage counties without boundary, \
             {} states without cartogram reference",
            self.regions_without_outages.len(),
            self.regions_without_population.len(),
            self.regions_without_boundary.len(),
            self.outages_without_region.len(),
            self.states_without_reference.len(),
        );
        for (column, count) in &self.coerced_values {
            log::info!("  {column}: {count} values coerced to zero");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusions_alone_keep_report_clean() {
        let mut report = DataQualityReport::default();
        report.record_drop("outages", DropReason::Excluded);
        assert!(report.is_clean());
        assert_eq!(report.total_dropped(DropReason::Excluded), 1);
    }

    #[test]
    fn coercions_accumulate_per_column() {
        let mut report = DataQualityReport::default();
        report.record_coercion("outages", "outage_count");
        report.record_coercion("outages", "outage_count");
        report.record_coercion("population", "pop_2020");
        assert!(!report.is_clean());
        assert_eq!(report.coerced_values["outages.outage_count"], 2);
        assert_eq!(report.total_coercions(), 3);
    }
}
