//! Memoized per-county outage sums.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use outage_map_geography_models::RegionId;
use outage_map_outage_models::MonthRange;
use outage_map_prep::Dataset;

/// Outage sum per county; `None` for counties without outage rows.
pub type RangeSums = BTreeMap<RegionId, Option<u64>>;

/// Per-county outage sums keyed by the month range they cover.
///
/// `None` is the all-time key. Entries are dropped only by
/// [`RangeSumCache::invalidate`]; the all-time entry survives
/// invalidation since the dataset never changes.
#[derive(Debug, Default)]
pub struct RangeSumCache {
    table: BTreeMap<Option<MonthRange>, RangeSums>,
    hits: u64,
    misses: u64,
}

impl RangeSumCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sums for `range`, computing them on a miss.
    pub fn sums(&mut self, dataset: &Dataset, range: Option<MonthRange>) -> &RangeSums {
        match self.table.entry(range) {
            Entry::Occupied(entry) => {
                self.hits += 1;
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                self.misses += 1;
                log::trace!(
                    "Computing county sums for {}",
                    range.map_or_else(|| "all months".to_string(), |r| r.to_string())
                );
                entry.insert(
                    dataset
                        .regions()
                        .keys()
                        .map(|id| (*id, dataset.outage_sum(*id, range)))
                        .collect(),
                )
            }
        }
    }

    /// Drops every range-specific entry.
    pub fn invalidate(&mut self) {
        self.table.retain(|range, _| range.is_none());
    }

    /// Ranges currently held, all-time first.
    pub fn cached_ranges(&self) -> impl Iterator<Item = Option<MonthRange>> + '_ {
        self.table.keys().copied()
    }

    #[must_use]
    pub const fn hits(&self) -> u64 {
        self.hits
    }

    #[must_use]
    pub const fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use outage_map_prep::fixtures;

    use super::*;

    fn spring() -> MonthRange {
        MonthRange::new("2021-03".parse().unwrap(), "2021-05".parse().unwrap()).unwrap()
    }

    #[test]
    fn second_lookup_hits() {
        let dataset = fixtures::dataset();
        let mut cache = RangeSumCache::new();
        let la = RegionId::new(6037).unwrap();

        assert_eq!(cache.sums(&dataset, Some(spring()))[&la], Some(60));
        assert_eq!(cache.sums(&dataset, Some(spring()))[&la], Some(60));
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }

    #[test]
    fn invalidate_keeps_all_time_entry() {
        let dataset = fixtures::dataset();
        let mut cache = RangeSumCache::new();
        cache.sums(&dataset, None);
        cache.sums(&dataset, Some(spring()));

        cache.invalidate();
        assert_eq!(cache.cached_ranges().collect::<Vec<_>>(), vec![None]);

        cache.sums(&dataset, None);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn counties_without_rows_have_no_sum() {
        let dataset = fixtures::dataset();
        let mut cache = RangeSumCache::new();
        let alameda = RegionId::new(6001).unwrap();
        assert_eq!(cache.sums(&dataset, None)[&alameda], None);
    }
}
