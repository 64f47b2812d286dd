//! The joined, read-only dataset every view computes from.

use std::collections::{BTreeMap, BTreeSet};

use outage_map_geography::RegionIndex;
use outage_map_geography_models::{CartogramTile, Region, RegionId, StateReference, fips};
use outage_map_outage_models::{AggregateKey, AggregatedMonth, MonthRange, OutageRecord, YearMonth};

use crate::aggregate::{aggregate_months, sum_in_range};
use crate::load::{RawBoundary, RawPopulation};
use crate::quality::DataQualityReport;
use crate::tiles::{StateMonthlyShares, build_tiles};

/// Parsed rows of the four input files, ready to join.
#[derive(Debug, Default)]
pub struct JoinInputs {
    pub boundaries: Vec<RawBoundary>,
    pub outages: Vec<OutageRecord>,
    pub population: Vec<RawPopulation>,
    pub states: Vec<StateReference>,
}

/// Counties, outage records and state references joined by region key.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    regions: BTreeMap<RegionId, Region>,
    records: BTreeMap<RegionId, Vec<OutageRecord>>,
    states: Vec<StateReference>,
    state_shares: StateMonthlyShares,
    index: RegionIndex,
    quality: DataQualityReport,
}

impl Dataset {
    /// Joins the parsed inputs.
    ///
    /// Join misses never fail; they leave the joined field `None` and are
    /// counted in `quality`.
    #[must_use]
    pub fn join(inputs: JoinInputs, mut quality: DataQualityReport) -> Self {
        let JoinInputs {
            boundaries,
            outages,
            population,
            mut states,
        } = inputs;

        let mut records: BTreeMap<RegionId, Vec<OutageRecord>> = BTreeMap::new();
        for record in outages {
            records.entry(record.region_id).or_default().push(record);
        }
        for rows in records.values_mut() {
            rows.sort_by_key(|r| r.period);
        }

        let mut population: BTreeMap<RegionId, RawPopulation> =
            population.into_iter().map(|p| (p.id, p)).collect();

        let mut regions = BTreeMap::new();
        let mut polygons = Vec::new();

        for boundary in boundaries {
            if regions.contains_key(&boundary.id) {
                log::debug!("Duplicate boundary feature for {}, keeping the first", boundary.id);
                continue;
            }

            let pop = population.remove(&boundary.id);
            if pop.is_none() {
                quality.regions_without_population.insert(boundary.id);
            }

            let rows = records.get(&boundary.id);
            if rows.is_none() {
                quality.regions_without_outages.insert(boundary.id);
            }

            let state_code = pop
                .as_ref()
                .and_then(|p| p.state_code.as_deref())
                .and_then(fips::by_abbr)
                .map_or_else(|| fips::state_abbr(boundary.id.state_fips()), |s| s.abbr)
                .to_string();

            let has_boundary = boundary.polygon.is_some();
            if let Some(polygon) = boundary.polygon {
                polygons.push((boundary.id, polygon));
            }

            regions.insert(
                boundary.id,
                Region {
                    id: boundary.id,
                    name: boundary.name,
                    state_name: boundary.state_name,
                    state_code,
                    population: pop.map(|p| p.series),
                    outage_total: rows.map(|r| r.iter().map(|r| r.outage_count).sum()),
                    customers_out_total: rows.map(|r| r.iter().map(|r| r.customers_out).sum()),
                    has_boundary,
                },
            );
        }

        quality.outages_without_region = records
            .keys()
            .filter(|id| !regions.contains_key(id))
            .copied()
            .collect();

        states.sort_by_key(|s| (s.grid_x, s.grid_y));
        let state_shares = state_monthly_shares(&records, &states, &mut quality);

        let index = RegionIndex::build(polygons);

        log::info!(
            "Joined {} counties ({} indexed), {} counties with outage rows, {} states",
            regions.len(),
            index.len(),
            records.len(),
            states.len(),
        );

        Self {
            regions,
            records,
            states,
            state_shares,
            index,
            quality,
        }
    }

    /// Every joined county.
    #[must_use]
    pub const fn regions(&self) -> &BTreeMap<RegionId, Region> {
        &self.regions
    }

    #[must_use]
    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(&id)
    }

    /// Outage records of one county, in month order.
    #[must_use]
    pub fn region_records(&self, id: RegionId) -> &[OutageRecord] {
        self.records.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Every outage record, including counties without a boundary.
    pub fn records(&self) -> impl Iterator<Item = &OutageRecord> {
        self.records.values().flatten()
    }

    /// Number of outage records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    /// State reference rows ordered by grid column, then row.
    #[must_use]
    pub fn states(&self) -> &[StateReference] {
        &self.states
    }

    #[must_use]
    pub const fn quality(&self) -> &DataQualityReport {
        &self.quality
    }

    #[must_use]
    pub const fn index(&self) -> &RegionIndex {
        &self.index
    }

    /// The county whose boundary contains the coordinate.
    #[must_use]
    pub fn locate(&self, lon: f64, lat: f64) -> Option<RegionId> {
        self.index.locate(lon, lat)
    }

    /// Counties whose state code is `state_code`.
    #[must_use]
    pub fn regions_in_state(&self, state_code: &str) -> BTreeSet<RegionId> {
        self.regions
            .values()
            .filter(|r| r.state_code == state_code)
            .map(|r| r.id)
            .collect()
    }

    /// First and last month with outage records.
    #[must_use]
    pub fn period(&self) -> Option<MonthRange> {
        let mut periods = self.records().map(|r| r.period);
        let first = periods.next()?;
        let (start, end) = periods.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some(MonthRange::ordered(start, end))
    }

    /// Monthly totals over `selection`, or over every record when the
    /// selection is empty.
    #[must_use]
    pub fn aggregate(&self, selection: &BTreeSet<RegionId>) -> Vec<AggregatedMonth> {
        if selection.is_empty() {
            return aggregate_months(self.records(), &AggregateKey::Global);
        }
        let key = if selection.len() == 1 {
            selection
                .first()
                .map_or(AggregateKey::Selection, |id| AggregateKey::Region(*id))
        } else {
            AggregateKey::Selection
        };
        aggregate_months(
            selection.iter().flat_map(|id| self.region_records(*id)),
            &key,
        )
    }

    /// Outage count of one county inside `range` (all time for `None`).
    ///
    /// `None` when the county has no outage rows at all.
    #[must_use]
    pub fn outage_sum(&self, id: RegionId, range: Option<MonthRange>) -> Option<u64> {
        self.records.get(&id).map(|rows| sum_in_range(rows, range))
    }

    /// Monthly affected share of one state.
    #[must_use]
    pub fn state_shares(&self, state_code: &str) -> Option<&BTreeMap<YearMonth, f64>> {
        self.state_shares.get(state_code)
    }

    /// Cartogram tiles for `range`, in grid order.
    #[must_use]
    pub fn tiles(&self, range: Option<MonthRange>) -> Vec<CartogramTile> {
        build_tiles(&self.states, &self.state_shares, range)
    }
}

/// Sums customers out per state and month and divides by the state's
/// reference population.
fn state_monthly_shares(
    records: &BTreeMap<RegionId, Vec<OutageRecord>>,
    states: &[StateReference],
    quality: &mut DataQualityReport,
) -> StateMonthlyShares {
    let totals: BTreeMap<&str, f64> = states
        .iter()
        .map(|s| (s.state_code.as_str(), s.total_population))
        .collect();

    let mut sums: BTreeMap<&'static str, BTreeMap<YearMonth, f64>> = BTreeMap::new();
    for (id, rows) in records {
        let code = fips::state_abbr(id.state_fips());
        if !totals.contains_key(code) {
            quality.states_without_reference.insert(code.to_string());
            continue;
        }
        let months = sums.entry(code).or_default();
        for row in rows {
            *months.entry(row.period).or_insert(0.0) += row.customers_out;
        }
    }

    sums.into_iter()
        .filter_map(|(code, months)| {
            let total = totals.get(code).copied().filter(|t| *t > 0.0)?;
            Some((
                code.to_string(),
                months.into_iter().map(|(p, v)| (p, v / total)).collect(),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::fixtures;

    use super::*;

    fn id(code: u32) -> RegionId {
        RegionId::new(code).unwrap()
    }

    #[test]
    fn join_misses_stay_unavailable() {
        let dataset = fixtures::dataset();

        let la = dataset.region(id(6037)).unwrap();
        assert!(la.population.is_some());
        assert_eq!(la.outage_total, Some(72));
        assert_eq!(la.state_code, "CA");

        let orphan = dataset.region(id(6001)).unwrap();
        assert!(orphan.population.is_none());
        assert!(dataset
            .quality()
            .regions_without_population
            .contains(&id(6001)));

        assert!(dataset.quality().outages_without_region.contains(&id(6999)));
        assert!(dataset.region(id(6999)).is_none());
    }

    #[test]
    fn empty_selection_aggregates_everything() {
        let dataset = fixtures::dataset();
        let all_ids: BTreeSet<RegionId> = dataset.records().map(|r| r.region_id).collect();

        let empty = dataset.aggregate(&BTreeSet::new());
        let full = dataset.aggregate(&all_ids);

        let totals = |months: &[AggregatedMonth]| {
            months
                .iter()
                .map(|m| (m.period, m.total_outage_count))
                .collect::<Vec<_>>()
        };
        assert_eq!(totals(&empty), totals(&full));
        assert_eq!(empty[0].key, AggregateKey::Global);
    }

    #[test]
    fn range_sum_and_all_time_sum() {
        let dataset = fixtures::dataset();
        let range =
            MonthRange::new("2021-03".parse().unwrap(), "2021-05".parse().unwrap()).unwrap();

        assert_eq!(dataset.outage_sum(id(6037), Some(range)), Some(60));
        assert!(dataset.outage_sum(id(6037), None).unwrap() >= 60);
        assert_eq!(dataset.outage_sum(id(6001), None), None);
    }

    #[test]
    fn state_shares_use_reference_population() {
        let dataset = fixtures::dataset();
        let ca = dataset.state_shares("CA").unwrap();
        let march = ca[&"2021-03".parse().unwrap()];
        assert!((march - 100.0 / 40_000.0).abs() < 1e-12);
        assert!(dataset.quality().states_without_reference.is_empty());
    }

    #[test]
    fn regions_in_state_and_locate() {
        let dataset = fixtures::dataset();
        let ca = dataset.regions_in_state("CA");
        assert_eq!(ca, [id(6001), id(6037)].into_iter().collect());
        assert_eq!(dataset.locate(0.5, 0.5), Some(id(6037)));
        assert_eq!(dataset.locate(50.0, 50.0), None);
    }
}
