//! Month-level aggregation of outage records.

use std::collections::{BTreeMap, BTreeSet};

use outage_map_outage_models::{AggregateKey, AggregatedMonth, MonthRange, OutageRecord, YearMonth};

/// Sums `outage_count` by month over `records`.
///
/// Every year that has at least one record yields exactly twelve entries in
/// month order; months without records are zero. Years with no records at
/// all are skipped rather than filled.
#[must_use]
pub fn aggregate_months<'a>(
    records: impl IntoIterator<Item = &'a OutageRecord>,
    key: &AggregateKey,
) -> Vec<AggregatedMonth> {
    let mut sums: BTreeMap<YearMonth, u64> = BTreeMap::new();
    let mut years = BTreeSet::new();

    for record in records {
        years.insert(record.year());
        *sums.entry(record.period).or_insert(0) += record.outage_count;
    }

    years
        .into_iter()
        .flat_map(|year| (1..=12).filter_map(move |month| YearMonth::new(year, month).ok()))
        .map(|period| AggregatedMonth {
            key: key.clone(),
            period,
            total_outage_count: sums.get(&period).copied().unwrap_or(0),
        })
        .collect()
}

/// Sums `outage_count` over the records inside `range`, or over all
/// records when `range` is `None`.
#[must_use]
pub fn sum_in_range<'a>(
    records: impl IntoIterator<Item = &'a OutageRecord>,
    range: Option<MonthRange>,
) -> u64 {
    records
        .into_iter()
        .filter(|r| range.is_none_or(|range| range.contains(r.period)))
        .map(|r| r.outage_count)
        .sum()
}

/// Mean of the monthly values inside `range`.
///
/// Falls back to the mean of every value when `range` is `None` or no
/// month falls inside it. Returns `None` for an empty series.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_in_range(series: &BTreeMap<YearMonth, f64>, range: Option<MonthRange>) -> Option<f64> {
    let mean = |values: Vec<f64>| {
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    };

    if let Some(range) = range {
        let within: Vec<f64> = series
            .range(range.start()..=range.end())
            .map(|(_, v)| *v)
            .collect();
        if let Some(value) = mean(within) {
            return Some(value);
        }
    }
    mean(series.values().copied().collect())
}

#[cfg(test)]
mod tests {
    use outage_map_geography_models::RegionId;

    use super::*;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    fn record(id: u32, period: &str, count: u64) -> OutageRecord {
        OutageRecord {
            region_id: RegionId::new(id).unwrap(),
            period: ym(period),
            outage_count: count,
            customers_out: 0.0,
        }
    }

    #[test]
    fn twelve_zero_filled_months_per_represented_year() {
        let records = vec![
            record(6037, "2019-02", 5),
            record(6001, "2019-02", 7),
            record(6037, "2021-11", 3),
        ];
        let months = aggregate_months(&records, &AggregateKey::Global);

        assert_eq!(months.len(), 24);
        assert!(months[..12].iter().all(|m| m.period.year() == 2019));
        assert!(months[12..].iter().all(|m| m.period.year() == 2021));
        let order: Vec<u32> = months[..12].iter().map(|m| m.period.month()).collect();
        assert_eq!(order, (1..=12).collect::<Vec<_>>());
        assert_eq!(months[1].total_outage_count, 12);
        assert_eq!(months[22].total_outage_count, 3);

        let total: u64 = months.iter().map(|m| m.total_outage_count).sum();
        let raw: u64 = records.iter().map(|r| r.outage_count).sum();
        assert_eq!(total, raw);
    }

    #[test]
    fn empty_input_aggregates_to_nothing() {
        assert!(aggregate_months(&[], &AggregateKey::Selection).is_empty());
    }

    #[test]
    fn filtered_sum_covers_inclusive_range() {
        let records = vec![
            record(6037, "2021-02", 4),
            record(6037, "2021-03", 10),
            record(6037, "2021-04", 20),
            record(6037, "2021-05", 30),
            record(6037, "2021-06", 8),
        ];
        let range = MonthRange::new(ym("2021-03"), ym("2021-05")).unwrap();

        assert_eq!(sum_in_range(&records, Some(range)), 60);
        assert_eq!(sum_in_range(&records, None), 72);
    }

    #[test]
    fn mean_falls_back_to_all_months() {
        let series: BTreeMap<YearMonth, f64> =
            [(ym("2020-01"), 0.2), (ym("2020-02"), 0.4), (ym("2020-03"), 0.9)]
                .into_iter()
                .collect();

        let inside = MonthRange::new(ym("2020-01"), ym("2020-02")).unwrap();
        assert!((mean_in_range(&series, Some(inside)).unwrap() - 0.3).abs() < 1e-12);

        let outside = MonthRange::single(ym("2024-01"));
        assert!((mean_in_range(&series, Some(outside)).unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(mean_in_range(&BTreeMap::new(), None), None);
    }
}
