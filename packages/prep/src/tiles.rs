//! Cartogram tiles derived from the state reference table.

use std::collections::BTreeMap;

use outage_map_geography_models::{CartogramTile, StateReference};
use outage_map_outage_models::{MonthRange, YearMonth};

use crate::aggregate::mean_in_range;

/// Monthly affected-population share per state code.
pub type StateMonthlyShares = BTreeMap<String, BTreeMap<YearMonth, f64>>;

/// Builds one tile per state reference row, in the order of `states`.
///
/// `affected_proportion` is the mean monthly share inside `range` (all
/// months when no month matches). States without monthly data fall back to
/// the reference table's own average.
#[must_use]
pub fn build_tiles(
    states: &[StateReference],
    shares: &StateMonthlyShares,
    range: Option<MonthRange>,
) -> Vec<CartogramTile> {
    states
        .iter()
        .map(|state| {
            let affected_proportion = shares
                .get(&state.state_code)
                .and_then(|series| mean_in_range(series, range))
                .unwrap_or_else(|| state.reference_affected_proportion());

            CartogramTile {
                state_code: state.state_code.clone(),
                grid_x: state.grid_x,
                grid_y: state.grid_y,
                affected_proportion,
                non_white_proportion: state.non_white_proportion(),
                pie_slices: state.demographics.pie_slices(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use outage_map_geography_models::{Demographics, RaceCategory};

    use super::*;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    fn state(code: &str, x: u32, y: u32) -> StateReference {
        StateReference {
            state_code: code.to_string(),
            state_name: None,
            grid_x: x,
            grid_y: y,
            total_population: 1000.0,
            average_customers_out: 50.0,
            white_population: 700.0,
            demographics: [(RaceCategory::Black, 300.0)].into_iter().collect::<Demographics>(),
        }
    }

    #[test]
    fn range_mean_with_reference_fallback() {
        let states = vec![state("CA", 0, 0), state("WA", 0, 1)];
        let mut shares = StateMonthlyShares::new();
        shares.insert(
            "CA".to_string(),
            [(ym("2021-01"), 0.1), (ym("2021-02"), 0.3)].into_iter().collect(),
        );

        let all = build_tiles(&states, &shares, None);
        assert!((all[0].affected_proportion - 0.2).abs() < 1e-12);
        assert!((all[1].affected_proportion - 0.05).abs() < 1e-12);

        let feb = build_tiles(&states, &shares, Some(MonthRange::single(ym("2021-02"))));
        assert!((feb[0].affected_proportion - 0.3).abs() < 1e-12);

        let outside = build_tiles(&states, &shares, Some(MonthRange::single(ym("2023-02"))));
        assert!((outside[0].affected_proportion - 0.2).abs() < 1e-12);
    }

    #[test]
    fn tiles_keep_fixed_pie_order() {
        let tiles = build_tiles(&[state("CA", 0, 0)], &StateMonthlyShares::new(), None);
        let order: Vec<RaceCategory> = tiles[0].pie_slices.iter().map(|s| s.category).collect();
        assert_eq!(order, RaceCategory::PIE_ORDER);
        assert!((tiles[0].non_white_proportion - 0.3).abs() < 1e-12);
    }
}
