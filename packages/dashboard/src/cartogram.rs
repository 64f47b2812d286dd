//! State tile grid sized by affected share, with a demographic pie per
//! tile.

use std::f64::consts::TAU;

use outage_map_dashboard_models::scene::{CartogramScene, PieArc, TileMark};
use outage_map_dashboard_models::{DashboardEvent, SelectionState};
use outage_map_geography_models::{CartogramTile, PieSlice};

use crate::colour::{DivergingScale, OrdinalScale, Rgb};
use crate::config::{CartogramConfig, DashboardConfig};
use crate::scale::ContinuousScale;

/// A tile's grid position and pixel size, the input of [`layout`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub grid_x: u32,
    pub grid_y: u32,
    pub size: f64,
}

/// Pixel origins `(x, y)` for cells ordered by column, then row.
///
/// Columns are packed left to right, each as wide as its largest tile,
/// and narrower tiles are centred in their column. Inside a column a tile
/// that sits directly below its upper neighbour is stacked under it;
/// otherwise it is placed at `grid_y * spacing`.
#[must_use]
pub fn layout(cells: &[GridCell], spacing: f64) -> Vec<(f64, f64)> {
    let mut origins = Vec::with_capacity(cells.len());

    let mut column_left = 0.0;
    let mut column_start = 0;
    while column_start < cells.len() {
        let grid_x = cells[column_start].grid_x;
        let column_end = cells[column_start..]
            .iter()
            .position(|c| c.grid_x != grid_x)
            .map_or(cells.len(), |n| column_start + n);
        let column = &cells[column_start..column_end];
        let width = column.iter().map(|c| c.size).fold(0.0, f64::max);

        let mut previous: Option<(GridCell, f64)> = None;
        for cell in column {
            let y = match previous {
                Some((above, above_y)) if above.grid_y + 1 == cell.grid_y => above_y + above.size,
                _ => f64::from(cell.grid_y) * spacing,
            };
            origins.push((column_left + (width - cell.size) / 2.0, y));
            previous = Some((*cell, y));
        }

        column_left += width;
        column_start = column_end;
    }

    origins
}

/// Pie arcs over the full circle, in slice order. A pie without any
/// population has every arc empty.
fn pie_arcs(slices: &[PieSlice], colours: &OrdinalScale, fallback: Rgb) -> Vec<PieArc> {
    let total: f64 = slices.iter().map(|s| s.value.max(0.0)).sum();
    let mut angle = 0.0;
    slices
        .iter()
        .map(|slice| {
            let sweep = if total > 0.0 {
                slice.value.max(0.0) / total * TAU
            } else {
                0.0
            };
            let start_angle = angle;
            angle += sweep;
            PieArc {
                category: slice.category,
                value: slice.value,
                start_angle,
                end_angle: angle,
                colour: colours
                    .colour(slice.category.as_ref())
                    .unwrap_or(fallback)
                    .to_string(),
            }
        })
        .collect()
}

#[derive(Debug)]
pub struct CartogramView {
    config: CartogramConfig,
    colours: OrdinalScale,
    scene: Option<CartogramScene>,
}

impl CartogramView {
    #[must_use]
    pub fn new(config: CartogramConfig) -> Self {
        let colours = OrdinalScale::new(DashboardConfig::race_domain(), &config.race_palette);
        Self {
            config,
            colours,
            scene: None,
        }
    }

    #[must_use]
    pub const fn scene(&self) -> Option<&CartogramScene> {
        self.scene.as_ref()
    }

    /// Only a range change alters the tiles.
    pub fn on_event(&mut self, event: &DashboardEvent) {
        if matches!(event, DashboardEvent::TimeRangeChanged(_)) {
            self.scene = None;
        }
    }

    /// Sizes, colours and lays out `tiles`, which must be ordered by grid
    /// column, then row.
    pub fn render(
        &mut self,
        tiles: &[CartogramTile],
        selection: &SelectionState,
    ) -> &CartogramScene {
        let config = &self.config;
        let domain = tiles
            .iter()
            .map(|t| t.affected_proportion)
            .fold(None, |acc: Option<(f64, f64)>, v| {
                Some(acc.map_or((v, v), |(lo, hi)| (lo.min(v), hi.max(v))))
            })
            .unwrap_or((0.0, 0.0));
        let size = ContinuousScale::new(
            config.size_scale,
            domain,
            (config.min_square_size, config.max_square_size),
        );
        let fill = DivergingScale::new(
            (0.0, config.diverging_midpoint, 1.0),
            config.colour_low,
            config.colour_mid,
            config.colour_high,
        );

        let cells: Vec<GridCell> = tiles
            .iter()
            .map(|t| GridCell {
                grid_x: t.grid_x,
                grid_y: t.grid_y,
                size: size.apply(t.affected_proportion),
            })
            .collect();
        let origins = layout(&cells, config.square_spacing);

        let marks = tiles
            .iter()
            .zip(cells.iter().zip(origins))
            .map(|(tile, (cell, (x, y)))| TileMark {
                state_code: tile.state_code.clone(),
                grid_x: tile.grid_x,
                grid_y: tile.grid_y,
                x,
                y,
                size: cell.size,
                fill: fill.colour(tile.non_white_proportion).to_string(),
                affected_proportion: tile.affected_proportion,
                non_white_proportion: tile.non_white_proportion,
                pie_radius: config.pie_radius(),
                arcs: pie_arcs(&tile.pie_slices, &self.colours, config.colour_mid),
            })
            .collect::<Vec<_>>();

        log::debug!("Cartogram: {} tiles", marks.len());

        self.scene.insert(CartogramScene {
            range: selection.selected_date_range,
            tiles: marks,
        })
    }
}

#[cfg(test)]
mod tests {
    use outage_map_geography_models::RaceCategory;
    use outage_map_outage_models::MonthRange;
    use outage_map_prep::fixtures;

    use super::*;

    fn cell(grid_x: u32, grid_y: u32, size: f64) -> GridCell {
        GridCell {
            grid_x,
            grid_y,
            size,
        }
    }

    #[test]
    fn narrower_tile_is_centred_in_its_column() {
        let origins = layout(&[cell(0, 0, 100.0), cell(0, 1, 140.0)], 80.0);
        assert!((origins[0].0 - 20.0).abs() < 1e-9);
        assert!((origins[1].0).abs() < 1e-9);
    }

    #[test]
    fn adjacent_rows_stack_and_gaps_use_spacing() {
        let origins = layout(
            &[
                cell(0, 1, 100.0),
                cell(0, 2, 120.0),
                cell(0, 5, 100.0),
                cell(1, 3, 90.0),
            ],
            80.0,
        );
        assert_eq!(origins[0].1, 80.0);
        assert_eq!(origins[1].1, 180.0);
        assert_eq!(origins[2].1, 400.0);
        // Second column starts after the widest tile of the first.
        assert_eq!(origins[3], (120.0, 240.0));
    }

    #[test]
    fn equal_shares_map_to_middle_size() {
        let tiles = fixtures::dataset().tiles(None);
        let flat: Vec<CartogramTile> = tiles
            .into_iter()
            .map(|mut t| {
                t.affected_proportion = 0.01;
                t
            })
            .collect();
        let mut view = CartogramView::new(CartogramConfig::default());
        let scene = view.render(&flat, &SelectionState::default());
        assert!(scene.tiles.iter().all(|t| (t.size - 110.0).abs() < 1e-9));
    }

    #[test]
    fn pies_follow_fixed_order() {
        let dataset = fixtures::dataset();
        let mut view = CartogramView::new(CartogramConfig::default());
        let scene = view.render(&dataset.tiles(None), &SelectionState::default());

        let ca = scene.tile("CA").unwrap();
        let order: Vec<RaceCategory> = ca.arcs.iter().map(|a| a.category).collect();
        assert_eq!(order, RaceCategory::PIE_ORDER);
        assert!(ca.arcs[0].start_angle.abs() < 1e-12);
        assert!((ca.arcs[5].end_angle - TAU).abs() < 1e-9);
        // other = 4000 of 20000 non-white.
        assert!((ca.arcs[0].end_angle - TAU / 5.0).abs() < 1e-9);
        assert_eq!(ca.arcs[0].colour, "#e15759");
        assert!((ca.pie_radius - 28.0).abs() < 1e-9);
        assert_eq!(ca.fill, "#f7f7f7");
    }

    #[test]
    fn empty_pies_have_no_sweep() {
        let slices: Vec<PieSlice> = RaceCategory::PIE_ORDER
            .iter()
            .map(|c| PieSlice {
                category: *c,
                value: 0.0,
            })
            .collect();
        let view = CartogramView::new(CartogramConfig::default());
        let arcs = pie_arcs(&slices, &view.colours, view.config.colour_mid);
        assert!(arcs.iter().all(|a| a.start_angle == 0.0 && a.end_angle == 0.0));
    }

    #[test]
    fn range_change_resizes_tiles() {
        let dataset = fixtures::dataset();
        let mut view = CartogramView::new(CartogramConfig::default());
        let all_time = view
            .render(&dataset.tiles(None), &SelectionState::default())
            .clone();

        view.on_event(&DashboardEvent::TimeRangeChanged(None));
        assert!(view.scene().is_none());

        let range = MonthRange::single("2020-01".parse().unwrap());
        let selection = SelectionState {
            selected_date_range: Some(range),
            ..SelectionState::default()
        };
        let scene = view.render(&dataset.tiles(Some(range)), &selection);
        assert_eq!(scene.range, Some(range));
        assert_ne!(scene.tiles, all_time.tiles);
    }
}
