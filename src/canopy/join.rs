//! Spatial join of trees onto grid cells.
//!
//! Each tree is matched to the cell whose polygon intersects its location. Cells only touch
//! along edges, so a tree on an edge or a corner intersects several cells; it then takes the
//! cell with the lowest index. A tree outside every cell stays unmatched.
use crate::{
    grid::{spatial_index::CellIndex, GridCell},
    trees::TreePoint,
};

/// Index of the cell matched by each tree, in tree order.
pub fn assign_cells(points: &[TreePoint], cells: &[GridCell]) -> Vec<Option<usize>> {
    let index = CellIndex::new(cells);
    points
        .iter()
        .map(|p| index.locate(p.coord()).map(|cell| cell.index))
        .collect()
}

/// Canopy cover percentage of the cell matched by each tree, in tree order.
///
/// `None` when the tree matches no cell or the cell has no canopy statistics.
pub fn attach_canopy_cover(points: &[TreePoint], cells: &[GridCell]) -> Vec<Option<f64>> {
    let index = CellIndex::new(cells);
    points
        .iter()
        .map(|p| {
            index
                .locate(p.coord())
                .and_then(|cell| cell.cover)
                .map(|cover| cover.canopy_cover_percentage)
        })
        .collect()
}

#[cfg(test)]
mod join_test {
    use super::*;
    use crate::grid::CanopyCover;
    use chrono::NaiveDate;
    use geo::{polygon, MultiPolygon};

    fn square(index: usize, x0: f64, pct: Option<f64>) -> GridCell {
        let polygon: MultiPolygon<f64> = polygon![
            (x: x0, y: 0.0),
            (x: x0 + 1.0, y: 0.0),
            (x: x0 + 1.0, y: 1.0),
            (x: x0, y: 1.0),
        ]
        .into();
        GridCell {
            index,
            polygon,
            area_m2: 1.0e10,
            cover: pct.map(|p| CanopyCover {
                canopy_area_m2: 0.0,
                canopy_cover_percentage: p,
                estimated_tree_count: 0.0,
            }),
        }
    }

    fn tree(id: u32, longitude: f64, latitude: f64) -> TreePoint {
        TreePoint {
            id,
            longitude,
            latitude,
            plantation_date: NaiveDate::from_ymd_opt(2023, 9, 15).unwrap(),
            initial_height: 2.0,
            project_developer: "Dev".into(),
        }
    }

    #[test]
    fn test_edge_tie_goes_to_lowest_index() {
        // listed out of index order on purpose
        let cells = vec![square(1, 1.0, Some(80.0)), square(0, 0.0, Some(20.0))];
        let trees = vec![tree(0, 1.0, 0.5), tree(1, 1.5, 0.5), tree(2, 5.0, 0.5)];

        assert_eq!(assign_cells(&trees, &cells), vec![Some(0), Some(1), None]);
        assert_eq!(
            attach_canopy_cover(&trees, &cells),
            vec![Some(20.0), Some(80.0), None]
        );
    }

    #[test]
    fn test_cell_without_statistics() {
        let cells = vec![square(0, 0.0, None)];
        assert_eq!(attach_canopy_cover(&[tree(0, 0.5, 0.5)], &cells), vec![None]);
    }

    #[test]
    fn test_join_is_deterministic() {
        let cells = vec![square(0, 0.0, Some(1.0)), square(1, 1.0, Some(2.0))];
        let trees: Vec<TreePoint> = (0..50)
            .map(|i| tree(i, i as f64 * 0.04, 0.5))
            .collect();
        let first = assign_cells(&trees, &cells);
        let second = assign_cells(&trees, &cells);
        assert_eq!(first, second);
    }
}
