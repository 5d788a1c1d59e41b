//! Point to grid cell lookup.
//!
//! Cell bounding boxes, grown by the join margin, go into an R-tree. A lookup collects the boxes
//! containing the point and tests the candidates in ascending cell index order:
//!
//! 1. the first cell whose polygon intersects the point (edges and corners included);
//! 2. otherwise the first cell whose polygon lies within the margin of the point.
//!
//! A point on the shared edge of two cells therefore resolves to the cell with the lowest index,
//! whatever order the tree returns candidates in. The margin absorbs the rounding of the clipped
//! boundary, so a tree on the region outline is never left without a cell.
use geo::{BoundingRect, Closest, ClosestPoint, Coord, HaversineDistance, Intersects, Point};
use rstar::{
    primitives::{GeomWithData, Rectangle},
    RTree,
};

use crate::{
    constants::{Meter, JOIN_ERROR_MARGIN_M, METERS_PER_DEGREE},
    grid::GridCell,
};

type CellBox = GeomWithData<Rectangle<[f64; 2]>, usize>;

pub struct CellIndex<'a> {
    cells: &'a [GridCell],
    tree: RTree<CellBox>,
    margin_m: Meter,
}

/// Ground distance between `p` and the closest point of `cell`, `None` if undefined.
fn distance_to_cell(cell: &GridCell, p: Point<f64>) -> Option<Meter> {
    match cell.polygon.closest_point(&p) {
        Closest::Intersection(_) => Some(0.0),
        Closest::SinglePoint(q) => Some(p.haversine_distance(&q)),
        Closest::Indeterminate => None,
    }
}

impl<'a> CellIndex<'a> {
    /// Index with the default [`JOIN_ERROR_MARGIN_M`] margin.
    pub fn new(cells: &'a [GridCell]) -> Self {
        Self::with_margin(cells, JOIN_ERROR_MARGIN_M)
    }

    pub fn with_margin(cells: &'a [GridCell], margin_m: Meter) -> Self {
        let margin_m = margin_m.max(0.0);
        let dlat = margin_m / METERS_PER_DEGREE;

        let boxes: Vec<CellBox> = cells
            .iter()
            .enumerate()
            .filter_map(|(pos, cell)| {
                let rect = cell.polygon.bounding_rect()?;
                let widest_lat = rect.min().y.abs().max(rect.max().y.abs());
                let dlon = dlat / widest_lat.to_radians().cos().max(f64::EPSILON);
                Some(GeomWithData::new(
                    Rectangle::from_corners(
                        [rect.min().x - dlon, rect.min().y - dlat],
                        [rect.max().x + dlon, rect.max().y + dlat],
                    ),
                    pos,
                ))
            })
            .collect();

        CellIndex {
            cells,
            tree: RTree::bulk_load(boxes),
            margin_m,
        }
    }

    /// The cell matched by `c`, if any (see the module documentation for the rules).
    pub fn locate(&self, c: Coord<f64>) -> Option<&'a GridCell> {
        let point = Point::from(c);
        let mut candidates: Vec<&'a GridCell> = self
            .tree
            .locate_all_at_point(&[c.x, c.y])
            .map(|b| &self.cells[b.data])
            .collect();
        candidates.sort_unstable_by_key(|cell| cell.index);

        candidates
            .iter()
            .copied()
            .find(|cell| cell.polygon.intersects(&point))
            .or_else(|| {
                candidates.iter().copied().find(|cell| {
                    distance_to_cell(cell, point).is_some_and(|d| d <= self.margin_m)
                })
            })
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
