//! # Grid partitioning of the region of interest
//!
//! The region is tiled into cells of roughly `cell_size × cell_size` meters on the ground
//! (100 m gives ≈ 1 ha), each clipped to the region boundary.
//!
//! Geographic to metric steps
//! -----------------
//! ```text
//! lat_step = cell_size / 111 320
//! lon_step = cell_size / (111 320 · cos(lat_min))
//! ```
//! where `lat_min` is the southern edge of the region's bounding box. The grid has
//! `ceil(width / lon_step) × ceil(height / lat_step)` tiles, generated column by column (west to
//! east, then south to north inside a column).
//!
//! Clipping
//! -----------------
//! Each tile is intersected exactly with the region and its geodesic area is measured. Cells of
//! [`MIN_CELL_AREA_M2`] or less are dropped; the kept cells are indexed `0..n` in generation
//! order. The clipped polygons keep every hull vertex, so the trees on the region boundary stay
//! on a cell boundary.
//!
//! See also
//! ------------
//! * [`spatial_index::CellIndex`] – Point to cell lookup used by the canopy cover join.
//! * [`crate::canopy::cover`] – Fills [`GridCell::cover`].
use geo::{BooleanOps, Coord, GeodesicArea, MultiPolygon, Rect};
use log::{debug, info};

use crate::{
    constants::{Meter, SquareMeter, METERS_PER_DEGREE, MIN_CELL_AREA_M2},
    treemetrics_errors::TreeMetricsError,
    trees::roi::RegionOfInterest,
};

pub mod spatial_index;

/// Canopy statistics of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanopyCover {
    /// Canopy pixel area inside the cell, capped at the cell area (m²).
    pub canopy_area_m2: SquareMeter,
    /// `canopy_area_m2 / area_m2 · 100`, in `[0, 100]`.
    pub canopy_cover_percentage: f64,
    /// Cell area in hectares times the configured tree density.
    pub estimated_tree_count: f64,
}

/// One clipped cell of the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    pub index: usize,
    pub polygon: MultiPolygon<f64>,
    /// Geodesic area of the clipped polygon (m²), always > [`MIN_CELL_AREA_M2`].
    pub area_m2: SquareMeter,
    /// Set once by the canopy aggregation.
    pub cover: Option<CanopyCover>,
}

/// Degree steps of a `cell_size_m` cell at latitude `lat_min`.
pub fn degree_steps(cell_size_m: Meter, lat_min: f64) -> Result<(f64, f64), TreeMetricsError> {
    if !(cell_size_m > 0.0 && cell_size_m.is_finite()) {
        return Err(TreeMetricsError::InvalidParameter(format!(
            "grid cell size must be a positive number of meters, got {cell_size_m}"
        )));
    }
    let cos_lat = lat_min.to_radians().cos();
    if cos_lat <= f64::EPSILON {
        return Err(TreeMetricsError::InvalidParameter(
            "cannot partition a region touching a pole".into(),
        ));
    }
    let lat_step = cell_size_m / METERS_PER_DEGREE;
    let lon_step = cell_size_m / (METERS_PER_DEGREE * cos_lat);
    Ok((lon_step, lat_step))
}

/// Partition the region of interest into clipped cells.
///
/// Arguments
/// -----------------
/// * `roi`: The plantation region.
/// * `cell_size_m`: Ground size of a tile side, in meters.
///
/// Return
/// ----------
/// * The kept cells, in generation order, without canopy statistics.
/// * [`TreeMetricsError::InvalidParameter`] if `cell_size_m` is not positive.
pub fn build_grid(
    roi: &RegionOfInterest,
    cell_size_m: Meter,
) -> Result<Vec<GridCell>, TreeMetricsError> {
    let bounds = roi.bounds();
    let (lon_step, lat_step) = degree_steps(cell_size_m, bounds.min().y)?;

    let n_lon = ((bounds.width() / lon_step).ceil() as usize).max(1);
    let n_lat = ((bounds.height() / lat_step).ceil() as usize).max(1);
    info!("Grid of {n_lon} x {n_lat} cells of {cell_size_m} m");

    let mut cells = Vec::new();
    let mut dropped = 0usize;

    for i in 0..n_lon {
        let west = bounds.min().x + i as f64 * lon_step;
        for j in 0..n_lat {
            let south = bounds.min().y + j as f64 * lat_step;
            let tile = Rect::new(
                Coord { x: west, y: south },
                Coord {
                    x: west + lon_step,
                    y: south + lat_step,
                },
            )
            .to_polygon();

            let clipped = tile.intersection(&roi.polygon);
            let area_m2 = clipped.geodesic_area_unsigned();
            if area_m2 > MIN_CELL_AREA_M2 {
                cells.push(GridCell {
                    index: cells.len(),
                    polygon: clipped,
                    area_m2,
                    cover: None,
                });
            } else {
                dropped += 1;
            }
        }
    }

    debug!("Kept {} cells, dropped {dropped} edge slivers", cells.len());
    Ok(cells)
}
