//! # Trees: typed input points and their region of interest
//!
//! A run starts from a coordinate table (one row per tree) plus plantation metadata shared by
//! every tree of the plantation. [`extract_points`] validates the table and turns it into
//! [`TreePoint`]s with stable identifiers assigned in input order; [`roi::extract_roi`] derives the
//! convex region enclosing them.
//!
//! Modules
//! -----------------
//! * [`csv_reader`] – Reading the coordinate table from CSV.
//! * [`roi`] – Convex hull region of interest, with a buffer for collinear plantations.
use chrono::NaiveDate;
use geo::{Coord, Point};

use crate::{
    constants::{Degree, Meter, TreeId},
    treemetrics_errors::TreeMetricsError,
};

pub mod csv_reader;
pub mod roi;

pub use csv_reader::{read_coordinate_table, read_tree_csv, CoordinateRow};

/// One GPS-located tree of the plantation.
#[derive(Debug, Clone, PartialEq)]
pub struct TreePoint {
    pub id: TreeId,
    pub longitude: Degree,
    pub latitude: Degree,
    pub plantation_date: NaiveDate,
    pub initial_height: Meter,
    pub project_developer: String,
}

impl TreePoint {
    #[inline]
    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.longitude,
            y: self.latitude,
        }
    }

    #[inline]
    pub fn point(&self) -> Point<f64> {
        Point::from(self.coord())
    }
}

/// Turn a coordinate table into tree points.
///
/// Arguments
/// -----------------
/// * `table`: One row per tree, in input order.
/// * `initial_height`: Height at plantation, shared by every tree (meters, > 0).
/// * `plantation_date`: Plantation date, shared by every tree.
/// * `project_developer`: Free-text developer name.
///
/// Return
/// ----------
/// * The points with identifiers `0..n` in row order.
/// * [`TreeMetricsError::InputFormat`] if a coordinate is not finite or out of the geographic
///   range; the whole table is rejected.
/// * [`TreeMetricsError::InvalidParameter`] if `initial_height` is not a positive number.
pub fn extract_points(
    table: &[CoordinateRow],
    initial_height: Meter,
    plantation_date: NaiveDate,
    project_developer: &str,
) -> Result<Vec<TreePoint>, TreeMetricsError> {
    if !(initial_height > 0.0 && initial_height.is_finite()) {
        return Err(TreeMetricsError::InvalidParameter(format!(
            "initial height must be a positive number of meters, got {initial_height}"
        )));
    }
    let max_id = TreeId::MAX as usize;
    if table.len() > max_id {
        return Err(TreeMetricsError::InputFormat(format!(
            "{} rows exceed the supported maximum of {max_id} trees",
            table.len()
        )));
    }

    table
        .iter()
        .enumerate()
        .map(|(i, row)| {
            if !(row.longitude.is_finite() && (-180.0..=180.0).contains(&row.longitude)) {
                return Err(TreeMetricsError::InputFormat(format!(
                    "row {}: longitude {} outside [-180, 180]",
                    i + 1,
                    row.longitude
                )));
            }
            if !(row.latitude.is_finite() && (-90.0..=90.0).contains(&row.latitude)) {
                return Err(TreeMetricsError::InputFormat(format!(
                    "row {}: latitude {} outside [-90, 90]",
                    i + 1,
                    row.latitude
                )));
            }
            Ok(TreePoint {
                id: i as TreeId,
                longitude: row.longitude,
                latitude: row.latitude,
                plantation_date,
                initial_height,
                project_developer: project_developer.to_string(),
            })
        })
        .collect()
}
