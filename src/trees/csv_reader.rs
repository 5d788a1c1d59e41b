//! Reading the tree coordinate table.
//!
//! The table needs at least numeric `longitude` and `latitude` columns; any other column is
//! ignored. A missing column or a row that does not parse rejects the whole table with
//! [`TreeMetricsError::InputFormat`].
use std::{fs::File, io::Read};

use camino::Utf8Path;
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use log::info;
use serde::Deserialize;

use crate::{
    constants::{Degree, Meter},
    trees::{extract_points, TreePoint},
    treemetrics_errors::TreeMetricsError,
};

const REQUIRED_COLUMNS: [&str; 2] = ["longitude", "latitude"];

/// One row of the coordinate table.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CoordinateRow {
    pub longitude: Degree,
    pub latitude: Degree,
}

/// Parse a coordinate table from any CSV source.
pub fn read_coordinate_table<R: Read>(source: R) -> Result<Vec<CoordinateRow>, TreeMetricsError> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(source);

    let headers = reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(TreeMetricsError::InputFormat(format!(
                "missing required column '{column}'"
            )));
        }
    }

    reader
        .deserialize::<CoordinateRow>()
        .enumerate()
        .map(|(i, row)| {
            row.map_err(|e| TreeMetricsError::InputFormat(format!("row {}: {e}", i + 1)))
        })
        .collect()
}

/// Read the tree CSV at `path` and build the tree points.
///
/// See [`extract_points`] for the shared plantation metadata and the validation rules.
pub fn read_tree_csv(
    path: &Utf8Path,
    initial_height: Meter,
    plantation_date: NaiveDate,
    project_developer: &str,
) -> Result<Vec<TreePoint>, TreeMetricsError> {
    let file = File::open(path)?;
    let table = read_coordinate_table(file)?;
    info!("Read {} tree coordinates from {path}", table.len());
    extract_points(&table, initial_height, plantation_date, project_developer)
}
