//! # Output records
//!
//! [`TreeRecord`] is the enriched tree written to the output table. Its field order is the
//! column order of the CSV; absent values are written as empty fields and dates as
//! `YYYY-MM-DD`.
use std::{fmt, fs, fs::File, io::Write};

use camino::Utf8Path;
use chrono::NaiveDate;
use csv::Writer;
use log::info;
use serde::Serialize;

use crate::{
    config::PipelineConfig,
    constants::{Degree, Meter, TreeId, Years},
    growth_metrics::{
        age_years, co2_sequestration, current_dbh, estimate_value, harvest_dates,
        observed_dbh_growth_rate, observed_height_growth_rate, standard_dbh_growth_rate,
        standard_height_growth_rate,
    },
    treemetrics_errors::TreeMetricsError,
    trees::TreePoint,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeRecord {
    #[serde(skip)]
    pub id: TreeId,
    pub longitude: Degree,
    pub latitude: Degree,
    pub species: String,
    pub plantation_date: NaiveDate,
    pub initial_height: Meter,
    pub age: Years,
    pub current_height: Option<Meter>,
    pub canopy_cover_percentage: Option<f64>,
    pub current_dbh: f64,
    pub standard_growth_rate_height: f64,
    pub observed_growth_rate_height: Option<f64>,
    pub standard_growth_rate_dbh: f64,
    pub observed_growth_rate_dbh: f64,
    pub first_harvest_date: Option<NaiveDate>,
    pub second_harvest_date: Option<NaiveDate>,
    pub current_estimated_value: f64,
    #[serde(rename = "current_CO2_sequestration")]
    pub current_co2_sequestration: f64,
    pub project_developer: String,
    pub update_date: NaiveDate,
}

/// Tree attribute that could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    CurrentHeight,
    CanopyCover,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::CurrentHeight => write!(f, "current_height"),
            Attribute::CanopyCover => write!(f, "canopy_cover_percentage"),
        }
    }
}

/// Non-fatal gap: the record is emitted with the field left empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MissingAttribute {
    pub tree_id: TreeId,
    pub field: Attribute,
}

impl fmt::Display for MissingAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tree {} has no {}", self.tree_id, self.field)
    }
}

/// Build the output record of one tree.
///
/// Arguments
/// -----------------
/// * `point`: The input tree.
/// * `height`: Sampled canopy height, if any.
/// * `cover`: Canopy cover percentage of the tree's grid cell, if any.
/// * `config`: Species, value bounds and as-of date.
///
/// Return
/// ----------
/// * The record; the observed height rate is empty when the height is.
pub fn assemble(
    point: &TreePoint,
    height: Option<Meter>,
    cover: Option<f64>,
    config: &PipelineConfig,
) -> TreeRecord {
    let age = age_years(point.plantation_date, config.update_date);
    let dbh = current_dbh(age);
    let (first_harvest_date, second_harvest_date) = harvest_dates(point.plantation_date);

    TreeRecord {
        id: point.id,
        longitude: point.longitude,
        latitude: point.latitude,
        species: config.species.clone(),
        plantation_date: point.plantation_date,
        initial_height: point.initial_height,
        age,
        current_height: height,
        canopy_cover_percentage: cover,
        current_dbh: dbh,
        standard_growth_rate_height: standard_height_growth_rate(),
        observed_growth_rate_height: height.map(|h| observed_height_growth_rate(h, age)),
        standard_growth_rate_dbh: standard_dbh_growth_rate(),
        observed_growth_rate_dbh: observed_dbh_growth_rate(dbh, age),
        first_harvest_date,
        second_harvest_date,
        current_estimated_value: estimate_value(age, config.initial_value, config.max_value),
        current_co2_sequestration: co2_sequestration(age),
        project_developer: point.project_developer.clone(),
        update_date: config.update_date,
    }
}

/// Serialize records as CSV, header first.
pub fn write_records<W: Write>(sink: W, records: &[TreeRecord]) -> Result<(), TreeMetricsError> {
    let mut writer = Writer::from_writer(sink);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write records to the CSV file at `path`, creating its parent directory if needed.
pub fn write_records_csv(path: &Utf8Path, records: &[TreeRecord]) -> Result<(), TreeMetricsError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    write_records(File::create(path)?, records)?;
    info!("Wrote {} records to {path}", records.len());
    Ok(())
}

#[cfg(test)]
mod records_test {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig::builder()
            .update_date(NaiveDate::from_ymd_opt(2025, 9, 15).unwrap())
            .build()
            .unwrap()
    }

    fn point() -> TreePoint {
        TreePoint {
            id: 7,
            longitude: 2.35,
            latitude: 48.85,
            plantation_date: NaiveDate::from_ymd_opt(2023, 9, 15).unwrap(),
            initial_height: 2.0,
            project_developer: "EcoTree Solution".into(),
        }
    }

    #[test]
    fn test_assemble_two_year_old_tree() {
        let r = assemble(&point(), Some(5.0), Some(42.5), &config());
        assert_eq!(r.id, 7);
        assert_eq!(r.age, 2.0);
        assert_eq!(r.current_dbh, 3.0);
        assert_eq!(r.observed_growth_rate_height, Some(2.5));
        assert_eq!(r.observed_growth_rate_dbh, 1.5);
        assert_eq!(r.current_estimated_value, 170.0);
        assert_eq!(r.current_co2_sequestration, 3.5);
        assert_eq!(r.first_harvest_date, NaiveDate::from_ymd_opt(2035, 9, 15));
        assert_eq!(r.species, "Paulownia");
    }

    #[test]
    fn test_missing_height_leaves_rate_empty() {
        let r = assemble(&point(), None, None, &config());
        assert_eq!(r.current_height, None);
        assert_eq!(r.observed_growth_rate_height, None);
        assert_eq!(r.canopy_cover_percentage, None);
    }

    #[test]
    fn test_csv_layout() {
        let r = assemble(&point(), None, Some(12.5), &config());
        let mut buf = Vec::new();
        write_records(&mut buf, &[r]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "longitude,latitude,species,plantation_date,initial_height,age,current_height,\
             canopy_cover_percentage,current_dbh,standard_growth_rate_height,\
             observed_growth_rate_height,standard_growth_rate_dbh,observed_growth_rate_dbh,\
             first_harvest_date,second_harvest_date,current_estimated_value,\
             current_CO2_sequestration,project_developer,update_date"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2.35,48.85,Paulownia,2023-09-15,2.0,2.0,,12.5,3.0,2.0,,2.5,1.5,\
             2035-09-15,2047-09-15,170.0,3.5,EcoTree Solution,2025-09-15"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_missing_attribute_display() {
        let gap = MissingAttribute {
            tree_id: 3,
            field: Attribute::CanopyCover,
        };
        assert_eq!(gap.to_string(), "tree 3 has no canopy_cover_percentage");
    }
}
