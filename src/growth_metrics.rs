//! # Growth, value and carbon proxies
//!
//! Pure scalar formulas applied to every tree once its age is known. Ages are fractional years
//! `(as_of − plantation).days / 365.25` rounded to 2 decimals. A plantation date after the as-of
//! date gives a negative age; the formulas accept it and every observed rate falls back to 0.
//!
//! | quantity                   | formula                                    |
//! |----------------------------|--------------------------------------------|
//! | current DBH (cm)           | `age · 1.5`                                |
//! | standard height growth     | `2.00` m/year                              |
//! | standard DBH growth        | `2.50` cm/year                             |
//! | observed growth            | `round(x / age, 2)` if `age > 0`, else `0` |
//! | estimated value            | `clamp(iv + 35 · age, iv, mv)`, 2 decimals |
//! | CO2 sequestration          | `age · 1.75`                               |
//! | harvests                   | plantation + 12 years, + 24 years          |
use chrono::{Months, NaiveDate};

use crate::constants::{
    Years, CO2_PER_YEAR, DAYS_PER_YEAR, DBH_PER_YEAR, FIRST_HARVEST_YEARS, SECOND_HARVEST_YEARS,
    STANDARD_DBH_GROWTH, STANDARD_HEIGHT_GROWTH, VALUE_PER_YEAR,
};

/// Round half away from zero to 2 decimals.
#[inline]
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn age_years(plantation_date: NaiveDate, as_of: NaiveDate) -> Years {
    let days = (as_of - plantation_date).num_days() as f64;
    round2(days / DAYS_PER_YEAR)
}

#[inline]
pub fn standard_height_growth_rate() -> f64 {
    STANDARD_HEIGHT_GROWTH
}

#[inline]
pub fn standard_dbh_growth_rate() -> f64 {
    STANDARD_DBH_GROWTH
}

fn observed_rate(quantity: f64, age: Years) -> f64 {
    if age > 0.0 {
        round2(quantity / age)
    } else {
        0.0
    }
}

/// Observed height growth rate (m/year), `0` for a non-positive age.
pub fn observed_height_growth_rate(height: f64, age: Years) -> f64 {
    observed_rate(height, age)
}

/// Observed DBH growth rate (cm/year), `0` for a non-positive age.
pub fn observed_dbh_growth_rate(dbh: f64, age: Years) -> f64 {
    observed_rate(dbh, age)
}

#[inline]
pub fn current_dbh(age: Years) -> f64 {
    age * DBH_PER_YEAR
}

/// Linear value ramp clamped to `[initial_value, max_value]`.
///
/// `age == 0` returns `initial_value` unchanged.
pub fn estimate_value(age: Years, initial_value: f64, max_value: f64) -> f64 {
    if age == 0.0 {
        return initial_value;
    }
    let value = (initial_value + age * VALUE_PER_YEAR)
        .max(initial_value)
        .min(max_value);
    round2(value)
}

#[inline]
pub fn co2_sequestration(age: Years) -> f64 {
    age * CO2_PER_YEAR
}

/// Add whole calendar years; February 29 becomes February 28 in a non-leap target year.
pub fn add_years(date: NaiveDate, years: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(12 * years))
}

/// First and second harvest dates after `plantation_date`.
pub fn harvest_dates(plantation_date: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
    (
        add_years(plantation_date, FIRST_HARVEST_YEARS),
        add_years(plantation_date, SECOND_HARVEST_YEARS),
    )
}

#[cfg(test)]
mod growth_metrics_test {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age() {
        let d = date(2023, 9, 15);
        assert_eq!(age_years(d, d), 0.0);
        assert_eq!(age_years(d, date(2024, 9, 15)), 1.0);
        // 731 days
        assert_eq!(age_years(date(2022, 9, 15), date(2024, 9, 15)), 2.0);
        assert_eq!(age_years(date(2024, 1, 1), date(2023, 1, 1)), -1.0);
    }

    #[test]
    fn test_observed_rates_without_age() {
        for age in [0.0, -0.5, -3.0] {
            assert_eq!(observed_height_growth_rate(4.0, age), 0.0);
            assert_eq!(observed_dbh_growth_rate(4.0, age), 0.0);
        }
        assert_eq!(observed_height_growth_rate(5.0, 3.0), 1.67);
        assert_eq!(observed_dbh_growth_rate(current_dbh(2.0), 2.0), 1.5);
    }

    #[test]
    fn test_value_ramp() {
        assert_eq!(estimate_value(0.0, 100.0, 500.0), 100.0);
        assert_eq!(estimate_value(2.0, 100.0, 500.0), 170.0);
        assert_eq!(estimate_value(50.0, 100.0, 500.0), 500.0);
        assert_eq!(estimate_value(-2.0, 100.0, 500.0), 100.0);

        let mut last = estimate_value(-5.0, 123.4, 321.0);
        for k in -40..400 {
            let v = estimate_value(k as f64 * 0.05, 123.4, 321.0);
            assert!(v >= last);
            assert!((123.4..=321.0).contains(&v));
            last = v;
        }
    }

    #[test]
    fn test_fixed_proxies() {
        assert_eq!(standard_height_growth_rate(), 2.0);
        assert_eq!(standard_dbh_growth_rate(), 2.5);
        assert_relative_eq!(current_dbh(2.0), 3.0);
        assert_relative_eq!(co2_sequestration(2.0), 3.5);
    }

    #[test]
    fn test_harvest_dates() {
        let (first, second) = harvest_dates(date(2023, 9, 15));
        assert_eq!(first, Some(date(2035, 9, 15)));
        assert_eq!(second, Some(date(2047, 9, 15)));

        let (first, second) = harvest_dates(date(2024, 2, 29));
        assert_eq!(first, Some(date(2036, 2, 29)));
        assert_eq!(add_years(date(2024, 2, 29), 1), Some(date(2025, 2, 28)));
        assert_eq!(second, Some(date(2048, 2, 29)));
    }
}
