//! # Pipeline configuration
//!
//! [`PipelineConfig`] gathers every per-run tunable of the canopy and growth pipeline. It is
//! built either from [`Default`] or through the validating fluent builder returned by
//! [`PipelineConfig::builder`].
//!
//! The fixed growth formulas (value slope, CO2 factor, harvest horizons, …) are not
//! configurable; see [`crate::constants`].
use std::fmt;

use chrono::{Days, Local, NaiveDate};

use crate::{
    constants::Meter,
    imagery::{retry::RetryPolicy, DateRange},
    treemetrics_errors::TreeMetricsError,
};

/// Length of the default imagery search window, ending at the update date.
const DEFAULT_IMAGERY_WINDOW_DAYS: u64 = 365;

/// Configuration of one pipeline run.
///
/// Defaults
/// -----------------
/// * `grid_size_m`: 100 m (≈ 1 ha cells)
/// * `ndvi_threshold`: 0.4
/// * `cover_resolution_m`: 10 m
/// * `height_resolution_m`: 1.2 m
/// * `tree_density_per_ha`: 400
/// * `max_cloud_pct`: 5 %
/// * `imagery_range`: `None`, i.e. the 365 days ending at `update_date`
/// * `batch_size`: 5000
/// * `species`: `"Paulownia"`
/// * `initial_value` / `max_value`: 100 / 500
/// * `update_date`: today (local time)
/// * `retry`: [`RetryPolicy::default`]
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    // --- Grid / canopy ---
    pub grid_size_m: Meter,
    pub ndvi_threshold: f64,
    pub cover_resolution_m: Meter,
    pub height_resolution_m: Meter,
    pub tree_density_per_ha: f64,

    // --- Scene selection ---
    pub max_cloud_pct: f64,
    pub imagery_range: Option<DateRange>,

    // --- Remote access ---
    pub batch_size: usize,
    pub retry: RetryPolicy,

    // --- Records ---
    pub species: String,
    pub initial_value: f64,
    pub max_value: f64,
    /// As-of date of the ages, written on every output row.
    pub update_date: NaiveDate,
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }

    /// Effective imagery search window.
    pub fn imagery_range(&self) -> DateRange {
        self.imagery_range.unwrap_or_else(|| {
            let start = self
                .update_date
                .checked_sub_days(Days::new(DEFAULT_IMAGERY_WINDOW_DAYS))
                .unwrap_or(NaiveDate::MIN);
            DateRange {
                start,
                end: self.update_date,
            }
        })
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            grid_size_m: 100.0,
            ndvi_threshold: 0.4,
            cover_resolution_m: 10.0,
            height_resolution_m: 1.2,
            tree_density_per_ha: 400.0,

            max_cloud_pct: 5.0,
            imagery_range: None,

            batch_size: 5000,
            retry: RetryPolicy::default(),

            species: "Paulownia".to_string(),
            initial_value: 100.0,
            max_value: 500.0,
            update_date: Local::now().date_naive(),
        }
    }
}

/// Builder for [`PipelineConfig`], with validation.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grid_size_m(mut self, v: Meter) -> Self {
        self.config.grid_size_m = v;
        self
    }

    pub fn ndvi_threshold(mut self, v: f64) -> Self {
        self.config.ndvi_threshold = v;
        self
    }

    pub fn cover_resolution_m(mut self, v: Meter) -> Self {
        self.config.cover_resolution_m = v;
        self
    }

    pub fn height_resolution_m(mut self, v: Meter) -> Self {
        self.config.height_resolution_m = v;
        self
    }

    pub fn tree_density_per_ha(mut self, v: f64) -> Self {
        self.config.tree_density_per_ha = v;
        self
    }

    pub fn max_cloud_pct(mut self, v: f64) -> Self {
        self.config.max_cloud_pct = v;
        self
    }

    pub fn imagery_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        // Validated in `build`, where a reversed range is reported.
        self.config.imagery_range = Some(DateRange { start, end });
        self
    }

    pub fn batch_size(mut self, v: usize) -> Self {
        self.config.batch_size = v;
        self
    }

    pub fn retry(mut self, v: RetryPolicy) -> Self {
        self.config.retry = v;
        self
    }

    pub fn species(mut self, v: impl Into<String>) -> Self {
        self.config.species = v.into();
        self
    }

    pub fn initial_value(mut self, v: f64) -> Self {
        self.config.initial_value = v;
        self
    }

    pub fn max_value(mut self, v: f64) -> Self {
        self.config.max_value = v;
        self
    }

    pub fn update_date(mut self, v: NaiveDate) -> Self {
        self.config.update_date = v;
        self
    }

    /// Finalize the builder.
    ///
    /// Validation rules
    /// -----------------
    /// * `grid_size_m`, `cover_resolution_m`, `height_resolution_m` > 0.
    /// * `tree_density_per_ha` ≥ 0 and `initial_value` ≥ 0.
    /// * `ndvi_threshold` ∈ [-1, 1], `max_cloud_pct` ∈ [0, 100].
    /// * `initial_value` ≤ `max_value`.
    /// * `batch_size` ≥ 1 and `retry.max_attempts` ≥ 1.
    /// * An explicit imagery range must not end before it starts.
    ///
    /// Return
    /// ----------
    /// * `Ok(PipelineConfig)`, or [`TreeMetricsError::InvalidParameter`] naming the first
    ///   rule that fails.
    pub fn build(self) -> Result<PipelineConfig, TreeMetricsError> {
        let c = &self.config;
        let invalid = |msg: &str| Err(TreeMetricsError::InvalidParameter(msg.to_string()));

        // NaN fails every range check below.
        if !(c.grid_size_m > 0.0) {
            return invalid("grid_size_m must be > 0");
        }
        if !(c.cover_resolution_m > 0.0 && c.height_resolution_m > 0.0) {
            return invalid("raster resolutions must be > 0");
        }
        if !(c.tree_density_per_ha >= 0.0) {
            return invalid("tree_density_per_ha must be >= 0");
        }
        if !(-1.0..=1.0).contains(&c.ndvi_threshold) {
            return invalid("ndvi_threshold must lie in [-1, 1]");
        }
        if !(0.0..=100.0).contains(&c.max_cloud_pct) {
            return invalid("max_cloud_pct must lie in [0, 100]");
        }
        if !(0.0..=c.max_value).contains(&c.initial_value) {
            return invalid("require 0 <= initial_value <= max_value");
        }
        if c.batch_size == 0 {
            return invalid("batch_size must be >= 1");
        }
        if c.retry.max_attempts == 0 {
            return invalid("retry.max_attempts must be >= 1");
        }
        if let Some(range) = c.imagery_range {
            DateRange::new(range.start, range.end)?;
        }

        Ok(self.config)
    }
}

impl fmt::Display for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let range = self.imagery_range();
        if f.alternate() {
            writeln!(f, "Pipeline configuration")?;
            writeln!(f, "----------------------")?;
            writeln!(f, "  grid_size_m         = {:.1}", self.grid_size_m)?;
            writeln!(f, "  ndvi_threshold      = {:.3}", self.ndvi_threshold)?;
            writeln!(f, "  cover_resolution_m  = {:.1}", self.cover_resolution_m)?;
            writeln!(f, "  height_resolution_m = {:.1}", self.height_resolution_m)?;
            writeln!(f, "  tree_density_per_ha = {:.0}", self.tree_density_per_ha)?;
            writeln!(f, "  max_cloud_pct       = {:.1}", self.max_cloud_pct)?;
            writeln!(f, "  imagery_range       = {} .. {}", range.start, range.end)?;
            writeln!(f, "  batch_size          = {}", self.batch_size)?;
            writeln!(f, "  species             = {}", self.species)?;
            writeln!(
                f,
                "  value               = {:.2} .. {:.2}",
                self.initial_value, self.max_value
            )?;
            write!(f, "  update_date         = {}", self.update_date)
        } else {
            write!(
                f,
                "grid={}m ndvi>{} cloud<{}% imagery={}..{} batch={} as_of={}",
                self.grid_size_m,
                self.ndvi_threshold,
                self.max_cloud_pct,
                range.start,
                range.end,
                self.batch_size,
                self.update_date
            )
        }
    }
}
