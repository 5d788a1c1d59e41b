//! # Constants and type definitions for treemetrics
//!
//! This module centralizes the **geodetic conversion factors**, the **fixed growth formulas
//! coefficients**, and the **common type aliases** used throughout the crate.
//!
//! ## Overview
//!
//! - Degree ↔ meter conversion used by the grid partitioner and the raster pixel areas
//! - Geometric tolerances (hull buffer, minimum retained cell area, clipping margin)
//! - Growth, value and carbon proxy coefficients
//! - Spectral band names used to build the vegetation index
//!
//! Tunables that vary per run (grid size, NDVI threshold, tree density, …) are **not** here:
//! they live in [`PipelineConfig`](crate::config::PipelineConfig).

// -------------------------------------------------------------------------------------------------
// Geodetic conversions
// -------------------------------------------------------------------------------------------------

/// Ground length of one degree of latitude (and of longitude at the equator), in meters
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Square meters in one hectare
pub const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;

/// Mean length of a calendar year in days, used for tree ages
pub const DAYS_PER_YEAR: f64 = 365.25;

// -------------------------------------------------------------------------------------------------
// Geometric tolerances
// -------------------------------------------------------------------------------------------------

/// Buffer applied around a collinear convex hull, in degrees
pub const DEGENERATE_HULL_BUFFER: Degree = 0.001;

/// Number of vertices used to approximate the buffer circle around each hull vertex
pub const HULL_BUFFER_SEGMENTS: usize = 16;

/// Hull area (square degrees) under which the hull is considered a line
pub const DEGENERATE_HULL_AREA: f64 = 1e-14;

/// Clipped grid cells with an area at or below this value are dropped
pub const MIN_CELL_AREA_M2: SquareMeter = 1.0;

/// Distance within which a tree outside a cell polygon still joins that cell
pub const JOIN_ERROR_MARGIN_M: Meter = 1.0;

// -------------------------------------------------------------------------------------------------
// Growth and valuation proxies
// -------------------------------------------------------------------------------------------------

/// Standard height growth for the years following plantation (m/year)
pub const STANDARD_HEIGHT_GROWTH: f64 = 2.0;

/// Standard DBH growth for the years following plantation (cm/year)
pub const STANDARD_DBH_GROWTH: f64 = 2.5;

/// DBH proxy: centimeters of diameter per year of age
pub const DBH_PER_YEAR: f64 = 1.5;

/// Value gained per year of age, in the currency of the initial value
pub const VALUE_PER_YEAR: f64 = 35.0;

/// CO2 sequestration proxy per year of age
pub const CO2_PER_YEAR: f64 = 1.75;

/// Rotation horizon of the first harvest, in years after plantation
pub const FIRST_HARVEST_YEARS: u32 = 12;

/// Rotation horizon of the second harvest, in years after plantation
pub const SECOND_HARVEST_YEARS: u32 = 24;

// -------------------------------------------------------------------------------------------------
// Spectral bands
// -------------------------------------------------------------------------------------------------

/// Near-infrared reflectance band
pub const NIR_BAND: &str = "B8";

/// Red reflectance band
pub const RED_BAND: &str = "B4";

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Distance in meters
pub type Meter = f64;
/// Area in square meters
pub type SquareMeter = f64;
/// Duration in (fractional) years
pub type Years = f64;
/// Stable tree identifier, assigned in input order
pub type TreeId = u32;
