//! # Canopy attribution
//!
//! Attaches the two remotely sensed attributes to the trees:
//!
//! * [`height`] – Canopy height at each tree, sampled in batches through the imagery client.
//! * [`cover`] – NDVI canopy mask of the most recent clear scene, aggregated per grid cell.
//! * [`join`] – Point to grid cell join carrying the cell cover percentage onto each tree.
pub mod cover;
pub mod height;
pub mod join;

pub use cover::{aggregate_cover, compute_vegetation_index, cover_per_cell, VegetationIndex};
pub use height::attach_canopy_height;
pub use join::{assign_cells, attach_canopy_cover};
