//! Vegetation index, canopy mask and per-cell canopy cover.
//!
//! The index is the NDVI `(NIR - red) / (NIR + red)` of the selected scene, computed on the band
//! grid returned by the imagery client. Pixels strictly above the NDVI threshold are canopy.
//!
//! For a grid cell, the canopy area is the ground area of the canopy pixels whose centres fall in
//! the cell, capped at the cell area:
//!
//! ```text
//! canopy_area_m2          = min(Σ canopy pixel area, area_m2)
//! canopy_cover_percentage = canopy_area_m2 / area_m2 · 100
//! estimated_tree_count    = area_m2 / 10 000 · tree_density_per_ha
//! ```
use log::{debug, info};

use crate::{
    constants::{Meter, NIR_BAND, RED_BAND, SQUARE_METERS_PER_HECTARE},
    grid::{CanopyCover, GridCell},
    imagery::{select_scene, DateRange, ImageryClient, SceneInfo},
    raster::{index::normalized_difference, Raster},
    treemetrics_errors::TreeMetricsError,
    trees::roi::RegionOfInterest,
};

/// NDVI raster with the scene it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct VegetationIndex {
    pub scene: SceneInfo,
    pub ndvi: Raster,
}

/// Select the most recent clear scene over the region and compute its NDVI.
///
/// Arguments
/// -----------------
/// * `client`: Imagery source.
/// * `roi`: Region whose bounding box is searched and fetched.
/// * `range`: Accepted acquisition dates.
/// * `max_cloud_pct`: Scenes must be strictly less cloudy than this percentage.
/// * `resolution_m`: Ground sampling distance of the fetched bands.
///
/// Return
/// ----------
/// * The NDVI raster and its scene.
/// * [`TreeMetricsError::NoImageryAvailable`] when no scene passes the date and cloud filters.
pub fn compute_vegetation_index<C: ImageryClient>(
    client: &C,
    roi: &RegionOfInterest,
    range: &DateRange,
    max_cloud_pct: f64,
    resolution_m: Meter,
) -> Result<VegetationIndex, TreeMetricsError> {
    let bounds = roi.bounds();
    let scenes = client.search_scenes(&bounds, range)?;
    debug!("{} candidate scenes between {} and {}", scenes.len(), range.start, range.end);

    let scene = select_scene(&scenes, range, max_cloud_pct)
        .ok_or(TreeMetricsError::NoImageryAvailable {
            start: range.start,
            end: range.end,
            max_cloud_pct,
        })?
        .clone();
    info!(
        "Selected scene {} acquired {} ({:.1}% cloudy pixels)",
        scene.id, scene.acquired, scene.cloudy_pixel_percentage
    );

    let bands = client.fetch_bands(&scene, &bounds, &[NIR_BAND, RED_BAND], resolution_m)?;
    let ndvi = normalized_difference(bands.band(NIR_BAND)?, bands.band(RED_BAND)?)?;

    Ok(VegetationIndex { scene, ndvi })
}

/// Canopy statistics of one cell from a binary canopy mask.
pub fn aggregate_cover(mask: &Raster, cell: &GridCell, tree_density_per_ha: f64) -> CanopyCover {
    let summed = mask.sum_area_where(&cell.polygon, |v| v > 0.5);
    let canopy_area_m2 = summed.min(cell.area_m2);
    let canopy_cover_percentage = if cell.area_m2 > 0.0 {
        canopy_area_m2 / cell.area_m2 * 100.0
    } else {
        0.0
    };

    CanopyCover {
        canopy_area_m2,
        canopy_cover_percentage,
        estimated_tree_count: cell.area_m2 / SQUARE_METERS_PER_HECTARE * tree_density_per_ha,
    }
}

/// Fill [`GridCell::cover`] for every cell.
pub fn cover_per_cell(mask: &Raster, cells: &mut [GridCell], tree_density_per_ha: f64) {
    for cell in cells.iter_mut() {
        cell.cover = Some(aggregate_cover(mask, cell, tree_density_per_ha));
    }
    debug!("Canopy cover computed for {} cells", cells.len());
}
