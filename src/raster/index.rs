//! Vegetation index and canopy mask rasters.
use crate::{raster::Raster, treemetrics_errors::TreeMetricsError};

/// Normalized difference `(a - b) / (a + b)` of two rasters on the same grid.
///
/// With `a` the near-infrared band and `b` the red band this is the NDVI. Pixels where either
/// input is no-data, or where `a + b == 0`, are no-data (`NaN`) in the result.
pub fn normalized_difference(a: &Raster, b: &Raster) -> Result<Raster, TreeMetricsError> {
    a.zip_with(b, |x, y| {
        let sum = x + y;
        if sum == 0.0 {
            f64::NAN
        } else {
            (x - y) / sum
        }
    })
}

/// Binary mask: `1.0` where the index is strictly above `threshold`, `0.0` elsewhere.
///
/// No-data pixels stay no-data so they never count as canopy nor as bare ground.
pub fn binarize(index: &Raster, threshold: f64) -> Raster {
    index.map(|v| if v > threshold { 1.0 } else { 0.0 })
}
