//! Canopy height at each tree.
//!
//! The height raster is reduced remotely (local mean at the tree location, at fine resolution).
//! Trees are sent in sequential batches of at most `batch_size` points; the returned heights stay
//! aligned with the input trees. A no-data pixel, or a tree outside the raster, gives `None`.
use geo::Coord;

use crate::{
    batch::{run_batched, Batched},
    constants::Meter,
    imagery::ImageryClient,
    treemetrics_errors::TreeMetricsError,
    trees::TreePoint,
};

/// Sample the canopy height of every tree.
///
/// Arguments
/// -----------------
/// * `client`: Imagery source serving the canopy height reduction.
/// * `points`: The trees, in output order.
/// * `resolution_m`: Ground resolution of the reduction (≈ 1.2 m).
/// * `batch_size`: Maximum number of trees per remote request.
///
/// Return
/// ----------
/// * One optional height (meters) per tree, and the number of batches issued.
pub fn attach_canopy_height<C: ImageryClient>(
    client: &C,
    points: &[TreePoint],
    resolution_m: Meter,
    batch_size: usize,
) -> Result<Batched<Option<Meter>>, TreeMetricsError> {
    run_batched(points, batch_size, |_, batch| {
        let coords: Vec<Coord<f64>> = batch.iter().map(TreePoint::coord).collect();
        let heights = client.sample_canopy_height(&coords, resolution_m)?;
        Ok(heights
            .into_iter()
            .map(|h| h.filter(|v| v.is_finite()))
            .collect())
    })
}

#[cfg(test)]
mod height_test {
    use super::*;
    use crate::{
        imagery::memory::InMemoryImagery,
        raster::{GeoTransform, Raster},
    };
    use chrono::NaiveDate;

    fn tree(id: u32, longitude: f64, latitude: f64) -> TreePoint {
        TreePoint {
            id,
            longitude,
            latitude,
            plantation_date: NaiveDate::from_ymd_opt(2023, 9, 15).unwrap(),
            initial_height: 2.0,
            project_developer: "Dev".into(),
        }
    }

    #[test]
    fn test_heights_follow_trees() {
        let gt = GeoTransform::north_up(0.0, 1.0, 0.5, 0.5).unwrap();
        let raster = Raster::new(2, 2, gt, vec![3.0, 4.0, -9999.0, 6.0], Some(-9999.0)).unwrap();
        let client = InMemoryImagery::new().with_canopy_height(raster);

        let trees = vec![
            tree(0, 0.25, 0.75),
            tree(1, 0.75, 0.75),
            tree(2, 0.25, 0.25),
            tree(3, 0.75, 0.25),
            tree(4, 3.0, 3.0),
        ];
        let out = attach_canopy_height(&client, &trees, 1.2, 2).unwrap();
        assert_eq!(out.results, vec![Some(3.0), Some(4.0), None, Some(6.0), None]);
        assert_eq!(out.batches, 3);
        assert_eq!(client.height_batch_sizes(), vec![2, 2, 1]);
    }
}
