//! # Imagery: the remote raster source seam
//!
//! Everything the pipeline needs from the remote imagery platform goes through the
//! [`ImageryClient`] trait. Each method is one **synchronous** logical operation (search, fetch,
//! reduce); there is no deferred query graph.
//!
//! Modules
//! -----------------
//! * [`http_client`] – JSON/HTTP implementation with timeouts and retry-with-backoff.
//! * [`memory`] – In-memory implementation backed by local rasters (tests, offline runs).
//! * [`retry`] – Bounded exponential backoff used by the HTTP client.
//!
//! Scene selection
//! -----------------
//! [`select_scene`] keeps the scenes acquired inside the requested [`DateRange`] whose cloudy
//! pixel percentage is strictly below the limit, then picks the **most recent** one. Ties on the
//! acquisition date go to the less cloudy scene, then to the smallest scene id, so the choice is
//! deterministic whatever order the service returns.
use std::cmp::Ordering;

use chrono::NaiveDate;
use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};

use crate::{
    constants::Meter,
    raster::BandStack,
    treemetrics_errors::TreeMetricsError,
};

pub mod http_client;
pub mod memory;
pub mod retry;

/// Inclusive calendar date range used to filter scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TreeMetricsError> {
        if end < start {
            return Err(TreeMetricsError::InvalidParameter(format!(
                "imagery date range ends ({end}) before it starts ({start})"
            )));
        }
        Ok(DateRange { start, end })
    }

    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Metadata of one optical scene as reported by the imagery service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneInfo {
    pub id: String,
    pub acquired: NaiveDate,
    pub cloudy_pixel_percentage: f64,
}

/// Narrow, synchronous interface to the remote imagery platform.
///
/// Implementations must be usable behind a shared reference: the pipeline never mutates a client.
pub trait ImageryClient {
    /// List the optical scenes intersecting `bounds` and acquired within `range`.
    fn search_scenes(
        &self,
        bounds: &Rect<f64>,
        range: &DateRange,
    ) -> Result<Vec<SceneInfo>, TreeMetricsError>;

    /// Fetch the requested reflectance bands of `scene` over `bounds`, resampled on a common grid
    /// at `resolution_m` ground sampling distance.
    fn fetch_bands(
        &self,
        scene: &SceneInfo,
        bounds: &Rect<f64>,
        bands: &[&str],
        resolution_m: Meter,
    ) -> Result<BandStack, TreeMetricsError>;

    /// Local-mean reduction of the canopy height raster at each point, at `resolution_m`.
    ///
    /// The result has exactly one entry per input point, in the same order; `None` marks a
    /// no-data pixel or a point outside the raster footprint.
    fn sample_canopy_height(
        &self,
        points: &[Coord<f64>],
        resolution_m: Meter,
    ) -> Result<Vec<Option<f64>>, TreeMetricsError>;
}

impl<C: ImageryClient + ?Sized> ImageryClient for &C {
    fn search_scenes(
        &self,
        bounds: &Rect<f64>,
        range: &DateRange,
    ) -> Result<Vec<SceneInfo>, TreeMetricsError> {
        (**self).search_scenes(bounds, range)
    }

    fn fetch_bands(
        &self,
        scene: &SceneInfo,
        bounds: &Rect<f64>,
        bands: &[&str],
        resolution_m: Meter,
    ) -> Result<BandStack, TreeMetricsError> {
        (**self).fetch_bands(scene, bounds, bands, resolution_m)
    }

    fn sample_canopy_height(
        &self,
        points: &[Coord<f64>],
        resolution_m: Meter,
    ) -> Result<Vec<Option<f64>>, TreeMetricsError> {
        (**self).sample_canopy_height(points, resolution_m)
    }
}

/// Pick the scene used for the vegetation index.
///
/// Arguments
/// -----------------
/// * `scenes`: Candidate scenes, in any order.
/// * `range`: Acquisition dates accepted (inclusive).
/// * `max_cloud_pct`: Scenes must have a cloudy pixel percentage strictly below this value.
///
/// Return
/// ----------
/// * The most recent qualifying scene, or `None` if no scene qualifies.
pub fn select_scene<'a>(
    scenes: &'a [SceneInfo],
    range: &DateRange,
    max_cloud_pct: f64,
) -> Option<&'a SceneInfo> {
    scenes
        .iter()
        .filter(|s| range.contains(s.acquired))
        .filter(|s| s.cloudy_pixel_percentage < max_cloud_pct)
        .min_by(|a, b| {
            b.acquired
                .cmp(&a.acquired)
                .then_with(|| {
                    a.cloudy_pixel_percentage
                        .partial_cmp(&b.cloudy_pixel_percentage)
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| a.id.cmp(&b.id))
        })
}

#[cfg(test)]
mod imagery_test {
    use super::*;

    fn scene(id: &str, date: &str, cloud: f64) -> SceneInfo {
        SceneInfo {
            id: id.to_string(),
            acquired: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            cloudy_pixel_percentage: cloud,
        }
    }

    fn year_2023() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_select_most_recent_clear_scene() {
        let scenes = vec![
            scene("a", "2023-03-01", 1.0),
            scene("b", "2023-11-20", 12.0),
            scene("c", "2023-10-02", 4.9),
            scene("d", "2024-01-05", 0.0),
        ];
        let picked = select_scene(&scenes, &year_2023(), 5.0).unwrap();
        assert_eq!(picked.id, "c");
    }

    #[test]
    fn test_select_same_day_tie_break() {
        let scenes = vec![
            scene("z", "2023-06-01", 3.0),
            scene("y", "2023-06-01", 1.0),
            scene("x", "2023-06-01", 1.0),
        ];
        let picked = select_scene(&scenes, &year_2023(), 5.0).unwrap();
        assert_eq!(picked.id, "x");
    }

    #[test]
    fn test_select_none_when_all_cloudy() {
        let scenes = vec![scene("a", "2023-03-01", 5.0), scene("b", "2023-04-01", 80.0)];
        assert!(select_scene(&scenes, &year_2023(), 5.0).is_none());
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        let err = DateRange::new(
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, TreeMetricsError::InvalidParameter(_)));
    }
}
