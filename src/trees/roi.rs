//! Region of interest enclosing the plantation.
//!
//! The region is the convex hull of the distinct tree coordinates. When every tree lies on one
//! line the hull has no area; the hull is then rebuilt from a small circle (radius
//! [`DEGENERATE_HULL_BUFFER`] degrees) around each point, which is the convex buffer of the line.
use std::f64::consts::TAU;

use geo::{Area, BoundingRect, ConvexHull, Coord, GeodesicArea, MultiPoint, Point, Polygon, Rect};
use itertools::Itertools;
use log::info;

use crate::{
    constants::{
        SquareMeter, DEGENERATE_HULL_AREA, DEGENERATE_HULL_BUFFER, HULL_BUFFER_SEGMENTS,
    },
    trees::TreePoint,
    treemetrics_errors::TreeMetricsError,
};

/// Closed polygon with positive area enclosing every tree.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionOfInterest {
    pub polygon: Polygon<f64>,
    /// `true` when the hull was collinear and had to be buffered.
    pub buffered: bool,
    bounds: Rect<f64>,
}

impl RegionOfInterest {
    /// Geographic bounding box of the region.
    #[inline]
    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    /// Geodesic area of the region, in m².
    pub fn area_m2(&self) -> SquareMeter {
        self.polygon.geodesic_area_unsigned()
    }
}

/// Distinct coordinates, in first-seen order.
fn distinct_coords(points: &[TreePoint]) -> Vec<Coord<f64>> {
    points
        .iter()
        .map(TreePoint::coord)
        .unique_by(|c| (c.x.to_bits(), c.y.to_bits()))
        .collect()
}

fn circle_around(c: Coord<f64>, radius: f64) -> impl Iterator<Item = Point<f64>> {
    (0..HULL_BUFFER_SEGMENTS).map(move |k| {
        let theta = TAU * k as f64 / HULL_BUFFER_SEGMENTS as f64;
        Point::new(c.x + radius * theta.cos(), c.y + radius * theta.sin())
    })
}

/// Derive the region of interest of a plantation.
///
/// Arguments
/// -----------------
/// * `points`: The tree points; duplicated coordinates count once.
///
/// Return
/// ----------
/// * The convex region, buffered when the trees are collinear.
/// * [`TreeMetricsError::InsufficientGeometry`] with fewer than 3 distinct coordinates, or if
///   no positive-area polygon can be built.
pub fn extract_roi(points: &[TreePoint]) -> Result<RegionOfInterest, TreeMetricsError> {
    let coords = distinct_coords(points);
    if coords.len() < 3 {
        return Err(TreeMetricsError::InsufficientGeometry(format!(
            "a region of interest needs at least 3 distinct points, got {}",
            coords.len()
        )));
    }

    let hull = MultiPoint::from(coords.iter().copied().map(Point::from).collect::<Vec<_>>())
        .convex_hull();

    let (polygon, buffered) = if hull.unsigned_area() > DEGENERATE_HULL_AREA {
        (hull, false)
    } else {
        info!("Convex hull is a line, buffering it by {DEGENERATE_HULL_BUFFER} degree");
        let ring: Vec<Point<f64>> = coords
            .iter()
            .flat_map(|c| circle_around(*c, DEGENERATE_HULL_BUFFER))
            .collect();
        (MultiPoint::from(ring).convex_hull(), true)
    };

    if !(polygon.unsigned_area() > DEGENERATE_HULL_AREA) {
        return Err(TreeMetricsError::InsufficientGeometry(
            "the trees collapse to a region without area".into(),
        ));
    }
    let bounds = polygon.bounding_rect().ok_or_else(|| {
        TreeMetricsError::InsufficientGeometry("the region of interest is empty".into())
    })?;

    Ok(RegionOfInterest {
        polygon,
        buffered,
        bounds,
    })
}

#[cfg(test)]
mod roi_test {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use geo::Contains;

    fn trees(coords: &[(f64, f64)]) -> Vec<TreePoint> {
        coords
            .iter()
            .enumerate()
            .map(|(i, &(longitude, latitude))| TreePoint {
                id: i as u32,
                longitude,
                latitude,
                plantation_date: NaiveDate::from_ymd_opt(2023, 9, 15).unwrap(),
                initial_height: 2.0,
                project_developer: "Dev".into(),
            })
            .collect()
    }

    #[test]
    fn test_square_hull() {
        let pts = trees(&[(0.0, 0.0), (0.01, 0.0), (0.01, 0.01), (0.0, 0.01), (0.005, 0.005)]);
        let roi = extract_roi(&pts).unwrap();
        assert!(!roi.buffered);
        assert_relative_eq!(roi.polygon.unsigned_area(), 1e-4, max_relative = 1e-12);
        assert_eq!(roi.bounds().min(), Coord { x: 0.0, y: 0.0 });
        assert_eq!(roi.bounds().max(), Coord { x: 0.01, y: 0.01 });
    }

    #[test]
    fn test_collinear_points_are_buffered() {
        let pts = trees(&[(1.0, 1.0), (1.01, 1.0), (1.02, 1.0)]);
        let roi = extract_roi(&pts).unwrap();
        assert!(roi.buffered);
        assert!(roi.area_m2() > 0.0);
        for p in &pts {
            assert!(roi.polygon.contains(&p.point()));
        }
        assert_relative_eq!(roi.bounds().min().y, 1.0 - DEGENERATE_HULL_BUFFER, epsilon = 1e-12);
    }

    #[test]
    fn test_duplicates_do_not_count() {
        let pts = trees(&[(1.0, 1.0), (1.0, 1.0), (2.0, 2.0), (2.0, 2.0)]);
        let err = extract_roi(&pts).unwrap_err();
        assert!(matches!(err, TreeMetricsError::InsufficientGeometry(_)));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            extract_roi(&[]),
            Err(TreeMetricsError::InsufficientGeometry(_))
        ));
    }
}
