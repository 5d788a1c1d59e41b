#![allow(dead_code)]

use chrono::NaiveDate;
use geo::{Coord, Rect};
use treemetrics::{
    imagery::SceneInfo,
    raster::{BandStack, GeoTransform, Raster},
    trees::{extract_points, CoordinateRow},
    InMemoryImagery, TreePoint,
};

pub const PLANTATION: (i32, u32, u32) = (2023, 9, 15);
pub const UPDATE: (i32, u32, u32) = (2025, 9, 15);

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn plantation_date() -> NaiveDate {
    date(PLANTATION.0, PLANTATION.1, PLANTATION.2)
}

pub fn update_date() -> NaiveDate {
    date(UPDATE.0, UPDATE.1, UPDATE.2)
}

/// Trees at the given `(longitude, latitude)` pairs, planted at [`plantation_date`] with 2 m.
pub fn trees_at(coords: &[(f64, f64)]) -> Vec<TreePoint> {
    let rows: Vec<CoordinateRow> = coords
        .iter()
        .map(|&(longitude, latitude)| CoordinateRow {
            longitude,
            latitude,
        })
        .collect();
    extract_points(&rows, 2.0, plantation_date(), "EcoTree Solution").unwrap()
}

/// Four corner trees of a `side` degree square with south-west corner `(lon, lat)`, plus one
/// tree at the centre.
pub fn square_plantation(lon: f64, lat: f64, side: f64) -> Vec<TreePoint> {
    trees_at(&[
        (lon, lat),
        (lon + side, lat),
        (lon + side, lat + side),
        (lon, lat + side),
        (lon + 0.5 * side, lat + 0.5 * side),
    ])
}

/// `bounds` grown by `margin` degrees on every side.
pub fn grown(bounds: Rect<f64>, margin: f64) -> Rect<f64> {
    Rect::new(
        Coord {
            x: bounds.min().x - margin,
            y: bounds.min().y - margin,
        },
        Coord {
            x: bounds.max().x + margin,
            y: bounds.max().y + margin,
        },
    )
}

/// Constant raster over `bounds` at `resolution_m`.
pub fn constant_raster(bounds: &Rect<f64>, resolution_m: f64, value: f64) -> Raster {
    let (width, height, transform) = Raster::grid_covering(bounds, resolution_m).unwrap();
    Raster::from_fn(width, height, transform, |_| value)
}

/// NIR and red bands of uniform reflectance over `bounds`.
pub fn uniform_scene(bounds: &Rect<f64>, nir: f64, red: f64) -> BandStack {
    let mut stack = BandStack::new();
    stack.push("B8", constant_raster(bounds, 10.0, nir)).unwrap();
    stack.push("B4", constant_raster(bounds, 10.0, red)).unwrap();
    stack
}

pub fn scene(id: &str, acquired: NaiveDate, cloudy: f64) -> SceneInfo {
    SceneInfo {
        id: id.to_string(),
        acquired,
        cloudy_pixel_percentage: cloudy,
    }
}

/// Imagery over `bounds` (with a 0.001 degree margin): a clear vegetated scene, a newer cloudy
/// one, and a constant canopy height.
pub fn vegetated_imagery(bounds: Rect<f64>, canopy_height: f64) -> InMemoryImagery {
    let area = grown(bounds, 0.001);
    InMemoryImagery::new()
        .with_scene(
            scene("S2_clear", date(2025, 6, 1), 1.0),
            uniform_scene(&area, 0.8, 0.1),
        )
        .with_scene(
            scene("S2_cloudy", date(2025, 8, 1), 30.0),
            uniform_scene(&area, 0.1, 0.1),
        )
        .with_canopy_height(constant_raster(&area, 1.0, canopy_height))
}

/// Raster of `width × height` pixels of `pixel` degrees whose samples are their row-major index.
pub fn indexed_raster(west: f64, north: f64, pixel: f64, width: usize, height: usize) -> Raster {
    let transform = GeoTransform::north_up(west, north, pixel, pixel).unwrap();
    let data = (0..width * height).map(|i| i as f64).collect();
    Raster::new(width, height, transform, data, None).unwrap()
}
