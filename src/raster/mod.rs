//! # Raster: georeferenced pixel grids and region reductions
//!
//! The imagery platform resolves pixel reductions remotely; this crate models them explicitly so
//! that the canopy aggregation is inspectable and testable offline.
//!
//! A [`Raster`] is a row-major `f64` grid with a north-up affine [`GeoTransform`] expressed in
//! geographic degrees. A pixel is **no-data** when its value is `NaN` or equals the raster's
//! declared no-data value; reductions skip those pixels.
//!
//! Pixel ground area
//! -----------------
//! Pixel sizes are in degrees, so the ground area of a pixel depends on its latitude:
//!
//! ```text
//! area = |dx| · 111 320 · cos(lat_center)  ×  |dy| · 111 320      (m²)
//! ```
//!
//! Region reductions ([`Raster::sum_area_where`]) weight each selected pixel by that area and
//! select pixels by **centre-in-polygon**.
//!
//! See also
//! ------------
//! * [`index`] – Normalized difference and threshold masks built from band rasters.
use geo::{BoundingRect, Contains, Coord, MultiPolygon, Point, Rect};

use crate::{
    constants::{SquareMeter, METERS_PER_DEGREE},
    treemetrics_errors::TreeMetricsError,
};

pub mod index;

/// Affine pixel ↔ geographic transform, using the GDAL coefficient order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    forward_matrix: [f64; 6],
    inverse_matrix: [f64; 6],
}

impl GeoTransform {
    pub fn from_gdal(gt: [f64; 6]) -> Result<Self, TreeMetricsError> {
        let determinant = gt[1] * gt[5] - gt[2] * gt[4];

        if determinant.abs() < 1e-20 || !determinant.is_finite() {
            return Err(TreeMetricsError::RasterShape(
                "invalid geotransform: determinant is zero".into(),
            ));
        }

        let inv_det = 1.0 / determinant;

        let inverse_matrix = [
            (gt[2] * gt[3] - gt[5] * gt[0]) * inv_det,
            gt[5] * inv_det,
            -gt[2] * inv_det,
            (gt[4] * gt[0] - gt[1] * gt[3]) * inv_det,
            -gt[4] * inv_det,
            gt[1] * inv_det,
        ];

        Ok(Self {
            forward_matrix: gt,
            inverse_matrix,
        })
    }

    /// North-up transform anchored at the north-west corner, pixel sizes in degrees.
    pub fn north_up(
        west: f64,
        north: f64,
        pixel_width: f64,
        pixel_height: f64,
    ) -> Result<Self, TreeMetricsError> {
        Self::from_gdal([west, pixel_width, 0.0, north, 0.0, -pixel_height])
    }

    #[inline]
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> Coord<f64> {
        let inv = self.inverse_matrix;
        let u = inv[0] + x * inv[1] + y * inv[2];
        let v = inv[3] + x * inv[4] + y * inv[5];
        Coord { x: u, y: v }
    }

    #[inline]
    pub fn pixel_to_geo(&self, x: f64, y: f64) -> Coord<f64> {
        let fwd = self.forward_matrix;
        let lx = fwd[0] + x * fwd[1] + y * fwd[2];
        let ly = fwd[3] + x * fwd[4] + y * fwd[5];
        Coord { x: lx, y: ly }
    }

    /// The six GDAL coefficients.
    pub fn coefficients(&self) -> [f64; 6] {
        self.forward_matrix
    }

    /// Absolute pixel width and height, in degrees.
    pub fn pixel_size(&self) -> (f64, f64) {
        (self.forward_matrix[1].abs(), self.forward_matrix[5].abs())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: usize,
    height: usize,
    transform: GeoTransform,
    data: Vec<f64>,
    nodata: Option<f64>,
}

impl Raster {
    /// Build a raster from row-major samples.
    ///
    /// Arguments
    /// -----------------
    /// * `width`, `height`: Grid dimensions in pixels.
    /// * `transform`: Pixel → geographic transform.
    /// * `data`: `width × height` samples, row 0 being the northernmost row.
    /// * `nodata`: Optional sentinel marking missing samples (`NaN` is always missing).
    ///
    /// Return
    /// ----------
    /// * The raster, or [`TreeMetricsError::RasterShape`] if `data` has the wrong length.
    pub fn new(
        width: usize,
        height: usize,
        transform: GeoTransform,
        data: Vec<f64>,
        nodata: Option<f64>,
    ) -> Result<Self, TreeMetricsError> {
        if data.len() != width * height {
            return Err(TreeMetricsError::RasterShape(format!(
                "{} samples for a {width}x{height} grid",
                data.len()
            )));
        }
        Ok(Raster {
            width,
            height,
            transform,
            data,
            nodata,
        })
    }

    /// Build a raster by evaluating `f` at every pixel centre.
    pub fn from_fn(
        width: usize,
        height: usize,
        transform: GeoTransform,
        f: impl Fn(Coord<f64>) -> f64,
    ) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for row in 0..height {
            for col in 0..width {
                data.push(f(transform.pixel_to_geo(col as f64 + 0.5, row as f64 + 0.5)));
            }
        }
        Raster {
            width,
            height,
            transform,
            data,
            nodata: None,
        }
    }

    /// Pixel grid covering `bounds` at roughly `resolution_m` ground sampling distance.
    ///
    /// The longitude step is widened by `1 / cos(lat)` at the southern edge of `bounds`, so pixels
    /// stay close to square on the ground.
    pub fn grid_covering(
        bounds: &Rect<f64>,
        resolution_m: f64,
    ) -> Result<(usize, usize, GeoTransform), TreeMetricsError> {
        if !(resolution_m > 0.0) {
            return Err(TreeMetricsError::InvalidParameter(format!(
                "raster resolution must be positive, got {resolution_m}"
            )));
        }
        let cos_lat = bounds.min().y.to_radians().cos();
        if cos_lat <= f64::EPSILON {
            return Err(TreeMetricsError::InvalidParameter(
                "cannot build a metric raster grid at the poles".into(),
            ));
        }
        let dy = resolution_m / METERS_PER_DEGREE;
        let dx = resolution_m / (METERS_PER_DEGREE * cos_lat);
        let width = ((bounds.width() / dx).ceil() as usize).max(1);
        let height = ((bounds.height() / dy).ceil() as usize).max(1);
        let transform = GeoTransform::north_up(bounds.min().x, bounds.max().y, dx, dy)?;
        Ok((width, height, transform))
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    #[inline]
    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    fn is_valid(&self, v: f64) -> bool {
        !v.is_nan() && self.nodata.map_or(true, |nd| v != nd)
    }

    /// Sample at `(col, row)`; `None` outside the grid or on no-data.
    #[inline]
    pub fn get(&self, col: usize, row: usize) -> Option<f64> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let v = self.data[row * self.width + col];
        self.is_valid(v).then_some(v)
    }

    /// Sample of the pixel containing the geographic coordinate `c`.
    pub fn value_at(&self, c: Coord<f64>) -> Option<f64> {
        let px = self.transform.geo_to_pixel(c.x, c.y);
        if px.x < 0.0 || px.y < 0.0 {
            return None;
        }
        self.get(px.x.floor() as usize, px.y.floor() as usize)
    }

    /// Local mean around `c` over a square window of side `resolution_m`.
    ///
    /// Averages the valid pixels whose centres fall in the window. When the window is smaller
    /// than a pixel and holds no centre, the pixel containing `c` is used instead.
    pub fn mean_at(&self, c: Coord<f64>, resolution_m: f64) -> Option<f64> {
        let half_lat = 0.5 * resolution_m / METERS_PER_DEGREE;
        let half_lon = half_lat / c.y.to_radians().cos().max(f64::EPSILON);
        let window = Rect::new(
            Coord {
                x: c.x - half_lon,
                y: c.y - half_lat,
            },
            Coord {
                x: c.x + half_lon,
                y: c.y + half_lat,
            },
        );
        let (c0, c1, r0, r1) = self.window(&window);

        let mut sum = 0.0;
        let mut count = 0usize;
        let mut any_centre = false;
        for row in r0..r1 {
            for col in c0..c1 {
                let centre = self.pixel_center(col, row);
                if !window.contains(&centre) {
                    continue;
                }
                any_centre = true;
                if let Some(v) = self.get(col, row) {
                    sum += v;
                    count += 1;
                }
            }
        }

        if count > 0 {
            Some(sum / count as f64)
        } else if any_centre {
            None
        } else {
            self.value_at(c)
        }
    }

    #[inline]
    pub fn pixel_center(&self, col: usize, row: usize) -> Coord<f64> {
        self.transform
            .pixel_to_geo(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Ground area of one pixel of `row`, in square meters.
    pub fn pixel_area_m2(&self, row: usize) -> SquareMeter {
        let (dx, dy) = self.transform.pixel_size();
        let lat = self.pixel_center(0, row).y.to_radians();
        (dx * METERS_PER_DEGREE * lat.cos()).abs() * dy * METERS_PER_DEGREE
    }

    /// Geographic footprint of the whole grid.
    pub fn footprint(&self) -> Rect<f64> {
        Rect::new(
            self.transform.pixel_to_geo(0.0, 0.0),
            self.transform
                .pixel_to_geo(self.width as f64, self.height as f64),
        )
    }

    pub fn same_grid(&self, other: &Raster) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.transform == other.transform
    }

    /// Apply `f` to every valid sample; no-data samples become `NaN`.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Raster {
        let data = self
            .data
            .iter()
            .map(|&v| if self.is_valid(v) { f(v) } else { f64::NAN })
            .collect();
        Raster {
            width: self.width,
            height: self.height,
            transform: self.transform,
            data,
            nodata: None,
        }
    }

    /// Combine two rasters on the same grid; a pixel missing in either input is `NaN`.
    pub fn zip_with(
        &self,
        other: &Raster,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<Raster, TreeMetricsError> {
        if !self.same_grid(other) {
            return Err(TreeMetricsError::RasterShape(format!(
                "{}x{} grid does not match {}x{} grid",
                self.width, self.height, other.width, other.height
            )));
        }
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| {
                if self.is_valid(a) && other.is_valid(b) {
                    f(a, b)
                } else {
                    f64::NAN
                }
            })
            .collect();
        Ok(Raster {
            width: self.width,
            height: self.height,
            transform: self.transform,
            data,
            nodata: None,
        })
    }

    /// Inclusive-exclusive pixel window `(col0, col1, row0, row1)` overlapping `rect`.
    fn window(&self, rect: &Rect<f64>) -> (usize, usize, usize, usize) {
        let corners = [
            self.transform.geo_to_pixel(rect.min().x, rect.min().y),
            self.transform.geo_to_pixel(rect.max().x, rect.max().y),
        ];
        let clamp = |v: f64, hi: usize| v.max(0.0).min(hi as f64) as usize;
        let (u0, u1) = (corners[0].x.min(corners[1].x), corners[0].x.max(corners[1].x));
        let (v0, v1) = (corners[0].y.min(corners[1].y), corners[0].y.max(corners[1].y));
        (
            clamp(u0.floor(), self.width),
            clamp(u1.ceil(), self.width),
            clamp(v0.floor(), self.height),
            clamp(v1.ceil(), self.height),
        )
    }

    /// Area-weighted sum over the pixels of `region` whose sample satisfies `keep`.
    ///
    /// Arguments
    /// -----------------
    /// * `region`: Geographic (multi)polygon; a pixel belongs to it when its centre does.
    /// * `keep`: Predicate on valid samples; no-data pixels never count.
    ///
    /// Return
    /// ----------
    /// * The summed ground area of the selected pixels, in m².
    pub fn sum_area_where(
        &self,
        region: &MultiPolygon<f64>,
        keep: impl Fn(f64) -> bool,
    ) -> SquareMeter {
        let Some(bbox) = region.bounding_rect() else {
            return 0.0;
        };
        let (c0, c1, r0, r1) = self.window(&bbox);

        let mut total = 0.0;
        for row in r0..r1 {
            let row_area = self.pixel_area_m2(row);
            for col in c0..c1 {
                let Some(v) = self.get(col, row) else {
                    continue;
                };
                if keep(v) && region.contains(&Point::from(self.pixel_center(col, row))) {
                    total += row_area;
                }
            }
        }
        total
    }
}

/// Named band rasters sharing one pixel grid.
#[derive(Debug, Clone, Default)]
pub struct BandStack {
    bands: Vec<(String, Raster)>,
}

impl BandStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a band; it must share the grid of the bands already present.
    pub fn push(&mut self, name: impl Into<String>, raster: Raster) -> Result<(), TreeMetricsError> {
        if let Some((first, reference)) = self.bands.first() {
            if !reference.same_grid(&raster) {
                return Err(TreeMetricsError::RasterShape(format!(
                    "band grid differs from band {first}"
                )));
            }
        }
        self.bands.push((name.into(), raster));
        Ok(())
    }

    pub fn band(&self, name: &str) -> Result<&Raster, TreeMetricsError> {
        self.bands
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
            .ok_or_else(|| TreeMetricsError::RasterShape(format!("band {name} is missing")))
    }

    pub fn rasters(&self) -> impl Iterator<Item = &Raster> {
        self.bands.iter().map(|(_, r)| r)
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }
}
