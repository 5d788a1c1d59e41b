//! In-memory [`ImageryClient`] backed by local rasters.
//!
//! Used by the tests and for offline runs: scenes are registered with their band rasters and the
//! reductions are computed locally with the [`Raster`] operations. Call counters let tests check
//! how many remote round trips a run would have issued.
use std::cell::{Cell, RefCell};

use geo::{Coord, Intersects, Rect};

use crate::{
    constants::Meter,
    imagery::{DateRange, ImageryClient, SceneInfo},
    raster::{BandStack, Raster},
    treemetrics_errors::TreeMetricsError,
};

#[derive(Debug, Default)]
pub struct InMemoryImagery {
    scenes: Vec<(SceneInfo, BandStack)>,
    canopy_height: Option<Raster>,
    height_calls: Cell<usize>,
    height_batch_sizes: RefCell<Vec<usize>>,
}

impl InMemoryImagery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scene with its band rasters.
    pub fn with_scene(mut self, info: SceneInfo, bands: BandStack) -> Self {
        self.scenes.push((info, bands));
        self
    }

    pub fn with_canopy_height(mut self, raster: Raster) -> Self {
        self.canopy_height = Some(raster);
        self
    }

    /// Number of canopy height sampling requests served so far.
    pub fn height_calls(&self) -> usize {
        self.height_calls.get()
    }

    /// Point count of every canopy height sampling request, in call order.
    pub fn height_batch_sizes(&self) -> Vec<usize> {
        self.height_batch_sizes.borrow().clone()
    }
}

impl ImageryClient for InMemoryImagery {
    fn search_scenes(
        &self,
        bounds: &Rect<f64>,
        range: &DateRange,
    ) -> Result<Vec<SceneInfo>, TreeMetricsError> {
        Ok(self
            .scenes
            .iter()
            .filter(|(info, _)| range.contains(info.acquired))
            .filter(|(_, bands)| {
                bands.is_empty() || bands.rasters().any(|r| r.footprint().intersects(bounds))
            })
            .map(|(info, _)| info.clone())
            .collect())
    }

    fn fetch_bands(
        &self,
        scene: &SceneInfo,
        _bounds: &Rect<f64>,
        bands: &[&str],
        _resolution_m: Meter,
    ) -> Result<BandStack, TreeMetricsError> {
        let (_, stack) = self
            .scenes
            .iter()
            .find(|(info, _)| info.id == scene.id)
            .ok_or_else(|| TreeMetricsError::RemoteQuery {
                attempts: 1,
                message: format!("unknown scene {}", scene.id),
            })?;

        let mut selected = BandStack::new();
        for name in bands {
            selected.push(*name, stack.band(name)?.clone())?;
        }
        Ok(selected)
    }

    fn sample_canopy_height(
        &self,
        points: &[Coord<f64>],
        resolution_m: Meter,
    ) -> Result<Vec<Option<f64>>, TreeMetricsError> {
        self.height_calls.set(self.height_calls.get() + 1);
        self.height_batch_sizes.borrow_mut().push(points.len());

        Ok(match &self.canopy_height {
            Some(raster) => points
                .iter()
                .map(|p| raster.mean_at(*p, resolution_m))
                .collect(),
            None => vec![None; points.len()],
        })
    }
}
