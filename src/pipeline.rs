//! # Tree metrics pipeline
//!
//! [`run_pipeline`] is the single-pass batch run:
//!
//! ```text
//! trees ─► region of interest ─► canopy height (batched remote sampling)
//!                             └► grid cells ─► NDVI mask ─► per-cell cover ─► tree/cell join
//!       ─► growth metrics ─► ordered TreeRecords
//! ```
//!
//! Failure model
//! -----------------
//! * Input and geometry errors abort before any remote query.
//! * The height stage always runs. If the cover stage finds no usable scene
//!   ([`TreeMetricsError::NoImageryAvailable`]), every tree keeps an empty cover value and the
//!   run continues; any other cover error aborts.
//! * Trees without a height or a matching cell are kept, with the gap recorded in the
//!   [`PipelineReport`] and logged at `warn` level.
use log::{info, warn};

use crate::{
    canopy::{attach_canopy_cover, attach_canopy_height, compute_vegetation_index, cover_per_cell},
    config::PipelineConfig,
    grid::build_grid,
    imagery::ImageryClient,
    raster::index::binarize,
    records::{assemble, Attribute, MissingAttribute, TreeRecord},
    treemetrics_errors::TreeMetricsError,
    trees::{
        roi::{extract_roi, RegionOfInterest},
        TreePoint,
    },
};

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineReport {
    pub tree_count: usize,
    pub grid_cell_count: usize,
    /// Scene the canopy mask came from, `None` if the cover stage found no imagery.
    pub scene_id: Option<String>,
    pub height_batches: usize,
    pub missing: Vec<MissingAttribute>,
    /// Reason the cover stage was skipped, if it was.
    pub cover_skipped: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub records: Vec<TreeRecord>,
    pub report: PipelineReport,
}

struct CoverStage {
    scene_id: String,
    cell_count: usize,
    per_tree: Vec<Option<f64>>,
}

fn cover_stage<C: ImageryClient>(
    client: &C,
    points: &[TreePoint],
    roi: &RegionOfInterest,
    config: &PipelineConfig,
) -> Result<CoverStage, TreeMetricsError> {
    info!("Updating canopy cover...");
    let mut cells = build_grid(roi, config.grid_size_m)?;

    let index = compute_vegetation_index(
        client,
        roi,
        &config.imagery_range(),
        config.max_cloud_pct,
        config.cover_resolution_m,
    )?;
    let mask = binarize(&index.ndvi, config.ndvi_threshold);
    cover_per_cell(&mask, &mut cells, config.tree_density_per_ha);

    info!("Updating tree information using spatial join...");
    Ok(CoverStage {
        scene_id: index.scene.id,
        cell_count: cells.len(),
        per_tree: attach_canopy_cover(points, &cells),
    })
}

/// Run the whole pipeline over `points`.
///
/// Arguments
/// -----------------
/// * `client`: Imagery source (remote or in-memory).
/// * `points`: The trees, in output order.
/// * `config`: Validated run configuration.
///
/// Return
/// ----------
/// * One record per tree, in input order, with the run report.
/// * The first fatal error otherwise (see the module documentation).
pub fn run_pipeline<C: ImageryClient>(
    client: &C,
    points: &[TreePoint],
    config: &PipelineConfig,
) -> Result<PipelineOutput, TreeMetricsError> {
    info!("Retrieval of tree's data ({} trees)...", points.len());
    let roi = extract_roi(points)?;
    if roi.buffered {
        warn!("Trees are collinear; the region of interest was buffered");
    }

    info!("Updating canopy height...");
    let heights = attach_canopy_height(
        client,
        points,
        config.height_resolution_m,
        config.batch_size,
    )?;

    let mut report = PipelineReport {
        tree_count: points.len(),
        height_batches: heights.batches,
        ..PipelineReport::default()
    };

    let covers = match cover_stage(client, points, &roi, config) {
        Ok(stage) => {
            report.scene_id = Some(stage.scene_id);
            report.grid_cell_count = stage.cell_count;
            stage.per_tree
        }
        Err(err @ TreeMetricsError::NoImageryAvailable { .. }) => {
            warn!("Canopy cover skipped: {err}");
            report.cover_skipped = Some(err.to_string());
            vec![None; points.len()]
        }
        Err(err) => return Err(err),
    };

    info!("Computing growth metrics...");
    if let Some(future) = points.iter().find(|p| p.plantation_date > config.update_date) {
        warn!(
            "Plantation date {} is after the update date {}; ages will be negative",
            future.plantation_date, config.update_date
        );
    }

    let records: Vec<TreeRecord> = points
        .iter()
        .zip(heights.results)
        .zip(covers)
        .map(|((point, height), cover)| {
            if height.is_none() {
                report.missing.push(MissingAttribute {
                    tree_id: point.id,
                    field: Attribute::CurrentHeight,
                });
            }
            if cover.is_none() {
                report.missing.push(MissingAttribute {
                    tree_id: point.id,
                    field: Attribute::CanopyCover,
                });
            }
            assemble(point, height, cover, config)
        })
        .collect();

    if !report.missing.is_empty() {
        warn!("{} missing tree attributes", report.missing.len());
        for gap in report.missing.iter().take(10) {
            warn!("  {gap}");
        }
    }
    info!(
        "Pipeline done: {} records, {} grid cells, {} height batches",
        records.len(),
        report.grid_cell_count,
        report.height_batches
    );

    Ok(PipelineOutput { records, report })
}
