mod common;

use common::*;
use treemetrics::{
    batch::{batch_spans, run_batched},
    canopy::attach_canopy_height,
    run_pipeline, InMemoryImagery, PipelineConfig, TreeMetricsError, TreePoint,
};

const WIDTH: usize = 120;
const HEIGHT: usize = 100;
const PIXEL: f64 = 0.001;
const WEST: f64 = 10.0;
const NORTH: f64 = 45.1;

/// One tree at the centre of every pixel of the indexed raster, in row-major order.
fn grid_trees() -> Vec<TreePoint> {
    let coords: Vec<(f64, f64)> = (0..HEIGHT)
        .flat_map(|row| {
            (0..WIDTH).map(move |col| {
                (
                    WEST + (col as f64 + 0.5) * PIXEL,
                    NORTH - (row as f64 + 0.5) * PIXEL,
                )
            })
        })
        .collect();
    trees_at(&coords)
}

fn indexed_client() -> InMemoryImagery {
    InMemoryImagery::new().with_canopy_height(indexed_raster(WEST, NORTH, PIXEL, WIDTH, HEIGHT))
}

#[test]
fn test_twelve_thousand_trees_in_three_batches() {
    let trees = grid_trees();
    assert_eq!(trees.len(), 12_000);
    let client = indexed_client();

    let heights = attach_canopy_height(&client, &trees, 1.2, 5000).unwrap();

    assert_eq!(heights.batches, 3);
    assert_eq!(client.height_batch_sizes(), vec![5000, 5000, 2000]);
    assert_eq!(heights.results.len(), 12_000);
    for (i, h) in heights.results.iter().enumerate() {
        assert_eq!(*h, Some(i as f64), "tree {i}");
    }
}

#[test]
fn test_exact_multiple_has_no_empty_batch() {
    let trees = grid_trees();
    let client = indexed_client();

    let heights = attach_canopy_height(&client, &trees, 1.2, 4000).unwrap();
    assert_eq!(heights.batches, 3);
    assert_eq!(client.height_batch_sizes(), vec![4000, 4000, 4000]);
}

#[test]
fn test_pipeline_batches_heights() {
    let trees = grid_trees();
    let client = indexed_client();
    let config = PipelineConfig::builder()
        .update_date(update_date())
        .batch_size(5000)
        .grid_size_m(1000.0)
        .build()
        .unwrap();

    let output = run_pipeline(&client, &trees, &config).unwrap();
    assert_eq!(output.report.height_batches, 3);
    assert_eq!(output.records.len(), 12_000);
    assert_eq!(output.records[11_999].id, 11_999);
    assert_eq!(output.records[11_999].current_height, Some(11_999.0));
    assert_eq!(output.records[5000].current_height, Some(5000.0));
}

#[test]
fn test_spans_and_mismatched_results() {
    let spans: Vec<(usize, usize)> = batch_spans(7, 3).unwrap().map(|s| (s.start, s.end)).collect();
    assert_eq!(spans, vec![(0, 3), (3, 6), (6, 7)]);
    assert_eq!(batch_spans(0, 3).unwrap().count(), 0);

    let items: Vec<u32> = (0..10).collect();
    let err = run_batched(&items, 4, |span, batch| {
        let mut out: Vec<u32> = batch.to_vec();
        if span.number == 2 {
            out.pop();
        }
        Ok(out)
    })
    .unwrap_err();
    assert!(matches!(err, TreeMetricsError::RemoteQuery { .. }));
}
