use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use chrono::NaiveDate;
use treemetrics::{
    canopy::assign_cells,
    grid::build_grid,
    trees::{extract_points, roi::extract_roi, CoordinateRow},
    TreePoint,
};

/// Uniform random plantation of `n` trees in a 0.02 degree box near Bordeaux.
fn random_plantation(rng: &mut StdRng, n: usize) -> Vec<TreePoint> {
    let rows: Vec<CoordinateRow> = (0..n)
        .map(|_| CoordinateRow {
            longitude: -0.58 + rng.random_range(0.0..0.02),
            latitude: 44.84 + rng.random_range(0.0..0.02),
        })
        .collect();
    let planted = NaiveDate::from_ymd_opt(2023, 9, 15).unwrap();
    extract_points(&rows, 2.0, planted, "bench").unwrap()
}

fn bench_build_grid(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let trees = random_plantation(&mut rng, 2_000);
    let roi = extract_roi(&trees).unwrap();

    c.bench_function("build_grid/100m", |b| {
        b.iter(|| build_grid(black_box(&roi), black_box(100.0)).unwrap())
    });
}

fn bench_join(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let trees = random_plantation(&mut rng, 20_000);
    let roi = extract_roi(&trees).unwrap();
    let cells = build_grid(&roi, 100.0).unwrap();

    c.bench_function("assign_cells/20k_trees", |b| {
        b.iter_batched(
            || trees.clone(),
            |trees| assign_cells(black_box(&trees), black_box(&cells)),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_build_grid, bench_join);
criterion_main!(benches);
