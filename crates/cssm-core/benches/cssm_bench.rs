//! CSSM Benchmarks
//!
//! Run with: cargo bench -p cssm-core --bench cssm_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cssm_core::eigen::hermitian_eigen;
use cssm_core::focusing::coherent_sum;
use cssm_core::manifold::{ArrayGeometry, ArrayManifold, DirectionGrid, FieldMode};
use cssm_core::{CMatrix, Cssm, MusicEngine, Snapshots, SubspaceBase};
use num_complex::Complex64;

const NFFT: usize = 256;
const FS: f64 = 16_000.0;

fn engine(sensors: usize, bins: Vec<usize>, num_sources: usize) -> MusicEngine {
    let grid = DirectionGrid::azimuth_deg(0.0, 179.0, 180);
    let freqs: Vec<f64> = (0..=NFFT / 2).map(|k| k as f64 * FS / NFFT as f64).collect();
    let manifold = ArrayManifold::build(
        &ArrayGeometry::linear(sensors, 0.04),
        &grid,
        &freqs,
        343.0,
        FieldMode::Far,
    );
    MusicEngine::new(manifold, bins, num_sources)
        .expect("valid engine")
        .with_grid(grid)
}

fn two_sources(engine: &MusicEngine, frames: usize) -> Snapshots {
    Snapshots::from_fn(engine.num_sensors(), NFFT / 2 + 1, frames, |m, k, s| {
        let a = engine.manifold().mode_vector(k, 40)[m];
        let b = engine.manifold().mode_vector(k, 110)[m];
        a * Complex64::from_polar(1.0, 0.7 * s as f64)
            + b * Complex64::from_polar(0.6, 1.9 * s as f64 + 0.4)
    })
}

// ============================================================================
// Full Estimation
// ============================================================================

fn bench_locate(c: &mut Criterion) {
    let mut group = c.benchmark_group("cssm_locate");

    for num_bins in [8usize, 32, 64].iter() {
        let bins: Vec<usize> = (8..8 + num_bins).collect();
        let cssm = Cssm::new(engine(6, bins, 2), 5).expect("valid cssm");
        let snapshots = two_sources(cssm.base(), 16);

        group.throughput(Throughput::Elements(*num_bins as u64));
        group.bench_with_input(BenchmarkId::new("bins", num_bins), num_bins, |b, _| {
            b.iter(|| cssm.locate(black_box(&snapshots)))
        });
    }

    group.finish();
}

// ============================================================================
// Building Blocks
// ============================================================================

fn bench_coherent_sum(c: &mut Criterion) {
    let mut group = c.benchmark_group("coherent_sum");

    for sensors in [4usize, 8, 16].iter() {
        let engine = engine(*sensors, (8..40).collect(), 2);
        let covs = engine
            .compute_correlation_matrices(&two_sources(&engine, 16))
            .expect("covariances");
        let beta = vec![vec![40, 110]; covs.len()];

        group.bench_with_input(BenchmarkId::new("sensors", sensors), sensors, |b, _| {
            b.iter(|| coherent_sum(&engine, black_box(&covs), 24, &beta))
        });
    }

    group.finish();
}

fn bench_eigen(c: &mut Criterion) {
    let mut group = c.benchmark_group("hermitian_eigen");

    for n in [4usize, 8, 16].iter() {
        let x: Vec<Complex64> = (0..*n)
            .map(|i| Complex64::from_polar(1.0, 0.37 * i as f64))
            .collect();
        let mut r = CMatrix::outer(&x);
        r.add_assign(&CMatrix::identity(*n));

        group.bench_with_input(BenchmarkId::new("size", n), n, |b, _| {
            b.iter(|| hermitian_eigen(black_box(&r)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_locate, bench_coherent_sum, bench_eigen);
criterion_main!(benches);
