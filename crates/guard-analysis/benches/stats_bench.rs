//! Benchmarks for gas price statistics.
//!
//! Sample sizes approximate a default window (300 blocks, step 3, ~150 txs
//! per block) and a maximal one.
//! Run with: `cargo bench --package guard-analysis`

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use guard_analysis::classify::{classify_contextual, ContextThresholds};
use guard_analysis::stats::{percentile, GasPriceStats};

/// Pseudo-random gas prices in gwei, deterministic across runs.
fn sample_prices(n: usize) -> Vec<f64> {
    let mut state = 0x2545_f491_4f6c_dd1d_u64;
    (0..n)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            1.0 + (state % 200_000) as f64 / 1_000.0
        })
        .collect()
}

/// Benchmark: statistics over a default-sized window (~15k samples).
fn bench_stats_default_window(c: &mut Criterion) {
    let samples = sample_prices(15_000);
    c.bench_function("stats_default_window", |b| {
        b.iter(|| GasPriceStats::from_samples(black_box(&samples)))
    });
}

/// Benchmark: statistics over a clamped 10k-block window at step 1 (~1.5M samples).
fn bench_stats_max_window(c: &mut Criterion) {
    let samples = sample_prices(1_500_000);
    let mut group = c.benchmark_group("stats_max_window");
    group.sample_size(10);
    group.bench_function("from_samples", |b| {
        b.iter(|| GasPriceStats::from_samples(black_box(&samples)))
    });
    group.finish();
}

/// Benchmark: single percentile plus classification.
fn bench_percentile_and_classify(c: &mut Criterion) {
    let samples = sample_prices(15_000);
    let thresholds = ContextThresholds::DEFAULT;
    c.bench_function("p95_and_classify", |b| {
        b.iter(|| {
            let p95 = percentile(black_box(&samples), 0.95);
            classify_contextual(black_box(42.0), 20.0, p95, &thresholds)
        })
    });
}

criterion_group!(
    benches,
    bench_stats_default_window,
    bench_stats_max_window,
    bench_percentile_and_classify
);
criterion_main!(benches);
