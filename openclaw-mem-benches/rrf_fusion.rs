//! Benchmarks for Reciprocal Rank Fusion over lexical and vector lanes.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use openclaw_mem_core::retrieval::rrf::fuse;
use openclaw_mem_core::storage_trait::ScoredId;

fn lane(len: usize, seed: i64) -> Vec<ScoredId> {
    (0..len)
        .map(|i| ScoredId {
            id: (i as i64 * 7 + seed) % (len as i64 * 2 + 1),
            score: 1.0 / (i as f64 + 1.0),
        })
        .collect()
}

fn benchmark_fuse_two_lanes(c: &mut Criterion) {
    let mut group = c.benchmark_group("fuse_two_lanes");

    for size in [10, 100, 1000] {
        let lanes = vec![lane(size, 0), lane(size, 3)];
        group.bench_with_input(BenchmarkId::from_parameter(size), &lanes, |b, lanes| {
            b.iter(|| black_box(fuse(lanes)));
        });
    }

    group.finish();
}

fn benchmark_fuse_many_lanes(c: &mut Criterion) {
    c.bench_function("fuse_five_lanes_of_200", |b| {
        let lanes: Vec<Vec<ScoredId>> = (0..5).map(|i| lane(200, i)).collect();
        b.iter(|| black_box(fuse(&lanes)));
    });
}

criterion_group!(benches, benchmark_fuse_two_lanes, benchmark_fuse_many_lanes);
criterion_main!(benches);
