//! Benchmarks for lexical and vector search against an in-memory ledger.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use openclaw_mem_core::storage_trait::{Filter, LedgerStore};
use openclaw_mem_test_utils::{axis_vector, open_test_ledger, test_observation};

async fn seeded_ledger(rows: usize) -> openclaw_mem_storage::LibsqlLedger {
    let ledger = open_test_ledger().await;
    for i in 0..rows {
        let id = ledger
            .insert_observation(test_observation(
                &format!("incident report number {i} about disk pressure and retries"),
                Some("ops"),
            ))
            .await
            .expect("insert");
        ledger
            .upsert_embedding(id, "bench-model", &axis_vector(16, i % 16))
            .await
            .expect("embed");
    }
    ledger
}

fn benchmark_fts_search(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("fts_search");

    for rows in [50, 500] {
        let ledger = rt.block_on(seeded_ledger(rows));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &ledger, |b, ledger| {
            b.to_async(&rt).iter(|| async {
                let hits = ledger
                    .search_fts("disk pressure", 10, &Filter::default())
                    .await
                    .expect("search");
                black_box(hits.len());
            });
        });
    }

    group.finish();
}

fn benchmark_vector_search(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("vector_search");

    for rows in [50, 500] {
        let ledger = rt.block_on(seeded_ledger(rows));
        let query = axis_vector(16, 3);
        group.bench_with_input(
            BenchmarkId::from_parameter(rows),
            &(ledger, query),
            |b, (ledger, query)| {
                b.to_async(&rt).iter(|| async {
                    let hits = ledger
                        .search_vector(query, 10, "bench-model", &Filter::default())
                        .await
                        .expect("search");
                    black_box(hits.len());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_fts_search, benchmark_vector_search);
criterion_main!(benches);
