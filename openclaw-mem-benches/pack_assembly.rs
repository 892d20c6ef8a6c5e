//! Benchmarks for clamping and context-bundle assembly.

use std::collections::HashSet;
use std::hint::black_box;

use chrono::Utc;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use openclaw_mem_core::clamp::{clamp, ClampConfig};
use openclaw_mem_core::observation::{Detail, Observation, ObservationKind};
use openclaw_mem_core::pack::{pack, Budgets, PackInput};

fn ranked_observations(count: usize) -> Vec<Observation> {
    (0..count)
        .map(|i| Observation {
            id: i as i64,
            ts: Utc::now(),
            kind: ObservationKind::Note,
            tool_name: None,
            summary: format!(
                "observation {i}: retries exhausted while talking to the billing service"
            ),
            detail: Detail::default(),
            content_hash: format!("hash-{i}"),
            session_key: None,
            agent_id: None,
            created_at: Utc::now(),
            archived: false,
            last_used_at: None,
        })
        .collect()
}

fn benchmark_clamp(c: &mut Criterion) {
    let mut group = c.benchmark_group("clamp");
    let config = ClampConfig::default();

    for len in [500, 5_000, 50_000] {
        let text = "x".repeat(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &text, |b, text| {
            b.iter(|| black_box(clamp(text, &config)));
        });
    }

    group.finish();
}

fn benchmark_pack(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack");

    for count in [10, 100, 500] {
        let ranked = ranked_observations(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &ranked, |b, ranked| {
            b.iter(|| {
                let input = PackInput {
                    query_text: "billing service retries".to_string(),
                    scope: "global".to_string(),
                    hot: Vec::new(),
                    ranked,
                    explicit_l2_ids: HashSet::new(),
                    include_low_tier: false,
                    budgets: Budgets::default(),
                };
                black_box(pack(&input));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_clamp, benchmark_pack);
criterion_main!(benches);
