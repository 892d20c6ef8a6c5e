//! `search`, `vsearch`, and `hybrid` (spec §6): lexical-only, raw
//! vector, and full hybrid recall.

use serde::Serialize;

use openclaw_mem_core::receipts::{clamp_max_items, RecallReceipt, TierCount, Verbosity};
use openclaw_mem_core::retrieval::{self, RecallRequest};
use openclaw_mem_core::storage_trait::{Filter, ScoredId};
use openclaw_mem_core::LedgerStore;

use crate::context::Context;
use crate::output::Output;

/// A scored hit alongside its summary, for human-readable rendering.
#[derive(Debug, Serialize)]
pub struct ScoredHit {
    pub id: i64,
    pub score: f64,
    pub summary: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub hits: Vec<ScoredHit>,
}

impl Output for SearchResult {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        for hit in &self.hits {
            writeln!(
                writer,
                "#{} ({:.4}) {}",
                hit.id,
                hit.score,
                hit.summary.as_deref().unwrap_or("")
            )?;
        }
        Ok(())
    }
}

async fn hydrate(ctx: &Context, hits: &[ScoredId]) -> anyhow::Result<Vec<ScoredHit>> {
    let ids: Vec<i64> = hits.iter().map(|h| h.id).collect();
    let rows = ctx.ledger.get_by_ids(&ids).await?;
    Ok(hits
        .iter()
        .zip(rows)
        .map(|(hit, row)| ScoredHit {
            id: hit.id,
            score: hit.score,
            summary: row.map(|o| o.summary),
        })
        .collect())
}

/// `search <query> [--limit N] [--scope S]` — FTS-only (spec §6).
pub async fn run_search(
    ctx: &Context,
    query: &str,
    limit: usize,
    scope: Option<String>,
) -> anyhow::Result<SearchResult> {
    let filter = Filter {
        scope,
        ..Default::default()
    };
    let hits = ctx.ledger.search_fts(query, limit, &filter).await?;
    Ok(SearchResult {
        hits: hydrate(ctx, &hits).await?,
    })
}

/// `vsearch --query-vector-json <json>|--query-vector-file <path>
/// [--limit N]` — raw vector search (spec §6).
pub async fn run_vsearch(
    ctx: &Context,
    query_vector: &[f32],
    limit: usize,
) -> anyhow::Result<SearchResult> {
    let model = ctx.embedding_model();
    let hits = ctx
        .ledger
        .search_vector(query_vector, limit, &model, &Filter::default())
        .await?;
    Ok(SearchResult {
        hits: hydrate(ctx, &hits).await?,
    })
}

#[derive(Debug, Serialize)]
pub struct HybridResult {
    pub receipt: RecallReceipt,
    pub hits: Vec<ScoredHit>,
}

impl Output for HybridResult {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        if self.receipt.skipped {
            writeln!(
                writer,
                "skipped: {}",
                self.receipt.skip_reason.as_deref().unwrap_or("unknown")
            )?;
            return Ok(());
        }
        writeln!(
            writer,
            "scope: {} ({:?})",
            self.receipt.scope, self.receipt.scope_mode
        )?;
        for hit in &self.hits {
            writeln!(
                writer,
                "#{} ({:.4}) {}",
                hit.id,
                hit.score,
                hit.summary.as_deref().unwrap_or("")
            )?;
        }
        if !self.receipt.rejected.is_empty() {
            writeln!(writer, "rejected: {}", self.receipt.rejected.join(", "))?;
        }
        Ok(())
    }
}

/// `hybrid <query> [--query-en <q>] [--limit N]` — full hybrid recall
/// (spec §4.5, §6). `query_en` is accepted for API parity with the
/// bilingual recall contract but is only used as a fallback query text
/// when `query` alone turns up nothing, since the retrieval core fuses a
/// single query vector per call.
pub async fn run_hybrid(
    ctx: &Context,
    query: &str,
    query_en: Option<&str>,
    limit: usize,
    scope: Option<String>,
) -> anyhow::Result<HybridResult> {
    if query.trim().is_empty() {
        let resolved = retrieval::resolve_scope(scope.as_deref(), query);
        let receipt = RecallReceipt::skipped("no_query", resolved.scope, resolved.mode);
        return Ok(HybridResult {
            receipt,
            hits: Vec::new(),
        });
    }

    if let Some(reason) = openclaw_mem_core::policy::trivial::classify_default(query) {
        let resolved = retrieval::resolve_scope(scope.as_deref(), query);
        let receipt = RecallReceipt::skipped(reason.code(), resolved.scope, resolved.mode);
        return Ok(HybridResult {
            receipt,
            hits: Vec::new(),
        });
    }

    let request = RecallRequest {
        query_text: query.to_string(),
        limit,
        scope,
        importance_labels: None,
        trust_tiers: None,
        multiplier: ctx.config.memory.recall.tier_multiplier,
        embedding_model: ctx.embedding_model(),
    };

    let outcome = retrieval::recall(&ctx.ledger, ctx.embedder.as_ref(), &request).await;
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(_) if query_en.is_some() => {
            let fallback_request = RecallRequest {
                query_text: query_en.unwrap_or(query).to_string(),
                ..request
            };
            retrieval::recall(&ctx.ledger, ctx.embedder.as_ref(), &fallback_request).await?
        }
        Err(err) => return Err(err.into()),
    };

    let hits = hydrate(
        ctx,
        &outcome
            .selected_ids
            .iter()
            .map(|&id| ScoredId { id, score: 0.0 })
            .collect::<Vec<_>>(),
    )
    .await?;

    let tier_counts: Vec<TierCount> = outcome
        .tiers
        .iter()
        .map(|t| TierCount {
            tier: t.tier,
            candidates: t.candidates,
            selected: t.selected,
        })
        .collect();
    let tiers_searched = outcome.tiers.iter().map(|t| t.tier).collect();

    // §4.10: receipt top-N arrays are capped at `max_items`, independent
    // of the (possibly much larger) per-tier candidate-generation width.
    let max_items = clamp_max_items(None);
    let fts_top = outcome.fts_top.into_iter().take(max_items).collect();
    let vec_top = outcome.vec_top.into_iter().take(max_items).collect();
    let fused_top = outcome.fused_top.into_iter().take(max_items).collect();

    let receipt = RecallReceipt {
        schema: RecallReceipt::SCHEMA,
        verbosity: Verbosity::Low,
        skipped: false,
        skip_reason: None,
        rejected: outcome.rejection_reasons,
        scope: outcome.resolved_scope.scope,
        scope_mode: outcome.resolved_scope.mode,
        tiers_searched,
        tier_counts,
        fts_top,
        vec_top,
        fused_top,
        final_count: outcome.selected_ids.len(),
        injected_count: 0,
    };

    Ok(HybridResult { receipt, hits })
}
