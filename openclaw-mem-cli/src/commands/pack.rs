//! `pack --query <q> [--budget-tokens N] [--trace] [--json]` (spec §6):
//! runs hybrid recall, then assembles a bounded, cited context bundle.

use std::collections::HashSet;

use serde::Serialize;

use openclaw_mem_core::observation::Observation;
use openclaw_mem_core::pack::{self, Budgets, PackInput, PackTrace};
use openclaw_mem_core::receipts::PackQuery;
use openclaw_mem_core::retrieval::{self, RecallRequest};
use openclaw_mem_core::LedgerStore;

use crate::context::Context;
use crate::output::Output;

#[derive(Debug, Serialize)]
pub struct PackResult {
    pub bundle_text: String,
    pub included_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<PackTrace>,
}

impl Output for PackResult {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        write!(writer, "{}", self.bundle_text)?;
        if let Some(trace) = &self.trace {
            writeln!(
                writer,
                "--- trace: {} included, {} excluded, {}ms ---",
                trace.output.included_count, trace.output.excluded_count, trace.timing.duration_ms
            )?;
        }
        Ok(())
    }
}

/// `pack --query <q> [--budget-tokens N] [--trace]`. `limit` bounds how
/// many ranked candidates recall hands to the packer before budgeting.
pub async fn run(
    ctx: &Context,
    query: &str,
    scope: Option<String>,
    budget_tokens: Option<usize>,
    limit: usize,
    include_trace: bool,
) -> anyhow::Result<PackResult> {
    let request = RecallRequest {
        query_text: query.to_string(),
        limit,
        scope,
        importance_labels: None,
        trust_tiers: None,
        multiplier: ctx.config.memory.recall.tier_multiplier,
        embedding_model: ctx.embedding_model(),
    };

    let outcome = retrieval::recall(&ctx.ledger, ctx.embedder.as_ref(), &request).await?;

    let rows = ctx.ledger.get_by_ids(&outcome.selected_ids).await?;
    let ranked: Vec<Observation> = rows.into_iter().flatten().collect();

    let mut budgets = ctx.config.memory.pack;
    if let Some(tokens) = budget_tokens {
        budgets.budget_tokens = tokens;
    }
    let budgets: Budgets = budgets;

    let input = PackInput {
        query_text: query.to_string(),
        scope: outcome.resolved_scope.scope.clone(),
        hot: Vec::new(),
        ranked: &ranked,
        explicit_l2_ids: HashSet::new(),
        include_low_tier: false,
        budgets,
    };

    let (bundle, mut trace) = pack::pack(&input);
    trace.query = PackQuery {
        text: query.to_string(),
        scope: outcome.resolved_scope.scope,
        intent: None,
    };

    let included_ids = bundle
        .included
        .iter()
        .map(|item| item.record_ref.id)
        .collect();

    Ok(PackResult {
        bundle_text: bundle.bundle_text,
        included_ids,
        trace: include_trace.then_some(trace),
    })
}
