//! Versioned, bounded, redaction-safe receipt shapes (spec §4.10, §6).
//!
//! Each shape's `schema` field is a fixed literal set at construction time,
//! so a receipt can never be built with the wrong schema tag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_RECEIPT_MAX_ITEMS, RECEIPT_MAX_ITEMS_CEILING};
use crate::observation::{ImportanceLabel, TrustTier};
use crate::retrieval::ScopeMode;
use crate::storage_trait::ScoredId;

/// Verbosity tier for a receipt: `high` adds tier-label arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    #[default]
    Low,
    High,
}

/// Clamp a caller-requested top-N item count to the declared ceiling
/// (spec §4.10: `max_items ∈ [1, 10]`).
#[must_use]
pub fn clamp_max_items(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(DEFAULT_RECEIPT_MAX_ITEMS)
        .clamp(1, RECEIPT_MAX_ITEMS_CEILING)
}

/// Why a recall tier was not searched, or a candidate was excluded.
pub type RejectionReason = String;

/// `recall.receipt.v1` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallReceipt {
    pub schema: &'static str,
    pub verbosity: Verbosity,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    pub rejected: Vec<RejectionReason>,
    pub scope: String,
    pub scope_mode: ScopeMode,
    pub tiers_searched: Vec<ImportanceLabel>,
    pub tier_counts: Vec<TierCount>,
    pub fts_top: Vec<ScoredId>,
    pub vec_top: Vec<ScoredId>,
    pub fused_top: Vec<i64>,
    pub final_count: usize,
    pub injected_count: usize,
}

/// Per-tier `{tier, selected}` summary inside a recall receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierCount {
    pub tier: ImportanceLabel,
    pub candidates: usize,
    pub selected: usize,
}

impl RecallReceipt {
    pub const SCHEMA: &'static str = "recall.receipt.v1";

    /// Build a "skipped" receipt (empty query, trivial prompt, etc.) with
    /// no retrieval having taken place.
    #[must_use]
    pub fn skipped(reason: impl Into<String>, scope: impl Into<String>, scope_mode: ScopeMode) -> Self {
        Self {
            schema: Self::SCHEMA,
            verbosity: Verbosity::Low,
            skipped: true,
            skip_reason: Some(reason.into()),
            rejected: Vec::new(),
            scope: scope.into(),
            scope_mode,
            tiers_searched: Vec::new(),
            tier_counts: Vec::new(),
            fts_top: Vec::new(),
            vec_top: Vec::new(),
            fused_top: Vec::new(),
            final_count: 0,
            injected_count: 0,
        }
    }
}

/// Breakdown of rejected auto-capture candidates by reason.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FilteredOutCounts {
    pub tool_output: usize,
    pub secrets_like: usize,
    pub duplicate: usize,
}

/// `autoCapture.receipt.v1` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoCaptureReceipt {
    pub schema: &'static str,
    pub verbosity: Verbosity,
    pub candidate_extraction_count: usize,
    pub filtered_out: FilteredOutCounts,
    pub stored_count: usize,
}

impl AutoCaptureReceipt {
    pub const SCHEMA: &'static str = "autoCapture.receipt.v1";

    #[must_use]
    pub fn new(
        candidate_extraction_count: usize,
        filtered_out: FilteredOutCounts,
        stored_count: usize,
    ) -> Self {
        Self {
            schema: Self::SCHEMA,
            verbosity: Verbosity::Low,
            candidate_extraction_count,
            filtered_out,
            stored_count,
        }
    }
}

/// Token/item budgets applied to a packed context bundle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PackBudgets {
    pub budget_tokens: usize,
    pub max_items: usize,
    pub max_l2_items: usize,
    pub nice_cap: usize,
}

/// The `query` sub-object of a pack trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackQuery {
    pub text: String,
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
}

/// Per-candidate scoring detail inside a pack trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateScores {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fts: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<f64>,
    pub fused: f64,
}

/// Why a candidate was included or excluded, plus any caps it hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDecision {
    pub included: bool,
    pub reason: Vec<String>,
    pub caps: Vec<String>,
}

/// A record pointer with no raw content, used for citations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordRef {
    pub id: i64,
}

/// A single candidate row's full trace entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackCandidate {
    pub id: i64,
    /// `"l1"` (summary) or `"l2"` (raw detail).
    pub layer: String,
    pub importance: ImportanceLabel,
    pub trust: TrustTier,
    pub scores: CandidateScores,
    pub decision: CandidateDecision,
    pub citations: RecordRef,
}

/// Final bundle-level counters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PackOutputCounts {
    pub included_count: usize,
    pub excluded_count: usize,
    pub l2_included_count: usize,
    pub citations_count: usize,
}

/// Wall-clock timing of the pack operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PackTiming {
    pub duration_ms: u64,
}

/// `pack.trace.v1` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackTrace {
    pub schema: &'static str,
    pub ts: DateTime<Utc>,
    pub version: &'static str,
    pub query: PackQuery,
    pub budgets: PackBudgets,
    pub lanes: Vec<String>,
    pub candidates: Vec<PackCandidate>,
    pub output: PackOutputCounts,
    pub timing: PackTiming,
}

impl PackTrace {
    pub const SCHEMA: &'static str = "pack.trace.v1";
    pub const VERSION: &'static str = "1";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recall_receipt_schema_is_fixed() {
        let receipt = RecallReceipt::skipped("trivial_prompt", "global", ScopeMode::Global);
        assert_eq!(receipt.schema, "recall.receipt.v1");
        assert!(receipt.skipped);
    }

    #[test]
    fn max_items_is_clamped_to_declared_ceiling() {
        assert_eq!(clamp_max_items(Some(100)), RECEIPT_MAX_ITEMS_CEILING);
        assert_eq!(clamp_max_items(Some(0)), 1);
        assert_eq!(clamp_max_items(None), DEFAULT_RECEIPT_MAX_ITEMS);
    }

    #[test]
    fn auto_capture_receipt_schema_is_fixed() {
        let receipt = AutoCaptureReceipt::new(2, FilteredOutCounts::default(), 0);
        assert_eq!(receipt.schema, "autoCapture.receipt.v1");
    }
}
