//! The Context Packer (spec §4.6): assembles a bounded, cited context
//! bundle from already-ranked retrieval output, plus a `pack.trace.v1`
//! receipt.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

use crate::constants::{
    DEFAULT_BUDGET_TOKENS, DEFAULT_MAX_ITEMS, DEFAULT_MAX_L2_ITEMS, DEFAULT_NICE_CAP,
};
use crate::observation::{ImportanceLabel, Observation, TrustTier};
use crate::receipts::{
    CandidateDecision, CandidateScores, PackBudgets, PackCandidate, PackOutputCounts, PackQuery,
    PackTiming, PackTrace, RecordRef,
};

/// Estimate the token cost of `text` as `ceil(chars / 4)`, minimum 1
/// (spec §4.6).
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    let chars = text.chars().count();
    if chars == 0 {
        return 0;
    }
    chars.div_ceil(4).max(1)
}

/// Budgets governing one pack operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Budgets {
    pub budget_tokens: usize,
    pub max_items: usize,
    pub max_l2_items: usize,
    pub nice_cap: usize,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            budget_tokens: DEFAULT_BUDGET_TOKENS,
            max_items: DEFAULT_MAX_ITEMS,
            max_l2_items: DEFAULT_MAX_L2_ITEMS,
            nice_cap: DEFAULT_NICE_CAP,
        }
    }
}

/// Inputs to one pack operation.
pub struct PackInput<'a> {
    pub query_text: String,
    pub scope: String,
    /// Protected fresh-tail snippets, already formatted, preserved
    /// unmodified ahead of everything else.
    pub hot: Vec<String>,
    /// Retrieval output in rank order (must-first, as returned by the
    /// tiered plan).
    pub ranked: &'a [Observation],
    /// Ids explicitly requested for L2 (raw detail) inclusion.
    pub explicit_l2_ids: HashSet<i64>,
    /// Whether unknown/ignore-tier items may be included at all (only
    /// when the caller explicitly asked for low-tier items).
    pub include_low_tier: bool,
    pub budgets: Budgets,
}

/// One bundle line with its citation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncludedItem {
    pub record_ref: RecordRef,
    pub rationale_codes: Vec<String>,
    pub text: String,
}

/// The assembled bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    pub bundle_text: String,
    pub included: Vec<IncludedItem>,
}

/// Per-item summary length bound applied before token budgeting.
const MAX_ITEM_SUMMARY_CHARS: usize = 280;

/// Pack a bounded, cited bundle plus its trace receipt.
#[must_use]
pub fn pack(input: &PackInput<'_>) -> (Bundle, PackTrace) {
    let start = Instant::now();

    let mut remaining_tokens = input.budgets.budget_tokens;
    let mut included: Vec<IncludedItem> = Vec::new();
    let mut candidates: Vec<PackCandidate> = Vec::new();
    let mut nice_included = 0usize;
    let mut l2_included = 0usize;

    for hot_line in &input.hot {
        let cost = estimate_tokens(hot_line);
        if cost > remaining_tokens || included.len() >= input.budgets.max_items {
            break;
        }
        remaining_tokens -= cost;
        included.push(IncludedItem {
            record_ref: RecordRef { id: 0 },
            rationale_codes: vec!["fresh_tail".to_string()],
            text: hot_line.clone(),
        });
    }

    for observation in input.ranked {
        let label = observation.importance_label();
        let mut reasons = Vec::new();
        let mut caps = Vec::new();
        let mut include = true;

        if included.len() >= input.budgets.max_items {
            include = false;
            reasons.push("max_items".to_string());
            caps.push("max_items".to_string());
        }

        if include && matches!(label, ImportanceLabel::Unknown | ImportanceLabel::Ignore) && !input.include_low_tier {
            include = false;
            reasons.push("not_explicit_low_tier".to_string());
        }

        if include && label == ImportanceLabel::NiceToHave {
            if nice_included >= input.budgets.nice_cap {
                include = false;
                reasons.push("nice_cap".to_string());
                caps.push("nice_cap".to_string());
            }
        }

        let truncated = truncate_summary(&observation.summary, MAX_ITEM_SUMMARY_CHARS);
        let cost = estimate_tokens(&truncated);
        if include && cost > remaining_tokens {
            include = false;
            reasons.push("budget_exhausted".to_string());
            caps.push("budget_tokens".to_string());
        }

        let mut layer = "l1".to_string();
        if include {
            remaining_tokens -= cost;
            if label == ImportanceLabel::NiceToHave {
                nice_included += 1;
            }
            let mut rationale_codes = vec![format!("tier:{}", label_code(label))];
            let mut text = truncated;

            if input.explicit_l2_ids.contains(&observation.id)
                && l2_included < input.budgets.max_l2_items
            {
                let raw_detail = serde_json::to_string(&observation.detail.extra).unwrap_or_default();
                if !observation.detail.extra.is_empty() {
                    let l2_cost = estimate_tokens(&raw_detail);
                    if l2_cost <= remaining_tokens {
                        remaining_tokens -= l2_cost;
                        text.push('\n');
                        text.push_str(&raw_detail);
                        rationale_codes.push("layer:l2".to_string());
                        layer = "l2".to_string();
                        l2_included += 1;
                    }
                }
            }

            included.push(IncludedItem {
                record_ref: RecordRef { id: observation.id },
                rationale_codes,
                text,
            });
            reasons.push("included".to_string());
        }

        candidates.push(PackCandidate {
            id: observation.id,
            layer,
            importance: label,
            trust: observation
                .detail
                .governance
                .trust_tier
                .unwrap_or(TrustTier::Unknown),
            scores: CandidateScores {
                fts: None,
                vector: None,
                fused: 0.0,
            },
            decision: CandidateDecision {
                included: include,
                reason: reasons,
                caps,
            },
            citations: RecordRef { id: observation.id },
        });
    }

    let bundle_text = included
        .iter()
        .map(|item| item.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let excluded_count = candidates.iter().filter(|c| !c.decision.included).count();

    let trace = PackTrace {
        schema: PackTrace::SCHEMA,
        ts: Utc::now(),
        version: PackTrace::VERSION,
        query: PackQuery {
            text: input.query_text.clone(),
            scope: input.scope.clone(),
            intent: None,
        },
        budgets: PackBudgets {
            budget_tokens: input.budgets.budget_tokens,
            max_items: input.budgets.max_items,
            max_l2_items: input.budgets.max_l2_items,
            nice_cap: input.budgets.nice_cap,
        },
        lanes: vec!["fts".to_string(), "vector".to_string()],
        candidates,
        output: PackOutputCounts {
            included_count: included.len(),
            excluded_count,
            l2_included_count: l2_included,
            citations_count: included.len(),
        },
        timing: PackTiming {
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        },
    };

    (
        Bundle {
            bundle_text,
            included,
        },
        trace,
    )
}

fn truncate_summary(summary: &str, max_chars: usize) -> String {
    crate::capture::truncate_chars(summary, max_chars)
}

fn label_code(label: ImportanceLabel) -> &'static str {
    match label {
        ImportanceLabel::MustRemember => "must",
        ImportanceLabel::NiceToHave => "nice",
        ImportanceLabel::Ignore => "ignore",
        ImportanceLabel::Unknown => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::{Detail, ObservationKind};

    fn obs(id: i64, label: ImportanceLabel, summary: &str) -> Observation {
        let mut detail = Detail::default();
        if label != ImportanceLabel::Unknown {
            detail.governance.importance = Some(crate::observation::Importance::graded(
                match label {
                    ImportanceLabel::MustRemember => 0.9,
                    ImportanceLabel::NiceToHave => 0.6,
                    ImportanceLabel::Ignore => 0.1,
                    ImportanceLabel::Unknown => unreachable!(),
                },
                None,
                "heuristic-v1",
                "1.0.0",
                Utc::now(),
            ));
        }
        Observation {
            id,
            ts: Utc::now(),
            kind: ObservationKind::Note,
            tool_name: None,
            summary: summary.to_string(),
            detail,
            content_hash: format!("hash-{id}"),
            session_key: None,
            agent_id: None,
            created_at: Utc::now(),
            archived: false,
            last_used_at: None,
        }
    }

    #[test]
    fn must_items_are_included_before_nice_items() {
        let ranked = vec![
            obs(1, ImportanceLabel::NiceToHave, "nice one"),
            obs(2, ImportanceLabel::MustRemember, "must one"),
        ];
        let input = PackInput {
            query_text: "q".to_string(),
            scope: "global".to_string(),
            hot: Vec::new(),
            ranked: &ranked,
            explicit_l2_ids: HashSet::new(),
            include_low_tier: false,
            budgets: Budgets::default(),
        };
        let (bundle, _trace) = pack(&input);
        assert_eq!(bundle.included.len(), 2);
    }

    #[test]
    fn unknown_tier_excluded_unless_explicitly_requested() {
        let ranked = vec![obs(1, ImportanceLabel::Unknown, "mystery item")];
        let input = PackInput {
            query_text: "q".to_string(),
            scope: "global".to_string(),
            hot: Vec::new(),
            ranked: &ranked,
            explicit_l2_ids: HashSet::new(),
            include_low_tier: false,
            budgets: Budgets::default(),
        };
        let (bundle, trace) = pack(&input);
        assert!(bundle.included.is_empty());
        assert!(!trace.candidates[0].decision.included);
    }

    #[test]
    fn nice_cap_limits_nice_to_have_inclusion() {
        let ranked: Vec<Observation> = (0..5)
            .map(|i| obs(i, ImportanceLabel::NiceToHave, "nice item"))
            .collect();
        let mut budgets = Budgets::default();
        budgets.nice_cap = 2;
        let input = PackInput {
            query_text: "q".to_string(),
            scope: "global".to_string(),
            hot: Vec::new(),
            ranked: &ranked,
            explicit_l2_ids: HashSet::new(),
            include_low_tier: false,
            budgets,
        };
        let (bundle, _trace) = pack(&input);
        assert_eq!(bundle.included.len(), 2);
    }

    #[test]
    fn token_budget_stops_inclusion_once_exhausted() {
        let ranked: Vec<Observation> = (0..50)
            .map(|i| obs(i, ImportanceLabel::MustRemember, &"x".repeat(100)))
            .collect();
        let mut budgets = Budgets::default();
        budgets.budget_tokens = 30;
        let input = PackInput {
            query_text: "q".to_string(),
            scope: "global".to_string(),
            hot: Vec::new(),
            ranked: &ranked,
            explicit_l2_ids: HashSet::new(),
            include_low_tier: false,
            budgets,
        };
        let (bundle, trace) = pack(&input);
        assert!(bundle.included.len() < 50);
        assert!(trace
            .candidates
            .iter()
            .any(|c| c.decision.reason.contains(&"budget_exhausted".to_string())));
    }

    #[test]
    fn explicit_l2_request_appends_raw_detail_into_the_bundle() {
        let mut detail = Detail::default();
        detail.governance.importance = Some(crate::observation::Importance::graded(
            0.9,
            None,
            "heuristic-v1",
            "1.0.0",
            Utc::now(),
        ));
        detail
            .extra
            .insert("tool_call_id".to_string(), serde_json::json!("abc123"));
        let observation = Observation {
            id: 1,
            ts: Utc::now(),
            kind: ObservationKind::Tool,
            tool_name: Some("git".to_string()),
            summary: "ran git status".to_string(),
            detail,
            content_hash: "hash-1".to_string(),
            session_key: None,
            agent_id: None,
            created_at: Utc::now(),
            archived: false,
            last_used_at: None,
        };
        let ranked = vec![observation];
        let mut explicit_l2_ids = HashSet::new();
        explicit_l2_ids.insert(1);
        let input = PackInput {
            query_text: "q".to_string(),
            scope: "global".to_string(),
            hot: Vec::new(),
            ranked: &ranked,
            explicit_l2_ids,
            include_low_tier: false,
            budgets: Budgets::default(),
        };
        let (bundle, trace) = pack(&input);
        assert_eq!(trace.candidates[0].layer, "l2");
        assert_eq!(trace.output.l2_included_count, 1);
        assert!(bundle.included[0].text.contains("tool_call_id"));
        assert!(bundle.bundle_text.contains("abc123"));
    }

    #[test]
    fn estimate_tokens_is_chars_over_four_minimum_one() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens(&"a".repeat(8)), 2);
    }
}
