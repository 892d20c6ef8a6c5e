//! The canonical row: [`Observation`] and its governance sub-object
//! (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{IMPORTANCE_MUST_REMEMBER, IMPORTANCE_NICE_TO_HAVE};

/// The kind of thing an observation records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    Tool,
    Note,
    Task,
    Error,
    Derived,
}

impl std::fmt::Display for ObservationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ObservationKind::Tool => "tool",
            ObservationKind::Note => "note",
            ObservationKind::Task => "task",
            ObservationKind::Error => "error",
            ObservationKind::Derived => "derived",
        };
        f.write_str(s)
    }
}

/// Deterministic importance label derived from a numeric score (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportanceLabel {
    MustRemember,
    NiceToHave,
    Ignore,
    Unknown,
}

impl ImportanceLabel {
    /// Apply the fixed `score -> label` mapping from spec §3.
    ///
    /// `>= 0.80 -> must_remember`, `>= 0.50 -> nice_to_have`, `< 0.50 ->
    /// ignore`. This function is only ever called with a present score;
    /// absent scores map to `Unknown` by construction elsewhere.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= IMPORTANCE_MUST_REMEMBER {
            ImportanceLabel::MustRemember
        } else if score >= IMPORTANCE_NICE_TO_HAVE {
            ImportanceLabel::NiceToHave
        } else {
            ImportanceLabel::Ignore
        }
    }
}

/// Provenance-driven trust classification (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustTier {
    Trusted,
    Untrusted,
    Quarantined,
    Unknown,
}

/// Where an observation originated (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Operator,
    Tool,
    Web,
    Import,
    System,
}

/// The `importance` governance sub-object (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Importance {
    /// Score in `[0, 1]`.
    pub score: f64,
    /// Deterministic label derived from `score`.
    pub label: ImportanceLabel,
    /// Free-text justification, if graded by a method that produces one.
    #[serde(default)]
    pub rationale: Option<String>,
    /// Name of the grading method, e.g. `"heuristic-v1"` or `"operator"`.
    pub method: String,
    /// Version tag of the grading method.
    pub version: String,
    /// When this importance object was produced.
    pub graded_at: DateTime<Utc>,
}

impl Importance {
    /// Construct an importance object from a score using the deterministic
    /// label mapping, stamping `method`/`version`/`graded_at`.
    #[must_use]
    pub fn graded(
        score: f64,
        rationale: Option<String>,
        method: impl Into<String>,
        version: impl Into<String>,
        graded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            score,
            label: ImportanceLabel::from_score(score),
            rationale,
            method: method.into(),
            version: version.into(),
            graded_at,
        }
    }
}

/// The governance sub-object stored inside `detail` (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Governance {
    /// Absent until graded; never silently overwritten once present
    /// (spec §3 invariant, §4.3 non-destructive rule).
    #[serde(default)]
    pub importance: Option<Importance>,
    /// Logical partition applied as a retrieval filter.
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub trust_tier: Option<TrustTier>,
    #[serde(default)]
    pub source_kind: Option<SourceKind>,
    #[serde(default)]
    pub source_ref: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
}

impl Governance {
    /// The importance label for retrieval-tier purposes: `Unknown` when no
    /// importance has been graded yet.
    #[must_use]
    pub fn label(&self) -> ImportanceLabel {
        self.importance
            .as_ref()
            .map_or(ImportanceLabel::Unknown, |i| i.label)
    }

    /// The effective scope, defaulting to `"global"` (spec §4.5).
    #[must_use]
    pub fn effective_scope(&self) -> &str {
        self.scope.as_deref().unwrap_or("global")
    }

    /// Merge a newly graded/observed governance value into this one
    /// additively: existing fields are never overwritten, only absent
    /// fields are filled (spec §3, §4.3).
    pub fn merge_additive(&mut self, incoming: &Governance) {
        if self.importance.is_none() {
            self.importance = incoming.importance.clone();
        }
        if self.scope.is_none() {
            self.scope = incoming.scope.clone();
        }
        if self.trust_tier.is_none() {
            self.trust_tier = incoming.trust_tier;
        }
        if self.source_kind.is_none() {
            self.source_kind = incoming.source_kind;
        }
        if self.source_ref.is_none() {
            self.source_ref = incoming.source_ref.clone();
        }
        if self.lang.is_none() {
            self.lang = incoming.lang.clone();
        }
    }
}

/// A structured `detail` blob. Every field the core consumes has a typed
/// accessor (below) and a documented default; unknown keys round-trip
/// unchanged via `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Detail {
    #[serde(default)]
    pub governance: Governance,
    /// Arbitrary caller-supplied structured payload (commit metadata,
    /// markdown heading spans, tool output, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The canonical ledger row (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Monotonic, never reused (assigned by the ledger on insert).
    pub id: i64,
    pub ts: DateTime<Utc>,
    pub kind: ObservationKind,
    #[serde(default)]
    pub tool_name: Option<String>,
    /// Immutable after first write; `<= 512` UTF-8 characters.
    pub summary: String,
    #[serde(default)]
    pub detail: Detail,
    /// Derived via [`crate::capture::content_hash`]; used for idempotency.
    pub content_hash: String,
    #[serde(default)]
    pub session_key: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Soft-delete flag; archived rows are excluded from retrieval unless
    /// explicitly included (spec §4.1).
    #[serde(default)]
    pub archived: bool,
    /// Updated on recall inclusion; additive metadata only.
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Observation {
    /// Convenience accessor for the governance scope, defaulting to
    /// `"global"`.
    #[must_use]
    pub fn scope(&self) -> &str {
        self.detail.governance.effective_scope()
    }

    /// Convenience accessor for the importance label.
    #[must_use]
    pub fn importance_label(&self) -> ImportanceLabel {
        self.detail.governance.label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_to_label_mapping_is_deterministic() {
        assert_eq!(
            ImportanceLabel::from_score(0.80),
            ImportanceLabel::MustRemember
        );
        assert_eq!(
            ImportanceLabel::from_score(0.95),
            ImportanceLabel::MustRemember
        );
        assert_eq!(
            ImportanceLabel::from_score(0.50),
            ImportanceLabel::NiceToHave
        );
        assert_eq!(
            ImportanceLabel::from_score(0.79),
            ImportanceLabel::NiceToHave
        );
        assert_eq!(ImportanceLabel::from_score(0.0), ImportanceLabel::Ignore);
        assert_eq!(ImportanceLabel::from_score(0.49), ImportanceLabel::Ignore);
    }

    #[test]
    fn governance_merge_is_additive_only() {
        let mut existing = Governance {
            scope: Some("project-a".to_string()),
            ..Default::default()
        };
        let incoming = Governance {
            scope: Some("project-b".to_string()),
            trust_tier: Some(TrustTier::Trusted),
            ..Default::default()
        };
        existing.merge_additive(&incoming);
        assert_eq!(existing.scope.as_deref(), Some("project-a"));
        assert_eq!(existing.trust_tier, Some(TrustTier::Trusted));
    }

    #[test]
    fn effective_scope_defaults_to_global() {
        let g = Governance::default();
        assert_eq!(g.effective_scope(), "global");
    }
}
