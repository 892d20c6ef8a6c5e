//! Heuristic importance autograde (`heuristic-v1`, spec §4.2).
//!
//! A pure function `(kind, tool_name, summary, detail) -> {score, label,
//! rationale}`. Only ever fills an absent importance object — callers must
//! check `Governance::importance.is_none()` before invoking this (spec §4.2,
//! §4.3 non-destructive rule).

use crate::observation::{Detail, Importance, ObservationKind};
use chrono::Utc;

/// Name of this grading method, stamped into every `Importance` it
/// produces.
pub const METHOD_NAME: &str = "heuristic-v1";
/// Version tag of this grading method.
pub const METHOD_VERSION: &str = "1.0.0";

/// Keyword signals bumping the score upward, paired with their weight.
/// Exposed as data per the spec's Open Question on extensible tables.
const POSITIVE_SIGNALS: &[(&str, f64)] = &[
    ("decided", 0.25),
    ("remember", 0.25),
    ("important", 0.2),
    ("always", 0.15),
    ("never", 0.15),
    ("prefer", 0.15),
    ("todo", 0.15),
    ("reminder", 0.15),
    ("failed", 0.1),
    ("error", 0.1),
    ("fixed", 0.1),
];

/// Keyword signals bumping the score downward.
const NEGATIVE_SIGNALS: &[(&str, f64)] = &[("heartbeat", 0.4), ("ping", 0.2), ("ack", 0.2)];

/// Grade an observation's importance from its kind, tool name, summary, and
/// detail blob. Deterministic: identical inputs always produce an
/// identical score/label/rationale.
#[must_use]
pub fn grade(
    kind: ObservationKind,
    tool_name: Option<&str>,
    summary: &str,
    _detail: &Detail,
) -> Importance {
    let lowered = summary.to_lowercase();

    let mut score = base_score_for_kind(kind);

    for (needle, weight) in POSITIVE_SIGNALS {
        if lowered.contains(needle) {
            score += weight;
        }
    }
    for (needle, weight) in NEGATIVE_SIGNALS {
        if lowered.contains(needle) {
            score -= weight;
        }
    }

    if matches!(tool_name, Some(name) if name.starts_with("graph.capture")) {
        // Index-only captures are useful but rarely worth surfacing
        // unprompted.
        score -= 0.1;
    }

    let score = score.clamp(0.0, 1.0);

    let rationale = format!(
        "heuristic-v1: base={:.2} kind={} matched_signals_applied",
        base_score_for_kind(kind),
        kind
    );

    Importance::graded(score, Some(rationale), METHOD_NAME, METHOD_VERSION, Utc::now())
}

fn base_score_for_kind(kind: ObservationKind) -> f64 {
    match kind {
        ObservationKind::Task => 0.55,
        ObservationKind::Error => 0.55,
        ObservationKind::Note => 0.40,
        ObservationKind::Tool => 0.30,
        ObservationKind::Derived => 0.25,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::ImportanceLabel;

    #[test]
    fn decision_language_pushes_toward_must_remember() {
        let importance = grade(
            ObservationKind::Note,
            None,
            "we decided to always use postgres from now on",
            &Detail::default(),
        );
        assert_eq!(importance.label, ImportanceLabel::MustRemember);
    }

    #[test]
    fn heartbeat_like_tool_output_is_low_importance() {
        let importance = grade(
            ObservationKind::Tool,
            Some("cron.heartbeat"),
            "heartbeat ok",
            &Detail::default(),
        );
        assert_eq!(importance.label, ImportanceLabel::Ignore);
    }

    #[test]
    fn grading_is_deterministic() {
        let detail = Detail::default();
        let a = grade(ObservationKind::Task, Some("x"), "todo: rotate keys", &detail);
        let b = grade(ObservationKind::Task, Some("x"), "todo: rotate keys", &detail);
        assert_eq!(a.score, b.score);
        assert_eq!(a.label, b.label);
    }

    #[test]
    fn score_is_always_in_bounds() {
        let importance = grade(
            ObservationKind::Note,
            None,
            "decided important always never prefer todo reminder failed error fixed",
            &Detail::default(),
        );
        assert!(importance.score <= 1.0);
        assert!(importance.score >= 0.0);
    }
}
