//! Auto-capture classification: candidate extraction, secret/tool-output
//! rejection, deterministic category keyword matching, and two-signal
//! near-duplicate dedupe (spec §4.7).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::constants::{
    DEFAULT_DEDUPE_SIMILARITY_THRESHOLD, DEFAULT_DUPLICATE_SEARCH_MIN_SCORE,
    DEFAULT_MAX_ITEMS_PER_TURN,
};
use crate::policy::secrets::looks_like_secret;
use crate::policy::trivial::INJECTION_MARKER;

/// A deterministic auto-capture category. Exposed as data (keyword
/// tables below) per the spec's extensibility requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureCategory {
    Todo,
    Decision,
    Preference,
}

/// `todo`-category keyword set: English plus CJK equivalents.
const TODO_KEYWORDS: &[&str] = &[
    "todo", "to-do", "to do", "remind me", "待辦", "待办", "要記得", "要记得", "提醒我",
];

/// `decision`-category keyword set.
const DECISION_KEYWORDS: &[&str] = &[
    "we decided",
    "from now on",
    "let's use",
    "lets use",
    "決定",
    "决定",
    "改成",
    "採用",
    "采用",
];

/// `preference`-category keyword set.
const PREFERENCE_KEYWORDS: &[&str] = &[
    "i prefer",
    "i like",
    "i don't want",
    "i dont want",
    "偏好",
    "我喜歡",
    "我喜欢",
    "我不要",
];

/// Why a candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    SecretLike,
    ToolOutput,
    CategoryNotAllowed,
    DuplicateText,
    DuplicateVector,
    TurnCap,
    NoCategory,
}

/// Operator-tunable knobs for auto-capture (spec §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub allowed_categories: HashSet<CaptureCategory>,
    #[serde(default = "default_dedupe_threshold")]
    pub dedupe_similarity_threshold: f64,
    #[serde(default = "default_duplicate_search_min_score")]
    pub duplicate_search_min_score: f64,
    #[serde(default = "default_max_items_per_turn")]
    pub max_items_per_turn: usize,
    #[serde(default = "default_max_chars_per_item")]
    pub max_chars_per_item: usize,
}

fn default_dedupe_threshold() -> f64 {
    DEFAULT_DEDUPE_SIMILARITY_THRESHOLD
}
fn default_duplicate_search_min_score() -> f64 {
    DEFAULT_DUPLICATE_SEARCH_MIN_SCORE
}
fn default_max_items_per_turn() -> usize {
    DEFAULT_MAX_ITEMS_PER_TURN
}
fn default_max_chars_per_item() -> usize {
    280
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            allowed_categories: [
                CaptureCategory::Todo,
                CaptureCategory::Decision,
                CaptureCategory::Preference,
            ]
            .into_iter()
            .collect(),
            dedupe_similarity_threshold: default_dedupe_threshold(),
            duplicate_search_min_score: default_duplicate_search_min_score(),
            max_items_per_turn: default_max_items_per_turn(),
            max_chars_per_item: default_max_chars_per_item(),
        }
    }
}

/// Split user-role text into candidates: by newline, falling back to
/// sentence boundaries when the text is a single line.
#[must_use]
pub fn split_candidates(text: &str) -> Vec<String> {
    let lines: Vec<String> = text
        .split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    if lines.len() > 1 {
        return lines;
    }

    let single = text.trim();
    if single.is_empty() {
        return Vec::new();
    }

    let sentences: Vec<String> = single
        .split(['.', '!', '?', '。', '！', '？', ';', '；'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if sentences.len() > 1 {
        sentences
    } else {
        vec![single.to_string()]
    }
}

/// Whether `text` looks like captured tool output rather than a user
/// statement worth remembering.
#[must_use]
pub fn looks_like_tool_output(text: &str) -> bool {
    if text.contains("```") {
        return true;
    }
    if text.contains(INJECTION_MARKER) || text.contains("<relevant-memories>") {
        return true;
    }
    let lowered = text.to_lowercase();
    if lowered.contains("stdout") && (lowered.contains("stderr") || lowered.contains("exitcode")) {
        return true;
    }
    if lowered.contains("exit code") || lowered.contains("tool_result") || lowered.contains("tool output:")
    {
        return true;
    }
    false
}

/// Classify a candidate's category by deterministic keyword lookup.
/// Checked in `todo`, `decision`, `preference` order; the first matching
/// category wins.
#[must_use]
pub fn classify_category(text: &str) -> Option<CaptureCategory> {
    let lowered = text.to_lowercase();
    if TODO_KEYWORDS.iter().any(|k| lowered.contains(k) || text.contains(k)) {
        return Some(CaptureCategory::Todo);
    }
    if DECISION_KEYWORDS
        .iter()
        .any(|k| lowered.contains(k) || text.contains(k))
    {
        return Some(CaptureCategory::Decision);
    }
    if PREFERENCE_KEYWORDS
        .iter()
        .any(|k| lowered.contains(k) || text.contains(k))
    {
        return Some(CaptureCategory::Preference);
    }
    None
}

/// Token-Jaccard similarity over normalized (lowercased, whitespace-split)
/// text, in `[0, 1]`.
#[must_use]
pub fn token_jaccard_similarity(a: &str, b: &str) -> f64 {
    let tokens = |s: &str| -> HashSet<String> {
        s.to_lowercase().split_whitespace().map(str::to_string).collect()
    };
    let set_a = tokens(a);
    let set_b = tokens(b);
    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// One candidate's classification result.
#[derive(Debug, Clone)]
pub struct ClassifiedCandidate {
    pub text: String,
    pub category: Option<CaptureCategory>,
    pub accepted: bool,
    pub reject_reason: Option<RejectReason>,
}

/// Classify every candidate of a turn, applying text-level rejection
/// rules, category filtering, within-turn text-Jaccard dedupe against
/// already-accepted candidates, and the per-turn cap. `near_duplicate` is
/// a caller-supplied vector-similarity lookup against the existing store
/// (async lookups happen outside this pure function).
pub fn classify_turn(
    user_text: &str,
    config: &CaptureConfig,
    existing_texts: &[String],
    mut near_duplicate: impl FnMut(&str) -> bool,
) -> Vec<ClassifiedCandidate> {
    let mut accepted_texts: Vec<String> = Vec::new();
    let mut accepted_count = 0usize;
    let mut results = Vec::new();

    for candidate in split_candidates(user_text) {
        if looks_like_secret(&candidate) {
            results.push(ClassifiedCandidate {
                text: candidate,
                category: None,
                accepted: false,
                reject_reason: Some(RejectReason::SecretLike),
            });
            continue;
        }

        if looks_like_tool_output(&candidate) {
            results.push(ClassifiedCandidate {
                text: candidate,
                category: None,
                accepted: false,
                reject_reason: Some(RejectReason::ToolOutput),
            });
            continue;
        }

        let category = classify_category(&candidate);
        let Some(category) = category else {
            results.push(ClassifiedCandidate {
                text: candidate,
                category: None,
                accepted: false,
                reject_reason: Some(RejectReason::NoCategory),
            });
            continue;
        };

        if !config.allowed_categories.contains(&category) {
            results.push(ClassifiedCandidate {
                text: candidate,
                category: Some(category),
                accepted: false,
                reject_reason: Some(RejectReason::CategoryNotAllowed),
            });
            continue;
        }

        if accepted_count >= config.max_items_per_turn {
            results.push(ClassifiedCandidate {
                text: candidate,
                category: Some(category),
                accepted: false,
                reject_reason: Some(RejectReason::TurnCap),
            });
            continue;
        }

        let is_text_duplicate = accepted_texts
            .iter()
            .chain(existing_texts.iter())
            .any(|seen| token_jaccard_similarity(seen, &candidate) >= config.dedupe_similarity_threshold);
        if is_text_duplicate {
            results.push(ClassifiedCandidate {
                text: candidate,
                category: Some(category),
                accepted: false,
                reject_reason: Some(RejectReason::DuplicateText),
            });
            continue;
        }

        if near_duplicate(&candidate) {
            results.push(ClassifiedCandidate {
                text: candidate,
                category: Some(category),
                accepted: false,
                reject_reason: Some(RejectReason::DuplicateVector),
            });
            continue;
        }

        let truncated = crate::capture::truncate_chars(&candidate, config.max_chars_per_item);
        accepted_texts.push(truncated.clone());
        accepted_count += 1;
        results.push(ClassifiedCandidate {
            text: truncated,
            category: Some(category),
            accepted: true,
            reject_reason: None,
        });
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_like_text_is_rejected() {
        let results = classify_turn(
            "sk-AAAA1111BBBB2222CCCC3333DDDD4444",
            &CaptureConfig::default(),
            &[],
            |_| false,
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].reject_reason, Some(RejectReason::SecretLike));
    }

    #[test]
    fn preference_and_todo_are_both_captured_when_allowed() {
        let results = classify_turn(
            "I prefer dark mode\nTODO rotate keys",
            &CaptureConfig::default(),
            &[],
            |_| false,
        );
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.accepted));
        assert_eq!(results[0].category, Some(CaptureCategory::Preference));
        assert_eq!(results[1].category, Some(CaptureCategory::Todo));
    }

    #[test]
    fn semicolon_joined_clauses_split_into_separate_candidates() {
        let results = classify_turn(
            "I prefer dark mode; also TODO rotate keys",
            &CaptureConfig::default(),
            &[],
            |_| false,
        );
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.accepted));
        assert_eq!(results[0].category, Some(CaptureCategory::Preference));
        assert_eq!(results[1].category, Some(CaptureCategory::Todo));
    }

    #[test]
    fn per_turn_cap_is_enforced() {
        let mut config = CaptureConfig::default();
        config.max_items_per_turn = 1;
        let results = classify_turn(
            "TODO rotate keys\nTODO rotate again",
            &config,
            &[],
            |_| false,
        );
        assert!(results[0].accepted);
        assert_eq!(results[1].reject_reason, Some(RejectReason::TurnCap));
    }

    #[test]
    fn vector_near_duplicate_hook_rejects_candidate() {
        let results = classify_turn(
            "TODO rotate keys",
            &CaptureConfig::default(),
            &[],
            |_| true,
        );
        assert_eq!(results[0].reject_reason, Some(RejectReason::DuplicateVector));
    }

    #[test]
    fn tool_output_is_rejected() {
        assert!(looks_like_tool_output("```\nstdout: ok\n```"));
        assert!(looks_like_tool_output("exit code 1, stderr: boom"));
    }

    #[test]
    fn jaccard_similarity_of_identical_text_is_one() {
        assert!((token_jaccard_similarity("hello world", "hello world") - 1.0).abs() < 1e-9);
    }
}
