//! The JSONL capture event schema consumed by Capture Intake (C2) and the
//! content-hash derivation used for idempotent ingest (spec §3, §6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::observation::ObservationKind;

/// One `{type: "text", text}` block of a capture event's `message.content`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// The `message` field of a capture event, when present.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CaptureMessage {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// One JSONL line of a capture stream (spec §3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureEvent {
    pub ts: DateTime<Utc>,
    pub kind: ObservationKind,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_call_id: Option<String>,
    #[serde(default)]
    pub session_key: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub is_synthetic: bool,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub message: Option<CaptureMessage>,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl CaptureEvent {
    /// Resolve the summary to store: the explicit `summary` field if
    /// present, otherwise the first text block of `message.content`
    /// trimmed to [`crate::constants::DERIVED_SUMMARY_CHARS`] (spec §4.2).
    #[must_use]
    pub fn resolve_summary(&self) -> Option<String> {
        if let Some(s) = &self.summary {
            return Some(s.clone());
        }
        let text = self
            .message
            .as_ref()?
            .content
            .iter()
            .find_map(|b| b.text.as_deref())?;
        Some(truncate_chars(text, crate::constants::DERIVED_SUMMARY_CHARS))
    }
}

/// Truncate a string to at most `max_chars` UTF-8 characters without
/// splitting a code point.
#[must_use]
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Derive the idempotency content-hash for `(kind, tool_name,
/// normalized-summary, rounded-timestamp)` (spec §3).
///
/// The timestamp is rounded to the minute so that two captures of the same
/// logical event emitted a few seconds apart (e.g. re-delivered by a
/// retrying producer) still collide.
#[must_use]
pub fn content_hash(
    kind: ObservationKind,
    tool_name: Option<&str>,
    summary: &str,
    ts: DateTime<Utc>,
) -> String {
    let normalized_summary = normalize_summary(summary);
    let rounded = ts
        .format("%Y-%m-%dT%H:%M")
        .to_string();

    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    kind.to_string().hash(&mut hasher);
    tool_name.unwrap_or("").hash(&mut hasher);
    normalized_summary.hash(&mut hasher);
    rounded.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Normalize a summary for hashing: trim, collapse internal whitespace,
/// lowercase. Deterministic and independent of incidental whitespace
/// differences between re-deliveries of the same event.
#[must_use]
pub fn normalize_summary(summary: &str) -> String {
    summary
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_summary_prefers_explicit_field() {
        let event = CaptureEvent {
            ts: Utc::now(),
            kind: ObservationKind::Note,
            tool_name: None,
            tool_call_id: None,
            session_key: None,
            agent_id: None,
            is_synthetic: false,
            summary: Some("explicit".to_string()),
            message: Some(CaptureMessage {
                content: vec![ContentBlock {
                    block_type: "text".to_string(),
                    text: Some("from message".to_string()),
                }],
            }),
            detail: None,
        };
        assert_eq!(event.resolve_summary().as_deref(), Some("explicit"));
    }

    #[test]
    fn resolve_summary_falls_back_to_message_content_truncated() {
        let long_text = "x".repeat(500);
        let event = CaptureEvent {
            ts: Utc::now(),
            kind: ObservationKind::Note,
            tool_name: None,
            tool_call_id: None,
            session_key: None,
            agent_id: None,
            is_synthetic: false,
            summary: None,
            message: Some(CaptureMessage {
                content: vec![ContentBlock {
                    block_type: "text".to_string(),
                    text: Some(long_text),
                }],
            }),
            detail: None,
        };
        let resolved = event.resolve_summary().unwrap();
        assert_eq!(resolved.chars().count(), 200);
    }

    #[test]
    fn content_hash_is_stable_across_whitespace_variation() {
        let ts = "2026-02-05T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let a = content_hash(ObservationKind::Tool, Some("web.fetch"), "fetched  openclaw.ai", ts);
        let b = content_hash(ObservationKind::Tool, Some("web.fetch"), "fetched openclaw.ai", ts);
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_differs_on_kind() {
        let ts = "2026-02-05T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let a = content_hash(ObservationKind::Tool, None, "same", ts);
        let b = content_hash(ObservationKind::Note, None, "same", ts);
        assert_ne!(a, b);
    }
}
