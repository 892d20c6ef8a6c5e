//! Capture Intake (C2) + Ingest/Harvest Pipeline (C3): idempotent batch
//! insertion from append-only JSONL capture streams, with optional
//! embedding of newly-inserted rows (spec §4.2, §4.3).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::capture::CaptureEvent;
use crate::config::{ImportanceScorer, MemoryConfig};
use crate::embeddings_client::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::observation::{Detail, ImportanceLabel, Observation, ObservationKind};
use crate::storage_trait::{LedgerStore, NewObservation};

/// Aggregate result of [`ingest`] / [`harvest`] (spec §4.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestReceipt {
    pub total_seen: usize,
    pub inserted: usize,
    /// One slot per input line, in input order. `None` for lines that were
    /// skipped (duplicate, disabled, or unparseable).
    pub ids: Vec<Option<i64>>,
    pub skipped_existing: usize,
    pub skipped_disabled: usize,
    pub scorer_errors: usize,
    pub parse_errors: usize,
    pub label_counts: HashMap<String, usize>,
    /// Set by [`harvest`] only: rows for which the embedding call failed.
    #[serde(default)]
    pub embed_failures: usize,
    /// Set by [`harvest`] only: rows successfully embedded.
    #[serde(default)]
    pub embedded: usize,
}

impl IngestReceipt {
    fn record_label(&mut self, label: ImportanceLabel) {
        *self.label_counts.entry(label_code(label).to_string()).or_insert(0) += 1;
    }
}

fn label_code(label: ImportanceLabel) -> &'static str {
    match label {
        ImportanceLabel::MustRemember => "must_remember",
        ImportanceLabel::NiceToHave => "nice_to_have",
        ImportanceLabel::Ignore => "ignore",
        ImportanceLabel::Unknown => "unknown",
    }
}

/// A successfully-inserted row, kept around so [`harvest`] can embed it
/// without a round-trip read back through the store.
struct Inserted {
    id: i64,
    text: String,
}

/// Parse one capture line into a [`NewObservation`] plus its resolved
/// importance label, applying redaction and (if enabled) heuristic
/// autograde. Returns `Ok(None)` for a structurally valid but
/// schema-incomplete line (missing/unextractable summary) so the caller
/// can fail-open per record.
fn build_new_observation(
    raw_line: &str,
    importance_scorer: ImportanceScorer,
) -> Result<Option<(NewObservation, ImportanceLabel)>> {
    let event: CaptureEvent = serde_json::from_str(raw_line)?;

    let Some(summary) = event.resolve_summary() else {
        return Ok(None);
    };
    let redacted_summary = crate::redact::redact(&summary);
    let truncated_summary =
        crate::capture::truncate_chars(&redacted_summary, crate::constants::MAX_SUMMARY_CHARS);

    let mut detail: Detail = match &event.detail {
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_default(),
        None => Detail::default(),
    };

    if detail.governance.importance.is_none() && matches!(importance_scorer, ImportanceScorer::HeuristicV1) {
        let graded = crate::importance::grade(
            event.kind,
            event.tool_name.as_deref(),
            &truncated_summary,
            &detail,
        );
        detail.governance.importance = Some(graded);
    }

    let label = detail.governance.label();

    let content_hash = crate::capture::content_hash(
        event.kind,
        event.tool_name.as_deref(),
        &truncated_summary,
        event.ts,
    );

    let new_observation = NewObservation {
        ts: event.ts,
        kind: event.kind,
        tool_name: event.tool_name.clone(),
        summary: truncated_summary,
        detail,
        content_hash,
        session_key: event.session_key.clone(),
        agent_id: event.agent_id.clone(),
    };

    Ok(Some((new_observation, label)))
}

/// Ingest a batch of JSONL capture lines (spec §4.3 `ingest`). Input
/// order is preserved in `receipt.ids`; per-line failures are recorded in
/// the receipt rather than aborting the batch.
pub async fn ingest<S: LedgerStore + ?Sized>(
    store: &S,
    lines: impl IntoIterator<Item = impl AsRef<str>>,
    config: &MemoryConfig,
) -> Result<IngestReceipt> {
    let mut receipt = IngestReceipt::default();

    for raw_line in lines {
        let raw_line = raw_line.as_ref();
        receipt.total_seen += 1;
        if raw_line.trim().is_empty() {
            receipt.ids.push(None);
            continue;
        }

        let parsed = build_new_observation(raw_line, config.importance_scorer);
        let Ok(parsed) = parsed else {
            receipt.parse_errors += 1;
            receipt.ids.push(None);
            continue;
        };
        let Some((new_observation, label)) = parsed else {
            receipt.scorer_errors += 1;
            receipt.ids.push(None);
            continue;
        };

        match store.insert_observation(new_observation).await {
            Ok(id) => {
                receipt.inserted += 1;
                receipt.record_label(label);
                receipt.ids.push(Some(id));
            }
            Err(Error::Duplicate) => {
                receipt.skipped_existing += 1;
                receipt.ids.push(None);
            }
            Err(Error::SchemaViolation(_)) => {
                receipt.scorer_errors += 1;
                receipt.ids.push(None);
            }
            Err(other) => return Err(other),
        }
    }

    Ok(receipt)
}

/// Ingest, then optionally embed newly-inserted rows in insertion order,
/// yielding between batches of `config.ingest.embed_batch_size` so
/// concurrent readers are not starved (spec §4.3, §5).
pub async fn harvest<S, E>(
    store: &S,
    embedder: Option<&E>,
    lines: impl IntoIterator<Item = impl AsRef<str>>,
    config: &MemoryConfig,
    embed: bool,
) -> Result<IngestReceipt>
where
    S: LedgerStore + ?Sized,
    E: EmbeddingProvider + ?Sized,
{
    let raw_lines: Vec<String> = lines.into_iter().map(|l| l.as_ref().to_string()).collect();

    // Re-derive each line's resolved text alongside the ingest call so the
    // embedding loop below doesn't need a second store round-trip; only
    // lines that actually got inserted are embedded.
    let mut pending: Vec<(usize, String)> = Vec::new();
    for (idx, raw_line) in raw_lines.iter().enumerate() {
        if let Ok(Some((new_observation, _))) = build_new_observation(raw_line, config.importance_scorer) {
            pending.push((idx, new_observation.summary));
        }
    }

    let mut receipt = ingest(store, raw_lines.iter(), config).await?;

    if !embed {
        return Ok(receipt);
    }
    let Some(embedder) = embedder else {
        return Ok(receipt);
    };

    let mut to_embed: Vec<Inserted> = Vec::new();
    for (idx, text) in pending {
        if let Some(Some(id)) = receipt.ids.get(idx) {
            to_embed.push(Inserted { id: *id, text });
        }
    }

    for batch in to_embed.chunks(config.ingest.embed_batch_size) {
        let texts: Vec<String> = batch
            .iter()
            .map(|row| crate::clamp::clamp(&row.text, &config.clamp).text)
            .collect();

        match embedder.embed_batch(&texts).await {
            Ok(vectors) => {
                for (row, vector) in batch.iter().zip(vectors.into_iter()) {
                    match store
                        .upsert_embedding(row.id, embedder.model_name(), &vector)
                        .await
                    {
                        Ok(()) => receipt.embedded += 1,
                        Err(_) => receipt.embed_failures += 1,
                    }
                }
            }
            Err(_) => {
                receipt.embed_failures += batch.len();
            }
        }

        tokio::task::yield_now().await;
    }

    Ok(receipt)
}

/// Explicit `store <text>` write path (spec §6): not derived from a
/// capture stream, so it bypasses redaction-as-JSONL-parsing and takes
/// already-plain text directly. Still applies the same
/// non-destructive-governance and heuristic-autograde rules as ingest.
#[allow(clippy::too_many_arguments)]
pub fn build_explicit_observation(
    text: &str,
    kind: ObservationKind,
    scope: Option<String>,
    importance_score: Option<f64>,
    ts: chrono::DateTime<chrono::Utc>,
    importance_scorer: ImportanceScorer,
) -> NewObservation {
    let redacted = crate::redact::redact(text);
    let summary = crate::capture::truncate_chars(&redacted, crate::constants::MAX_SUMMARY_CHARS);

    let mut detail = Detail::default();
    detail.governance.scope = scope;

    detail.governance.importance = match importance_score {
        Some(score) => Some(crate::observation::Importance::graded(
            score,
            Some("operator-supplied".to_string()),
            "operator",
            "1.0.0",
            ts,
        )),
        None if matches!(importance_scorer, ImportanceScorer::HeuristicV1) => {
            Some(crate::importance::grade(kind, None, &summary, &detail))
        }
        None => None,
    };

    let content_hash = crate::capture::content_hash(kind, None, &summary, ts);

    NewObservation {
        ts,
        kind,
        tool_name: None,
        summary,
        detail,
        content_hash,
        session_key: None,
        agent_id: None,
    }
}

/// Compute a dump-and-reingest round trip's JSONL lines from a corpus,
/// used by the `export` command and by the §8 round-trip property test.
/// Intentionally omits `id`/`created_at`/`last_used_at` so re-ingesting
/// the dump assigns fresh ids without colliding with the original row's
/// content-hash window semantics being misread as identity.
#[must_use]
pub fn dump_line(observation: &Observation) -> String {
    let event = serde_json::json!({
        "ts": observation.ts,
        "kind": observation.kind,
        "tool_name": observation.tool_name,
        "summary": observation.summary,
        "detail": serde_json::to_value(&observation.detail).unwrap_or_default(),
        "session_key": observation.session_key,
        "agent_id": observation.agent_id,
    });
    event.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeStore {
        rows: Mutex<Vec<NewObservation>>,
        seen_hashes: Mutex<std::collections::HashSet<String>>,
    }

    impl FakeStore {
        fn new() -> Self {
            Self {
                rows: Mutex::new(Vec::new()),
                seen_hashes: Mutex::new(std::collections::HashSet::new()),
            }
        }
    }

    #[async_trait]
    impl LedgerStore for FakeStore {
        async fn insert_observation(&self, row: NewObservation) -> Result<i64> {
            let mut hashes = self.seen_hashes.lock().unwrap();
            if hashes.contains(&row.content_hash) {
                return Err(Error::Duplicate);
            }
            hashes.insert(row.content_hash.clone());
            let mut rows = self.rows.lock().unwrap();
            rows.push(row);
            Ok(rows.len() as i64)
        }
        async fn upsert_embedding(&self, _obs_id: i64, _model: &str, _vector: &[f32]) -> Result<()> {
            Ok(())
        }
        async fn search_fts(
            &self,
            _query: &str,
            _k: usize,
            _filter: &crate::storage_trait::Filter,
        ) -> Result<Vec<crate::storage_trait::ScoredId>> {
            Ok(Vec::new())
        }
        async fn search_vector(
            &self,
            _query_vec: &[f32],
            _k: usize,
            _model: &str,
            _filter: &crate::storage_trait::Filter,
        ) -> Result<Vec<crate::storage_trait::ScoredId>> {
            Ok(Vec::new())
        }
        async fn get_by_ids(&self, _ids: &[i64]) -> Result<Vec<Option<Observation>>> {
            Ok(Vec::new())
        }
        async fn timeline(
            &self,
            _ids: &[i64],
            _window: chrono::Duration,
        ) -> Result<Vec<Vec<Observation>>> {
            Ok(Vec::new())
        }
        async fn list_scalars(
            &self,
            _filter: &crate::storage_trait::Filter,
            _limit: usize,
        ) -> Result<Vec<Observation>> {
            Ok(Vec::new())
        }
        async fn archive(&self, _id: i64) -> Result<()> {
            Ok(())
        }
        async fn is_archived(&self, _id: i64) -> Result<bool> {
            Ok(false)
        }
    }

    fn line(ts: &str, summary: &str) -> String {
        format!(r#"{{"ts":"{ts}","kind":"note","summary":"{summary}"}}"#)
    }

    #[tokio::test]
    async fn ingest_preserves_input_order_in_ids() {
        let store = FakeStore::new();
        let config = MemoryConfig::default();
        let lines = vec![
            line("2026-02-05T10:00:00Z", "first"),
            line("2026-02-05T10:01:00Z", "second"),
        ];
        let receipt = ingest(&store, lines, &config).await.unwrap();
        assert_eq!(receipt.inserted, 2);
        assert_eq!(receipt.ids, vec![Some(1), Some(2)]);
    }

    #[tokio::test]
    async fn rerunning_ingest_on_same_lines_is_a_no_op_on_counts() {
        let store = FakeStore::new();
        let config = MemoryConfig::default();
        let lines = vec![line("2026-02-05T10:00:00Z", "first")];
        let first = ingest(&store, lines.clone(), &config).await.unwrap();
        assert_eq!(first.inserted, 1);

        let second = ingest(&store, lines, &config).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped_existing, 1);
    }

    #[tokio::test]
    async fn malformed_line_is_counted_and_does_not_abort_batch() {
        let store = FakeStore::new();
        let config = MemoryConfig::default();
        let lines = vec!["not json".to_string(), line("2026-02-05T10:00:00Z", "ok")];
        let receipt = ingest(&store, lines, &config).await.unwrap();
        assert_eq!(receipt.parse_errors, 1);
        assert_eq!(receipt.inserted, 1);
    }
}
