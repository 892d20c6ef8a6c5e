//! The `LedgerStore` abstraction (spec §4.1) implemented concretely by
//! `openclaw-mem-storage`, kept here so retrieval/ingest logic is generic
//! over the backing store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::observation::{ImportanceLabel, Observation, TrustTier};

/// A filter applied to a single ledger operation. `None` fields are
/// unconstrained.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub importance_labels: Option<Vec<ImportanceLabel>>,
    #[serde(default)]
    pub trust_tiers: Option<Vec<TrustTier>>,
    /// Whether archived rows are included. Defaults to excluded.
    #[serde(default)]
    pub include_archived: bool,
}

/// One scored hit from a lexical or vector search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoredId {
    pub id: i64,
    pub score: f64,
}

/// A row being inserted, prior to id assignment.
#[derive(Debug, Clone)]
pub struct NewObservation {
    pub ts: DateTime<Utc>,
    pub kind: crate::observation::ObservationKind,
    pub tool_name: Option<String>,
    pub summary: String,
    pub detail: crate::observation::Detail,
    pub content_hash: String,
    pub session_key: Option<String>,
    pub agent_id: Option<String>,
}

/// The durable, concurrent-safe store of observations, embeddings, and the
/// lexical index (spec §4.1).
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert one observation, atomically updating the lexical index.
    /// Returns `Error::Duplicate` if `content_hash` is already present
    /// within the idempotency window.
    async fn insert_observation(&self, row: NewObservation) -> Result<i64>;

    /// Attach or replace a model's embedding for an observation.
    async fn upsert_embedding(&self, obs_id: i64, model: &str, vector: &[f32]) -> Result<()>;

    /// Lexical search, ranked bm25-style. Deterministic for a fixed
    /// query + corpus + filter; tie-break by lower id.
    async fn search_fts(&self, query: &str, k: usize, filter: &Filter) -> Result<Vec<ScoredId>>;

    /// Vector search by cosine similarity against a model's embeddings.
    /// Deterministic; tie-break by lower id.
    async fn search_vector(
        &self,
        query_vec: &[f32],
        k: usize,
        model: &str,
        filter: &Filter,
    ) -> Result<Vec<ScoredId>>;

    /// Fetch rows by id, preserving input order. Missing ids yield `None`
    /// slots rather than erroring.
    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Option<Observation>>>;

    /// For each input id, observations within a `±window` time range,
    /// ordered by `(ts, id)`.
    async fn timeline(
        &self,
        ids: &[i64],
        window: chrono::Duration,
    ) -> Result<Vec<Vec<Observation>>>;

    /// Admin listing of rows without vector payloads.
    async fn list_scalars(&self, filter: &Filter, limit: usize) -> Result<Vec<Observation>>;

    /// Soft-delete an observation.
    async fn archive(&self, id: i64) -> Result<()>;

    /// Whether an observation is archived.
    async fn is_archived(&self, id: i64) -> Result<bool>;
}
