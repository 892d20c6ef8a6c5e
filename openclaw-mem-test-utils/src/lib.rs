//! Shared fixtures for exercising the ledger and retrieval/pack pipelines
//! without repeating boilerplate across `openclaw-mem-core`,
//! `openclaw-mem-storage`, and the end-to-end test suite.

use chrono::{DateTime, Utc};

use openclaw_mem_core::capture::content_hash;
use openclaw_mem_core::observation::{Detail, ObservationKind};
use openclaw_mem_core::storage_trait::NewObservation;
use openclaw_mem_storage::LibsqlLedger;

/// Build a minimal, valid `NewObservation` for a `note` with the given
/// summary and scope, timestamped now.
pub fn test_observation(summary: &str, scope: Option<&str>) -> NewObservation {
    test_observation_at(summary, scope, Utc::now())
}

/// Same as [`test_observation`] but at a caller-chosen timestamp, for
/// tests that need deterministic ordering or timeline windows.
pub fn test_observation_at(
    summary: &str,
    scope: Option<&str>,
    ts: DateTime<Utc>,
) -> NewObservation {
    let mut detail = Detail::default();
    detail.governance.scope = scope.map(str::to_string);

    NewObservation {
        ts,
        kind: ObservationKind::Note,
        tool_name: None,
        summary: summary.to_string(),
        content_hash: content_hash(ObservationKind::Note, None, summary, ts),
        detail,
        session_key: None,
        agent_id: None,
    }
}

/// A deterministic, non-random unit vector of the given dimension with
/// a single `1.0` at `axis`, useful for exercising cosine-similarity
/// ranking without depending on an external embedding provider.
#[must_use]
pub fn axis_vector(dimension: usize, axis: usize) -> Vec<f32> {
    let mut v = vec![0.0_f32; dimension];
    if axis < dimension {
        v[axis] = 1.0;
    }
    v
}

/// Open a fresh in-memory ledger with a generous idempotency window,
/// suitable for a single test's lifetime.
pub async fn open_test_ledger() -> LibsqlLedger {
    LibsqlLedger::open_in_memory(24)
        .await
        .expect("opening in-memory ledger")
}
