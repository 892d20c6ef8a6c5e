//! SQL schema for the ledger's durable tables.

/// The canonical observations table (spec §3). `detail` and `content_hash`
/// round-trip through JSON/text exactly as produced by `openclaw-mem-core`.
pub const CREATE_OBSERVATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS observations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ts INTEGER NOT NULL,
    kind TEXT NOT NULL,
    tool_name TEXT,
    summary TEXT NOT NULL,
    detail TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    session_key TEXT,
    agent_id TEXT,
    scope TEXT NOT NULL DEFAULT 'global',
    importance_label TEXT NOT NULL DEFAULT 'unknown',
    trust_tier TEXT NOT NULL DEFAULT 'unknown',
    created_at INTEGER NOT NULL,
    archived INTEGER NOT NULL DEFAULT 0,
    last_used_at INTEGER
)
"#;

pub const CREATE_OBSERVATIONS_CONTENT_HASH_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_observations_content_hash
ON observations(content_hash, created_at DESC)
"#;

pub const CREATE_OBSERVATIONS_SCOPE_IMPORTANCE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_observations_scope_importance
ON observations(scope, importance_label, archived)
"#;

pub const CREATE_OBSERVATIONS_TRUST_TIER_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_observations_trust_tier
ON observations(trust_tier)
"#;

pub const CREATE_OBSERVATIONS_TS_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_observations_ts
ON observations(ts)
"#;

/// Per-model embedding vectors, stored as little-endian `f32` blobs
/// (spec §3, §4.1 "fetch-then-score-in-Rust" Design Note).
pub const CREATE_EMBEDDINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS embeddings (
    observation_id INTEGER NOT NULL,
    model TEXT NOT NULL,
    dimension INTEGER NOT NULL,
    vector BLOB NOT NULL,
    lang TEXT,
    checksum INTEGER NOT NULL,
    PRIMARY KEY (observation_id, model),
    FOREIGN KEY (observation_id) REFERENCES observations(id)
)
"#;

pub const CREATE_EMBEDDINGS_MODEL_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_embeddings_model
ON embeddings(model)
"#;
