//! The libSQL-backed [`LedgerStore`] implementation.
//!
//! Spec §4.1/§5: a single writer connection is serialized behind a
//! `tokio::sync::Mutex`; readers open their own connection against the
//! same local file and never contend with the writer. A `SQLITE_BUSY`
//! (writer momentarily unavailable, e.g. a checkpoint) is retried with
//! doubling backoff up to `writer_contention.busy_timeout_budget_ms`
//! before surfacing `Error::Contended`. Vector search fetches candidate
//! rows and scores cosine similarity in Rust rather than relying on a
//! vector index extension (spec §4.2 Open Question).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use libsql::{params, Builder, Connection, Database};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use openclaw_mem_core::config::WriterContention;
use openclaw_mem_core::embedding::{bytes_to_vector, cosine_similarity, vector_to_bytes};
use openclaw_mem_core::error::{Error, Result};
use openclaw_mem_core::observation::{
    Detail, ImportanceLabel, Observation, ObservationKind, TrustTier,
};
use openclaw_mem_core::storage_trait::{Filter, LedgerStore, NewObservation, ScoredId};

use crate::{fts, schema};

/// Aggregate counts returned by [`LibsqlLedger::stats`].
#[derive(Debug, Clone, Copy)]
pub struct LedgerStats {
    pub observation_count: i64,
    pub embedding_count: i64,
    pub archived_count: i64,
    pub last_ingest_at: Option<DateTime<Utc>>,
}

/// A libSQL-backed ledger. `db` is shared so readers can each open their
/// own connection; `writer` holds the single connection all mutating
/// statements serialize through.
pub struct LibsqlLedger {
    db: Database,
    writer: Mutex<Connection>,
    writer_contention: WriterContention,
    idempotency_window_hours: i64,
}

impl LibsqlLedger {
    /// Open (creating if absent) a local libSQL database file and run
    /// schema migrations. Safe to call repeatedly.
    pub async fn open(path: &str, writer_contention: WriterContention, idempotency_window_hours: i64) -> Result<Self> {
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| Error::StorageUnavailable(format!("open database: {e}")))?;

        let writer_conn = db
            .connect()
            .map_err(|e| Error::StorageUnavailable(format!("open writer connection: {e}")))?;

        let ledger = Self {
            db,
            writer: Mutex::new(writer_conn),
            writer_contention,
            idempotency_window_hours,
        };

        ledger.migrate().await?;
        Ok(ledger)
    }

    /// Open an in-memory database, for tests.
    pub async fn open_in_memory(idempotency_window_hours: i64) -> Result<Self> {
        let db = Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| Error::StorageUnavailable(format!("open in-memory database: {e}")))?;
        let writer_conn = db
            .connect()
            .map_err(|e| Error::StorageUnavailable(format!("open writer connection: {e}")))?;
        let ledger = Self {
            db,
            writer: Mutex::new(writer_conn),
            writer_contention: WriterContention::default(),
            idempotency_window_hours,
        };
        ledger.migrate().await?;
        Ok(ledger)
    }

    async fn migrate(&self) -> Result<()> {
        let conn = self.writer.lock().await;
        for stmt in [
            schema::CREATE_OBSERVATIONS_TABLE,
            schema::CREATE_OBSERVATIONS_CONTENT_HASH_INDEX,
            schema::CREATE_OBSERVATIONS_SCOPE_IMPORTANCE_INDEX,
            schema::CREATE_OBSERVATIONS_TRUST_TIER_INDEX,
            schema::CREATE_OBSERVATIONS_TS_INDEX,
            schema::CREATE_EMBEDDINGS_TABLE,
            schema::CREATE_EMBEDDINGS_MODEL_INDEX,
            fts::CREATE_OBSERVATIONS_FTS_TABLE,
            fts::CREATE_OBSERVATIONS_FTS_TRIGGERS,
        ] {
            conn.execute_batch(stmt)
                .await
                .map_err(|e| Error::StorageUnavailable(format!("schema migration: {e}")))?;
        }
        Ok(())
    }

    fn reader(&self) -> Result<Connection> {
        self.db
            .connect()
            .map_err(|e| Error::StorageUnavailable(format!("open reader connection: {e}")))
    }

    /// Aggregate counts for the `status` command: live observation count,
    /// embedding count, and the most recent `created_at` (spec §6
    /// `status`).
    pub async fn stats(&self) -> Result<LedgerStats> {
        let conn = self.reader()?;

        let mut rows = conn
            .query(
                "SELECT COUNT(*), MAX(created_at) FROM observations WHERE archived = 0",
                (),
            )
            .await
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?;
        let (observation_count, last_ingest_at) = match rows
            .next()
            .await
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?
        {
            Some(row) => {
                let count: i64 = row.get(0).map_err(map_row_err)?;
                let last_secs: Option<i64> = row.get(1).map_err(map_row_err)?;
                (count, last_secs.map(timestamp).transpose()?)
            }
            None => (0, None),
        };

        let mut rows = conn
            .query("SELECT COUNT(*) FROM embeddings", ())
            .await
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?;
        let embedding_count: i64 = match rows
            .next()
            .await
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?
        {
            Some(row) => row.get(0).map_err(map_row_err)?,
            None => 0,
        };

        let mut rows = conn
            .query("SELECT COUNT(*) FROM observations WHERE archived = 1", ())
            .await
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?;
        let archived_count: i64 = match rows
            .next()
            .await
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?
        {
            Some(row) => row.get(0).map_err(map_row_err)?,
            None => 0,
        };

        Ok(LedgerStats {
            observation_count,
            embedding_count,
            archived_count,
            last_ingest_at,
        })
    }

    /// Run a mutating statement on the shared writer connection, retrying
    /// on `SQLITE_BUSY` with doubling backoff bounded by
    /// `busy_timeout_budget_ms` (spec §5 writer-contention Design Note).
    async fn with_writer<F, Fut, T>(&self, op: F) -> Result<T>
    where
        F: Fn(Connection) -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, libsql::Error>>,
    {
        let conn = self.writer.lock().await;
        let mut delay = Duration::from_millis(self.writer_contention.initial_backoff_ms);
        let budget = Duration::from_millis(self.writer_contention.busy_timeout_budget_ms);
        let mut waited = Duration::ZERO;

        loop {
            match op(conn.clone()).await {
                Ok(value) => return Ok(value),
                Err(e) if is_busy(&e) => {
                    if waited >= budget {
                        warn!("writer busy-timeout exhausted after {:?}", waited);
                        return Err(Error::Contended);
                    }
                    debug!(?delay, "writer busy, backing off");
                    tokio::time::sleep(delay).await;
                    waited += delay;
                    delay = (delay * 2).min(budget);
                }
                Err(e) => return Err(Error::StorageUnavailable(e.to_string())),
            }
        }
    }
}

fn is_busy(err: &libsql::Error) -> bool {
    let msg = err.to_string().to_lowercase();
    msg.contains("database is locked") || msg.contains("busy")
}

fn row_to_observation(row: &libsql::Row) -> Result<Observation> {
    let id: i64 = row.get(0).map_err(map_row_err)?;
    let ts_secs: i64 = row.get(1).map_err(map_row_err)?;
    let kind_str: String = row.get(2).map_err(map_row_err)?;
    let tool_name: Option<String> = row.get(3).map_err(map_row_err)?;
    let summary: String = row.get(4).map_err(map_row_err)?;
    let detail_json: String = row.get(5).map_err(map_row_err)?;
    let content_hash: String = row.get(6).map_err(map_row_err)?;
    let session_key: Option<String> = row.get(7).map_err(map_row_err)?;
    let agent_id: Option<String> = row.get(8).map_err(map_row_err)?;
    let created_at_secs: i64 = row.get(9).map_err(map_row_err)?;
    let archived: i64 = row.get(10).map_err(map_row_err)?;
    let last_used_at_secs: Option<i64> = row.get(11).map_err(map_row_err)?;

    let detail: Detail = serde_json::from_str(&detail_json)?;

    Ok(Observation {
        id,
        ts: timestamp(ts_secs)?,
        kind: parse_kind(&kind_str)?,
        tool_name,
        summary,
        detail,
        content_hash,
        session_key,
        agent_id,
        created_at: timestamp(created_at_secs)?,
        archived: archived != 0,
        last_used_at: last_used_at_secs.map(timestamp).transpose()?,
    })
}

fn map_row_err(e: libsql::Error) -> Error {
    Error::StorageUnavailable(format!("row decode: {e}"))
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| Error::StorageUnavailable(format!("invalid timestamp: {secs}")))
}

fn parse_kind(s: &str) -> Result<ObservationKind> {
    match s {
        "tool" => Ok(ObservationKind::Tool),
        "note" => Ok(ObservationKind::Note),
        "task" => Ok(ObservationKind::Task),
        "error" => Ok(ObservationKind::Error),
        "derived" => Ok(ObservationKind::Derived),
        other => Err(Error::StorageUnavailable(format!("unknown kind: {other}"))),
    }
}

fn importance_label_code(label: ImportanceLabel) -> &'static str {
    match label {
        ImportanceLabel::MustRemember => "must_remember",
        ImportanceLabel::NiceToHave => "nice_to_have",
        ImportanceLabel::Ignore => "ignore",
        ImportanceLabel::Unknown => "unknown",
    }
}

fn trust_tier_code(tier: TrustTier) -> &'static str {
    match tier {
        TrustTier::Trusted => "trusted",
        TrustTier::Untrusted => "untrusted",
        TrustTier::Quarantined => "quarantined",
        TrustTier::Unknown => "unknown",
    }
}

fn filter_clause(filter: &Filter, start_param: usize) -> (String, Vec<libsql::Value>) {
    let mut clauses = Vec::new();
    let mut params_out = Vec::new();
    let mut idx = start_param;

    if let Some(scope) = &filter.scope {
        clauses.push(format!("scope = ?{idx}"));
        params_out.push(libsql::Value::Text(scope.clone()));
        idx += 1;
    }
    if let Some(labels) = &filter.importance_labels {
        if !labels.is_empty() {
            let placeholders: Vec<String> = labels
                .iter()
                .map(|_| {
                    let p = format!("?{idx}");
                    idx += 1;
                    p
                })
                .collect();
            clauses.push(format!("importance_label IN ({})", placeholders.join(", ")));
            for label in labels {
                params_out.push(libsql::Value::Text(importance_label_code(*label).to_string()));
            }
        }
    }
    if let Some(tiers) = &filter.trust_tiers {
        if !tiers.is_empty() {
            let placeholders: Vec<String> = tiers
                .iter()
                .map(|_| {
                    let p = format!("?{idx}");
                    idx += 1;
                    p
                })
                .collect();
            clauses.push(format!("trust_tier IN ({})", placeholders.join(", ")));
            for tier in tiers {
                params_out.push(libsql::Value::Text(trust_tier_code(*tier).to_string()));
            }
        }
    }
    if !filter.include_archived {
        clauses.push("archived = 0".to_string());
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" AND {}", clauses.join(" AND "))
    };
    (where_sql, params_out)
}

#[async_trait]
impl LedgerStore for LibsqlLedger {
    async fn insert_observation(&self, row: NewObservation) -> Result<i64> {
        let cutoff = (row.ts - chrono::Duration::hours(self.idempotency_window_hours)).timestamp();
        let content_hash = row.content_hash.clone();

        let reader = self.reader()?;
        let mut existing = reader
            .query(
                "SELECT id FROM observations WHERE content_hash = ?1 AND created_at >= ?2 LIMIT 1",
                params![content_hash.clone(), cutoff],
            )
            .await
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?;
        if existing
            .next()
            .await
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?
            .is_some()
        {
            return Err(Error::Duplicate);
        }

        let detail_json = serde_json::to_string(&row.detail)?;
        let scope = row.detail.governance.effective_scope().to_string();
        let label = importance_label_code(row.detail.governance.label()).to_string();
        let trust_tier =
            trust_tier_code(row.detail.governance.trust_tier.unwrap_or(TrustTier::Unknown)).to_string();
        let now = Utc::now().timestamp();

        let sql = r#"
            INSERT INTO observations (
                ts, kind, tool_name, summary, detail, content_hash,
                session_key, agent_id, scope, importance_label, trust_tier, created_at, archived
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0)
        "#;

        let id = self
            .with_writer(move |conn| {
                let sql = sql;
                let kind_str = row.kind.to_string();
                let tool_name = row.tool_name.clone();
                let summary = row.summary.clone();
                let detail_json = detail_json.clone();
                let content_hash = content_hash.clone();
                let session_key = row.session_key.clone();
                let agent_id = row.agent_id.clone();
                let scope = scope.clone();
                let label = label.clone();
                let trust_tier = trust_tier.clone();
                let ts = row.ts.timestamp();
                async move {
                    conn.execute(
                        sql,
                        params![
                            ts, kind_str, tool_name, summary, detail_json, content_hash,
                            session_key, agent_id, scope, label, trust_tier, now
                        ],
                    )
                    .await?;
                    Ok(conn.last_insert_rowid())
                }
            })
            .await?;

        Ok(id)
    }

    async fn upsert_embedding(&self, obs_id: i64, model: &str, vector: &[f32]) -> Result<()> {
        let reader = self.reader()?;
        let mut exists = reader
            .query("SELECT 1 FROM observations WHERE id = ?1", params![obs_id])
            .await
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?;
        if exists
            .next()
            .await
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?
            .is_none()
        {
            return Err(Error::UnknownObservation(obs_id));
        }

        let mut existing_dim = reader
            .query(
                "SELECT dimension FROM embeddings WHERE model = ?1 LIMIT 1",
                params![model],
            )
            .await
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?;
        if let Some(row) = existing_dim
            .next()
            .await
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?
        {
            let declared: i64 = row.get(0).map_err(map_row_err)?;
            let declared = usize::try_from(declared).unwrap_or(usize::MAX);
            if declared != vector.len() {
                return Err(Error::DimensionMismatch {
                    expected: declared,
                    actual: vector.len(),
                });
            }
        }

        let dimension = i64::try_from(vector.len()).unwrap_or(i64::MAX);
        let bytes = vector_to_bytes(vector);
        let checksum = i64::from(openclaw_mem_core::embedding::checksum_f32(vector));
        let model = model.to_string();

        self.with_writer(move |conn| {
            let bytes = bytes.clone();
            let model = model.clone();
            async move {
                conn.execute(
                    r#"
                    INSERT INTO embeddings (observation_id, model, dimension, vector, checksum)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(observation_id, model) DO UPDATE SET
                        dimension = excluded.dimension,
                        vector = excluded.vector,
                        checksum = excluded.checksum
                    "#,
                    params![obs_id, model, dimension, bytes, checksum],
                )
                .await
                .map(|_| ())
            }
        })
        .await
    }

    async fn search_fts(&self, query: &str, k: usize, filter: &Filter) -> Result<Vec<ScoredId>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.reader()?;
        let (where_sql, extra_params) = filter_clause(filter, 3);
        let sql = format!(
            r#"
            SELECT o.id, bm25(observations_fts) AS rank
            FROM observations_fts
            JOIN observations o ON o.id = observations_fts.rowid
            WHERE observations_fts MATCH ?1 {where_sql}
            ORDER BY rank ASC, o.id ASC
            LIMIT ?2
            "#
        );

        let mut call_params: Vec<libsql::Value> = vec![
            libsql::Value::Text(query.to_string()),
        ];
        let k_i64 = i64::try_from(k).unwrap_or(i64::MAX);
        call_params.push(libsql::Value::Integer(k_i64));
        call_params.extend(extra_params);

        let mut rows = match conn.query(&sql, libsql::params_from_iter(call_params)).await {
            Ok(rows) => rows,
            Err(_) => return Ok(Vec::new()),
        };

        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::StorageUnavailable(e.to_string()))? {
            let id: i64 = row.get(0).map_err(map_row_err)?;
            let bm25: f64 = row.get(1).map_err(map_row_err)?;
            // bm25() is more-negative-is-better; invert to a positive score.
            out.push(ScoredId { id, score: -bm25 });
        }
        Ok(out)
    }

    async fn search_vector(
        &self,
        query_vec: &[f32],
        k: usize,
        model: &str,
        filter: &Filter,
    ) -> Result<Vec<ScoredId>> {
        if query_vec.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.reader()?;
        let (where_sql, extra_params) = filter_clause(filter, 2);
        let sql = format!(
            r#"
            SELECT o.id, e.vector
            FROM embeddings e
            JOIN observations o ON o.id = e.observation_id
            WHERE e.model = ?1 {where_sql}
            "#
        );

        let mut call_params: Vec<libsql::Value> = vec![libsql::Value::Text(model.to_string())];
        call_params.extend(extra_params);

        let mut rows = conn
            .query(&sql, libsql::params_from_iter(call_params))
            .await
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?;

        let mut scored = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::StorageUnavailable(e.to_string()))? {
            let id: i64 = row.get(0).map_err(map_row_err)?;
            let blob: Vec<u8> = row.get(1).map_err(map_row_err)?;
            let vector = bytes_to_vector(&blob);
            let score = cosine_similarity(query_vec, &vector);
            scored.push(ScoredId { id, score: f64::from(score) });
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        scored.truncate(k);
        Ok(scored)
    }

    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Option<Observation>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.reader()?;
        let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            r#"
            SELECT id, ts, kind, tool_name, summary, detail, content_hash,
                   session_key, agent_id, created_at, archived, last_used_at
            FROM observations WHERE id IN ({})
            "#,
            placeholders.join(", ")
        );

        let call_params: Vec<libsql::Value> = ids.iter().map(|id| libsql::Value::Integer(*id)).collect();
        let mut rows = conn
            .query(&sql, libsql::params_from_iter(call_params))
            .await
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?;

        let mut found = std::collections::HashMap::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::StorageUnavailable(e.to_string()))? {
            let obs = row_to_observation(&row)?;
            found.insert(obs.id, obs);
        }

        Ok(ids.iter().map(|id| found.get(id).cloned()).collect())
    }

    async fn timeline(&self, ids: &[i64], window: chrono::Duration) -> Result<Vec<Vec<Observation>>> {
        let anchors = self.get_by_ids(ids).await?;
        let conn = self.reader()?;
        let mut out = Vec::with_capacity(anchors.len());

        for anchor in anchors {
            let Some(anchor) = anchor else {
                out.push(Vec::new());
                continue;
            };
            let lo = (anchor.ts - window).timestamp();
            let hi = (anchor.ts + window).timestamp();

            let mut rows = conn
                .query(
                    r#"
                    SELECT id, ts, kind, tool_name, summary, detail, content_hash,
                           session_key, agent_id, created_at, archived, last_used_at
                    FROM observations
                    WHERE ts >= ?1 AND ts <= ?2 AND archived = 0
                    ORDER BY ts ASC, id ASC
                    "#,
                    params![lo, hi],
                )
                .await
                .map_err(|e| Error::StorageUnavailable(e.to_string()))?;

            let mut window_obs = Vec::new();
            while let Some(row) = rows.next().await.map_err(|e| Error::StorageUnavailable(e.to_string()))? {
                window_obs.push(row_to_observation(&row)?);
            }
            out.push(window_obs);
        }

        Ok(out)
    }

    async fn list_scalars(&self, filter: &Filter, limit: usize) -> Result<Vec<Observation>> {
        let conn = self.reader()?;
        let (where_sql, extra_params) = filter_clause(filter, 2);
        let sql = format!(
            r#"
            SELECT id, ts, kind, tool_name, summary, detail, content_hash,
                   session_key, agent_id, created_at, archived, last_used_at
            FROM observations
            WHERE 1=1 {where_sql}
            ORDER BY ts DESC, id DESC
            LIMIT ?1
            "#
        );

        let mut call_params: Vec<libsql::Value> = vec![libsql::Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX))];
        call_params.extend(extra_params);

        let mut rows = conn
            .query(&sql, libsql::params_from_iter(call_params))
            .await
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::StorageUnavailable(e.to_string()))? {
            out.push(row_to_observation(&row)?);
        }
        Ok(out)
    }

    async fn archive(&self, id: i64) -> Result<()> {
        self.with_writer(move |conn| async move {
            conn.execute("UPDATE observations SET archived = 1 WHERE id = ?1", params![id])
                .await
                .map(|_| ())
        })
        .await
    }

    async fn is_archived(&self, id: i64) -> Result<bool> {
        let conn = self.reader()?;
        let mut rows = conn
            .query("SELECT archived FROM observations WHERE id = ?1", params![id])
            .await
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?;

        match rows.next().await.map_err(|e| Error::StorageUnavailable(e.to_string()))? {
            Some(row) => {
                let archived: i64 = row.get(0).map_err(map_row_err)?;
                Ok(archived != 0)
            }
            None => Err(Error::UnknownObservation(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_row(summary: &str, hash: &str) -> NewObservation {
        NewObservation {
            ts: Utc::now(),
            kind: ObservationKind::Note,
            tool_name: None,
            summary: summary.to_string(),
            detail: Detail::default(),
            content_hash: hash.to_string(),
            session_key: None,
            agent_id: None,
        }
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let ledger = LibsqlLedger::open_in_memory(24).await.unwrap();
        let id = ledger.insert_observation(new_row("hello world", "h1")).await.unwrap();
        let rows = ledger.get_by_ids(&[id]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].as_ref().unwrap().summary, "hello world");
    }

    #[tokio::test]
    async fn duplicate_content_hash_within_window_is_rejected() {
        let ledger = LibsqlLedger::open_in_memory(24).await.unwrap();
        ledger.insert_observation(new_row("a", "dup-hash")).await.unwrap();
        let result = ledger.insert_observation(new_row("a", "dup-hash")).await;
        assert!(matches!(result, Err(Error::Duplicate)));
    }

    #[tokio::test]
    async fn fts_search_finds_inserted_summary() {
        let ledger = LibsqlLedger::open_in_memory(24).await.unwrap();
        ledger
            .insert_observation(new_row("rotate the deployment keys", "h2"))
            .await
            .unwrap();
        let hits = ledger
            .search_fts("deployment", 10, &Filter::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn archive_excludes_from_list_scalars_by_default() {
        let ledger = LibsqlLedger::open_in_memory(24).await.unwrap();
        let id = ledger.insert_observation(new_row("to be archived", "h3")).await.unwrap();
        ledger.archive(id).await.unwrap();
        assert!(ledger.is_archived(id).await.unwrap());
        let rows = ledger.list_scalars(&Filter::default(), 10).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn upsert_embedding_rejects_unknown_observation() {
        let ledger = LibsqlLedger::open_in_memory(24).await.unwrap();
        let result = ledger.upsert_embedding(9999, "m", &[1.0, 0.0]).await;
        assert!(matches!(result, Err(Error::UnknownObservation(9999))));
    }

    #[tokio::test]
    async fn upsert_embedding_rejects_dimension_mismatch() {
        let ledger = LibsqlLedger::open_in_memory(24).await.unwrap();
        let id_a = ledger.insert_observation(new_row("a", "dim-a")).await.unwrap();
        let id_b = ledger.insert_observation(new_row("b", "dim-b")).await.unwrap();
        ledger.upsert_embedding(id_a, "m", &[1.0, 0.0]).await.unwrap();
        let result = ledger.upsert_embedding(id_b, "m", &[1.0, 0.0, 0.0]).await;
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[tokio::test]
    async fn vector_search_ranks_by_cosine_similarity() {
        let ledger = LibsqlLedger::open_in_memory(24).await.unwrap();
        let id_a = ledger.insert_observation(new_row("a", "va")).await.unwrap();
        let id_b = ledger.insert_observation(new_row("b", "vb")).await.unwrap();
        ledger.upsert_embedding(id_a, "m", &[1.0, 0.0]).await.unwrap();
        ledger.upsert_embedding(id_b, "m", &[0.0, 1.0]).await.unwrap();

        let hits = ledger
            .search_vector(&[1.0, 0.0], 10, "m", &Filter::default())
            .await
            .unwrap();
        assert_eq!(hits[0].id, id_a);
    }

    #[tokio::test]
    async fn stats_reflects_inserts_embeddings_and_archives() {
        let ledger = LibsqlLedger::open_in_memory(24).await.unwrap();
        let id_a = ledger.insert_observation(new_row("a", "sa")).await.unwrap();
        let id_b = ledger.insert_observation(new_row("b", "sb")).await.unwrap();
        ledger.upsert_embedding(id_a, "m", &[1.0, 0.0]).await.unwrap();
        ledger.archive(id_b).await.unwrap();

        let stats = ledger.stats().await.unwrap();
        assert_eq!(stats.observation_count, 1);
        assert_eq!(stats.embedding_count, 1);
        assert_eq!(stats.archived_count, 1);
        assert!(stats.last_ingest_at.is_some());
    }
}
