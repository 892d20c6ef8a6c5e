//! `status` (spec §6): DB stats, embedding counts, last-ingest time.

use serde::Serialize;

use crate::context::Context;
use crate::output::Output;

#[derive(Debug, Serialize)]
pub struct StatusResult {
    pub db_path: String,
    pub observation_count: i64,
    pub embedding_count: i64,
    pub archived_count: i64,
    pub last_ingest_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Output for StatusResult {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "db: {}", self.db_path)?;
        writeln!(writer, "observations: {}", self.observation_count)?;
        writeln!(writer, "embeddings: {}", self.embedding_count)?;
        writeln!(writer, "archived: {}", self.archived_count)?;
        match &self.last_ingest_at {
            Some(ts) => writeln!(writer, "last ingest: {ts}")?,
            None => writeln!(writer, "last ingest: never")?,
        }
        Ok(())
    }
}

pub async fn run(ctx: &Context) -> anyhow::Result<StatusResult> {
    let stats = ctx.ledger.stats().await?;
    Ok(StatusResult {
        db_path: ctx.config.db_path(),
        observation_count: stats.observation_count,
        embedding_count: stats.embedding_count,
        archived_count: stats.archived_count,
        last_ingest_at: stats.last_ingest_at,
    })
}
