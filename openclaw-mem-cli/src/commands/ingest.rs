//! `ingest --file <path> [--importance-scorer heuristic-v1|off]` (spec §6).

use std::path::Path;

use openclaw_mem_core::config::ImportanceScorer;
use openclaw_mem_core::ingest::IngestReceipt;

use crate::context::Context;
use crate::output::Output;

impl Output for IngestReceipt {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "seen: {}", self.total_seen)?;
        writeln!(writer, "inserted: {}", self.inserted)?;
        writeln!(writer, "skipped (existing): {}", self.skipped_existing)?;
        writeln!(writer, "skipped (disabled): {}", self.skipped_disabled)?;
        writeln!(writer, "scorer errors: {}", self.scorer_errors)?;
        writeln!(writer, "parse errors: {}", self.parse_errors)?;
        for (label, count) in &self.label_counts {
            writeln!(writer, "  {label}: {count}")?;
        }
        Ok(())
    }
}

pub async fn run(
    ctx: &Context,
    file: &Path,
    importance_scorer: Option<ImportanceScorer>,
) -> anyhow::Result<IngestReceipt> {
    let contents = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("reading capture file {}: {e}", file.display()))?;

    let mut config = ctx.config.memory.clone();
    if let Some(scorer) = importance_scorer {
        config.importance_scorer = scorer;
    }

    let receipt =
        openclaw_mem_core::ingest::ingest(&ctx.ledger, contents.lines(), &config).await?;
    Ok(receipt)
}
