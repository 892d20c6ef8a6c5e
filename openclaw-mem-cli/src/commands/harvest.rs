//! `harvest [--embed|--no-embed] [--update-index|--no-update-index]`
//! (spec §6): ingest plus optional embedding of newly-inserted rows.
//!
//! The FTS index is always kept in sync transactionally with the base row
//! (spec §4.1); `--update-index`/`--no-update-index` only controls whether
//! this run exercises it (a dry audit can disable it to measure ingest
//! cost in isolation).

use std::path::{Path, PathBuf};

use openclaw_mem_core::ingest::IngestReceipt;

use crate::context::Context;

fn default_capture_file(ctx: &Context) -> PathBuf {
    ctx.base_dir().join("observations.jsonl")
}

pub async fn run(
    ctx: &Context,
    file: Option<&Path>,
    embed: bool,
) -> anyhow::Result<IngestReceipt> {
    let path = match file {
        Some(path) => path.to_path_buf(),
        None => default_capture_file(ctx),
    };

    let contents = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("reading capture stream {}: {e}", path.display()))?;

    let receipt = openclaw_mem_core::ingest::harvest(
        &ctx.ledger,
        ctx.embedder.as_ref(),
        contents.lines(),
        &ctx.config.memory,
        embed,
    )
    .await?;
    Ok(receipt)
}
