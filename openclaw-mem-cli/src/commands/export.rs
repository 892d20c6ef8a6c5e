//! `export --to <path> [--yes]` (spec §6): durable JSONL export of the
//! full ledger, gated behind an explicit confirmation flag since it
//! copies governed content outside the ledger's access controls.

use std::path::Path;

use serde::Serialize;

use openclaw_mem_core::ingest::dump_line;
use openclaw_mem_core::storage_trait::Filter;
use openclaw_mem_core::{Error, LedgerStore};

use crate::context::Context;
use crate::output::Output;

#[derive(Debug, Serialize)]
pub struct ExportResult {
    pub path: String,
    pub exported_count: usize,
}

impl Output for ExportResult {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "exported {} observations to {}", self.exported_count, self.path)?;
        Ok(())
    }
}

/// `export --to <path> [--yes]`. Without `--yes`, fails with
/// `Error::ConsentRequired` rather than silently no-oping, since a
/// missing confirmation is a caller mistake, not an empty-ledger state.
pub async fn run(ctx: &Context, to: &Path, yes: bool) -> anyhow::Result<ExportResult> {
    if !yes {
        return Err(Error::ConsentRequired.into());
    }

    let filter = Filter {
        include_archived: true,
        ..Default::default()
    };
    let rows = ctx.ledger.list_scalars(&filter, usize::MAX).await?;

    let mut body = String::new();
    for row in &rows {
        body.push_str(&dump_line(row));
        body.push('\n');
    }
    std::fs::write(to, body)?;

    Ok(ExportResult {
        path: to.display().to_string(),
        exported_count: rows.len(),
    })
}
