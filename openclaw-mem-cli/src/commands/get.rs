//! `get <id>...` (spec §6): full row(s) by id, preserving input order.

use serde::Serialize;

use openclaw_mem_core::observation::Observation;
use openclaw_mem_core::LedgerStore;

use crate::context::Context;
use crate::output::Output;

#[derive(Debug, Serialize)]
pub struct GetResult {
    pub rows: Vec<Option<Observation>>,
}

impl Output for GetResult {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        for slot in &self.rows {
            match slot {
                Some(obs) => writeln!(
                    writer,
                    "#{} [{}] {} ({}, {})",
                    obs.id,
                    obs.ts,
                    obs.summary,
                    obs.scope(),
                    format!("{:?}", obs.importance_label())
                )?,
                None => writeln!(writer, "(not found)")?,
            }
        }
        Ok(())
    }
}

pub async fn run(ctx: &Context, ids: &[i64]) -> anyhow::Result<GetResult> {
    let rows = ctx.ledger.get_by_ids(ids).await?;
    Ok(GetResult { rows })
}
