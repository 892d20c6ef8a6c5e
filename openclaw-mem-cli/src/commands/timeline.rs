//! `timeline <id>... [--window N]` (spec §6): for each input id, the
//! observations within a `±window` minute range, ordered by `(ts, id)`.

use serde::Serialize;

use openclaw_mem_core::observation::Observation;
use openclaw_mem_core::LedgerStore;

use crate::context::Context;
use crate::output::Output;

#[derive(Debug, Serialize)]
pub struct TimelineResult {
    pub window_minutes: i64,
    /// One entry per requested id, each a chronologically-ordered slice.
    pub slices: Vec<Vec<Observation>>,
}

impl Output for TimelineResult {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        for (idx, slice) in self.slices.iter().enumerate() {
            writeln!(writer, "--- timeline {} (±{}m) ---", idx + 1, self.window_minutes)?;
            for obs in slice {
                writeln!(writer, "#{} [{}] {}", obs.id, obs.ts, obs.summary)?;
            }
        }
        Ok(())
    }
}

pub async fn run(ctx: &Context, ids: &[i64], window_minutes: i64) -> anyhow::Result<TimelineResult> {
    let window = chrono::Duration::minutes(window_minutes);
    let slices = ctx.ledger.timeline(ids, window).await?;
    Ok(TimelineResult {
        window_minutes,
        slices,
    })
}
