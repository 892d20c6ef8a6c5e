//! `triage --mode {heartbeat|cron-errors|tasks}` (spec §4.8, §6):
//! deterministic scans with a structurally separate exit code (0 or 10).

use std::path::PathBuf;

use clap::ValueEnum;
use serde::Serialize;

use openclaw_mem_core::storage_trait::Filter;
use openclaw_mem_core::triage::{self, TriageMode as CoreTriageMode, TriageSummary};
use openclaw_mem_core::LedgerStore;

use crate::context::Context;
use crate::output::Output;

/// CLI-facing mirror of [`CoreTriageMode`], kept distinct so clap owns the
/// argument parsing concerns (`ValueEnum`) independently of the core type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum TriageModeArg {
    Heartbeat,
    CronErrors,
    Tasks,
}

impl From<TriageModeArg> for CoreTriageMode {
    fn from(mode: TriageModeArg) -> Self {
        match mode {
            TriageModeArg::Heartbeat => CoreTriageMode::Heartbeat,
            TriageModeArg::CronErrors => CoreTriageMode::CronErrors,
            TriageModeArg::Tasks => CoreTriageMode::Tasks,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TriageResult {
    pub summary: TriageSummary,
    pub exit_code: i32,
}

impl Output for TriageResult {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "ran: {}", self.summary.mode_ran.join(", "))?;
        for task in &self.summary.new_tasks {
            writeln!(writer, "new task #{}: {}", task.id, task.summary)?;
        }
        for job in &self.summary.failing_cron_jobs {
            writeln!(writer, "failing cron job: {} ({})", job.name, job.last_status)?;
        }
        for source in &self.summary.unreachable_sources {
            writeln!(writer, "unreachable: {source}")?;
        }
        if self.summary.new_tasks.is_empty() && self.summary.failing_cron_jobs.is_empty() {
            writeln!(writer, "ok")?;
        }
        Ok(())
    }
}

fn triage_dir(ctx: &Context) -> PathBuf {
    ctx.base_dir().join("triage")
}

/// `triage --mode <mode>`.
pub async fn run(ctx: &Context, mode: TriageModeArg) -> anyhow::Result<TriageResult> {
    let core_mode: CoreTriageMode = mode.into();
    std::fs::create_dir_all(triage_dir(ctx))?;
    let state_path = triage_dir(ctx).join(core_mode.state_file_name());

    let summary = match core_mode {
        CoreTriageMode::Tasks => {
            let recent = ctx.ledger.list_scalars(&Filter::default(), 500).await?;
            triage::scan_tasks(&state_path, &recent)?
        }
        CoreTriageMode::CronErrors => {
            let cron_state_file = ctx.base_dir().join("cron-state.json");
            triage::scan_cron_errors(&cron_state_file, &state_path)?
        }
        CoreTriageMode::Heartbeat => {
            let cron_state_file = ctx.base_dir().join("cron-state.json");
            triage::scan_heartbeat(
                &ctx.ledger,
                &ctx.base_dir(),
                &cron_state_file,
                &Filter::default(),
            )
            .await?
        }
    };

    let exit_code = summary.exit_code();
    Ok(TriageResult { summary, exit_code })
}
