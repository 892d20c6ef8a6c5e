//! The triage engine (C8, spec §4.8): deterministic scans producing an
//! exit signal (`0 = ok`, `10 = attention`) and a bounded JSON summary,
//! used by external schedulers (cron, a heartbeat timer).

pub mod state;
pub mod task_pattern;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{TRIAGE_EXIT_ATTENTION, TRIAGE_EXIT_OK};
use crate::error::Result;
use crate::observation::Observation;
use crate::storage_trait::LedgerStore;
use state::with_locked_state;

/// Which scan `triage --mode` runs (spec §4.8, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriageMode {
    Heartbeat,
    CronErrors,
    Tasks,
}

impl TriageMode {
    #[must_use]
    pub fn state_file_name(self) -> &'static str {
        match self {
            TriageMode::Heartbeat => "heartbeat-state.json",
            TriageMode::CronErrors => "cron-errors-state.json",
            TriageMode::Tasks => "tasks-state.json",
        }
    }
}

/// One newly-detected task observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub id: i64,
    pub summary: String,
}

/// One cron job reported as failing and not yet alerted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailingCronJob {
    pub name: String,
    pub last_status: String,
}

/// Bounded summary emitted by a triage run (spec §4.8).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TriageSummary {
    pub mode_ran: Vec<String>,
    pub new_tasks: Vec<NewTask>,
    pub failing_cron_jobs: Vec<FailingCronJob>,
    pub new_observation_count: usize,
    pub unreachable_sources: Vec<String>,
}

impl TriageSummary {
    /// `0` when nothing requires attention, `10` otherwise (spec §4.8,
    /// §7: this exit code is structurally separate from error exit codes).
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.new_tasks.is_empty() && self.failing_cron_jobs.is_empty() {
            TRIAGE_EXIT_OK
        } else {
            TRIAGE_EXIT_ATTENTION
        }
    }
}

/// One job entry in an external cron state file (spec §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronJobEntry {
    pub name: String,
    #[serde(rename = "lastStatus")]
    pub last_status: String,
}

/// The external cron state file's shape: `{"jobs": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CronStateFile {
    #[serde(default)]
    pub jobs: Vec<CronJobEntry>,
}

fn hash_of(parts: &[&str]) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for part in parts {
        part.hash(&mut hasher);
    }
    format!("{:016x}", hasher.finish())
}

/// Scan recent observations for the deterministic task pattern (spec
/// §4.8, §6), reporting only items not yet alerted for the `tasks` state
/// file. `recent` should already be filtered to a reasonable lookback
/// window by the caller (e.g. via `list_scalars`).
pub fn scan_tasks(state_path: &Path, recent: &[Observation]) -> Result<TriageSummary> {
    let mut summary = TriageSummary {
        mode_ran: vec!["tasks".to_string()],
        ..Default::default()
    };

    with_locked_state(state_path, |state| {
        for observation in recent {
            let is_task_kind = matches!(observation.kind, crate::observation::ObservationKind::Task);
            let matches_pattern = task_pattern::matches_task_pattern(&observation.summary);
            if !is_task_kind && !matches_pattern {
                continue;
            }

            let hash = hash_of(&[&observation.id.to_string(), &observation.summary]);
            if state.has_alerted(&hash) {
                continue;
            }

            state.record_alert(hash);
            state.advance_cursor(observation.id, observation.ts);
            summary.new_tasks.push(NewTask {
                id: observation.id,
                summary: observation.summary.clone(),
            });
        }
    })?;

    Ok(summary)
}

/// Read an external cron state file and report jobs with `lastStatus !=
/// "ok"` not yet alerted for the `cron-errors` state file (spec §4.8).
/// A missing or unreadable cron state file is recorded as an unreachable
/// source rather than a hard failure (spec §5 fail-open on unreachable
/// sources).
pub fn scan_cron_errors(cron_state_file: &Path, state_path: &Path) -> Result<TriageSummary> {
    let mut summary = TriageSummary {
        mode_ran: vec!["cron-errors".to_string()],
        ..Default::default()
    };

    let cron_state: CronStateFile = match std::fs::read_to_string(cron_state_file) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
        Err(_) => {
            summary
                .unreachable_sources
                .push(cron_state_file.display().to_string());
            return Ok(summary);
        }
    };

    with_locked_state(state_path, |state| {
        for job in &cron_state.jobs {
            if job.last_status == "ok" {
                continue;
            }
            let hash = hash_of(&[&job.name, &job.last_status]);
            if state.has_alerted(&hash) {
                continue;
            }
            state.record_alert(hash);
            summary.failing_cron_jobs.push(FailingCronJob {
                name: job.name.clone(),
                last_status: job.last_status.clone(),
            });
        }
    })?;

    Ok(summary)
}

/// `heartbeat` mode: compose an observations-count scan, the cron-errors
/// scan, and the tasks scan (spec §4.8).
pub async fn scan_heartbeat<S: LedgerStore + ?Sized>(
    store: &S,
    base_dir: &Path,
    cron_state_file: &Path,
    recent_filter: &crate::storage_trait::Filter,
) -> Result<TriageSummary> {
    let recent = store.list_scalars(recent_filter, 500).await?;

    let tasks_path = base_dir.join("triage").join(TriageMode::Tasks.state_file_name());
    let cron_path = base_dir.join("triage").join(TriageMode::CronErrors.state_file_name());

    let tasks_summary = scan_tasks(&tasks_path, &recent)?;
    let cron_summary = scan_cron_errors(cron_state_file, &cron_path)?;

    Ok(TriageSummary {
        mode_ran: vec!["heartbeat".to_string()],
        new_tasks: tasks_summary.new_tasks,
        failing_cron_jobs: cron_summary.failing_cron_jobs,
        new_observation_count: recent.len(),
        unreachable_sources: [tasks_summary.unreachable_sources, cron_summary.unreachable_sources]
            .concat(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::{Detail, ObservationKind};
    use chrono::Utc;
    use tempfile::tempdir;

    fn obs(id: i64, summary: &str) -> Observation {
        Observation {
            id,
            ts: Utc::now(),
            kind: ObservationKind::Note,
            tool_name: None,
            summary: summary.to_string(),
            detail: Detail::default(),
            content_hash: format!("hash-{id}"),
            session_key: None,
            agent_id: None,
            created_at: Utc::now(),
            archived: false,
            last_used_at: None,
        }
    }

    #[test]
    fn first_scan_reports_new_task_second_does_not() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks-state.json");
        let recent = vec![obs(1, "TODO: rotate runbook")];

        let first = scan_tasks(&path, &recent).unwrap();
        assert_eq!(first.new_tasks.len(), 1);
        assert_eq!(first.exit_code(), TRIAGE_EXIT_ATTENTION);

        let second = scan_tasks(&path, &recent).unwrap();
        assert!(second.new_tasks.is_empty());
        assert_eq!(second.exit_code(), TRIAGE_EXIT_OK);
    }

    #[test]
    fn non_task_summaries_are_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks-state.json");
        let recent = vec![obs(1, "fetched openclaw.ai successfully")];
        let summary = scan_tasks(&path, &recent).unwrap();
        assert!(summary.new_tasks.is_empty());
    }

    #[test]
    fn missing_cron_state_file_is_unreachable_not_fatal() {
        let dir = tempdir().unwrap();
        let state_path = dir.path().join("cron-errors-state.json");
        let missing_cron_file = dir.path().join("does-not-exist.json");
        let summary = scan_cron_errors(&missing_cron_file, &state_path).unwrap();
        assert_eq!(summary.unreachable_sources.len(), 1);
        assert_eq!(summary.exit_code(), TRIAGE_EXIT_OK);
    }

    #[test]
    fn failing_cron_job_is_reported_once() {
        let dir = tempdir().unwrap();
        let cron_file = dir.path().join("cron.json");
        let state_path = dir.path().join("cron-errors-state.json");
        std::fs::write(
            &cron_file,
            r#"{"jobs":[{"name":"nightly-backup","lastStatus":"failed"}]}"#,
        )
        .unwrap();

        let first = scan_cron_errors(&cron_file, &state_path).unwrap();
        assert_eq!(first.failing_cron_jobs.len(), 1);

        let second = scan_cron_errors(&cron_file, &state_path).unwrap();
        assert!(second.failing_cron_jobs.is_empty());
    }
}
