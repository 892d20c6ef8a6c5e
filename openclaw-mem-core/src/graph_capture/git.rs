//! Commit-source capture (spec §4.9): idempotent indexing of
//! source-control commit metadata as `note` observations.

use std::path::Path;
use std::process::Command;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{ImportanceScorer, MemoryConfig};
use crate::error::{Error, Result};
use crate::observation::{Detail, ObservationKind};
use crate::storage_trait::{LedgerStore, NewObservation};

use super::state::{with_locked_commit_state, CommitCaptureState, RepoCursor};
use super::GraphCaptureReceipt;

/// One commit as seen by `git log`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub sha: String,
    pub author_ts: DateTime<Utc>,
    pub subject: String,
    pub files: Vec<String>,
}

impl CommitRecord {
    #[must_use]
    pub fn sha7(&self) -> &str {
        &self.sha[..self.sha.len().min(7)]
    }
}

const FIELD_SEP: &str = "\u{1}";
const COMMIT_SEP: &str = "\u{2}";

/// List commits in `repo_dir` authored at or after `since`, newest-last
/// (so insertion order matches authoring order). Uses `git log` directly
/// rather than a VCS library, matching the CLI-shell-out pattern the rest
/// of this system's external-tool interfaces use.
pub fn list_commits_since(repo_dir: &Path, since: DateTime<Utc>) -> Result<Vec<CommitRecord>> {
    let since_arg = since.to_rfc3339();
    let format = format!("%H{FIELD_SEP}%aI{FIELD_SEP}%s{COMMIT_SEP}");

    let output = Command::new("git")
        .arg("-C")
        .arg(repo_dir)
        .arg("log")
        .arg(format!("--since={since_arg}"))
        .arg(format!("--pretty=format:{format}"))
        .arg("--name-only")
        .arg("--reverse")
        .output()
        .map_err(|e| Error::StorageUnavailable(format!("git log: {e}")))?;

    if !output.status.success() {
        return Err(Error::StorageUnavailable(format!(
            "git log exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut commits = Vec::new();

    for chunk in stdout.split(COMMIT_SEP) {
        let chunk = chunk.trim_start_matches('\n');
        if chunk.trim().is_empty() {
            continue;
        }
        let mut lines = chunk.splitn(2, '\n');
        let Some(header) = lines.next() else { continue };
        let mut fields = header.splitn(3, FIELD_SEP);
        let (Some(sha), Some(author_ts_raw), Some(subject)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let Ok(author_ts) = DateTime::parse_from_rfc3339(author_ts_raw) else {
            continue;
        };
        let files: Vec<String> = lines
            .next()
            .unwrap_or_default()
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        commits.push(CommitRecord {
            sha: sha.to_string(),
            author_ts: author_ts.with_timezone(&Utc),
            subject: subject.to_string(),
            files,
        });
    }

    Ok(commits)
}

fn repo_key(repo_dir: &Path) -> String {
    repo_dir.display().to_string()
}

/// Run the commit-source capture scan against one repo directory,
/// inserting one `note` observation per new commit (spec §4.9). Fully
/// idempotent across repeated runs: the cursor bounds re-scanned history
/// and `seen_shas` is a second guard independent of the ledger's own
/// content-hash dedupe.
pub async fn capture_git<S: LedgerStore + ?Sized>(
    store: &S,
    repo_dir: &Path,
    state_path: &Path,
    since_hours: i64,
    config: &MemoryConfig,
) -> Result<GraphCaptureReceipt> {
    let repo_name = repo_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| repo_key(repo_dir));
    let key = repo_key(repo_dir);

    let since = with_locked_commit_state(state_path, |state| {
        state
            .repos
            .get(&key)
            .and_then(|cursor| cursor.last_author_ts)
            .unwrap_or_else(|| Utc::now() - chrono::Duration::hours(since_hours))
    })?;

    let commits = list_commits_since(repo_dir, since)?;

    let mut receipt = GraphCaptureReceipt {
        scanned: commits.len(),
        ..Default::default()
    };

    let mut max_author_ts = since;

    for commit in &commits {
        let already_seen = with_locked_commit_state(state_path, |state| {
            state
                .repos
                .get(&key)
                .is_some_and(|cursor| cursor.seen_shas.contains(&commit.sha))
        })?;
        if already_seen {
            receipt.skipped_existing += 1;
            continue;
        }

        receipt.changed += 1;

        let summary = format!("[GIT] {repo_name} {} {}", commit.sha7(), commit.subject);
        let summary = crate::capture::truncate_chars(&summary, crate::constants::MAX_SUMMARY_CHARS);

        let mut detail = Detail::default();
        detail.extra.insert(
            "repo".to_string(),
            serde_json::Value::String(repo_name.clone()),
        );
        detail
            .extra
            .insert("sha".to_string(), serde_json::Value::String(commit.sha.clone()));
        detail.extra.insert(
            "author_ts".to_string(),
            serde_json::Value::String(commit.author_ts.to_rfc3339()),
        );
        detail.extra.insert(
            "files".to_string(),
            serde_json::Value::Array(
                commit
                    .files
                    .iter()
                    .map(|f| serde_json::Value::String(f.clone()))
                    .collect(),
            ),
        );

        if matches!(config.importance_scorer, ImportanceScorer::HeuristicV1) {
            detail.governance.importance = Some(crate::importance::grade(
                ObservationKind::Note,
                Some("graph.capture-git"),
                &summary,
                &detail,
            ));
        }

        let content_hash = crate::capture::content_hash(
            ObservationKind::Note,
            Some("graph.capture-git"),
            &summary,
            commit.author_ts,
        );

        let new_observation = NewObservation {
            ts: commit.author_ts,
            kind: ObservationKind::Note,
            tool_name: Some("graph.capture-git".to_string()),
            summary,
            detail,
            content_hash,
            session_key: None,
            agent_id: None,
        };

        match store.insert_observation(new_observation).await {
            Ok(_) => receipt.inserted += 1,
            Err(Error::Duplicate) => receipt.skipped_existing += 1,
            Err(other) => return Err(other),
        }

        if commit.author_ts > max_author_ts {
            max_author_ts = commit.author_ts;
        }

        with_locked_commit_state(state_path, |state| {
            let cursor = state.repos.entry(key.clone()).or_insert_with(RepoCursor::default);
            cursor.seen_shas.insert(commit.sha.clone());
            if cursor.last_author_ts.is_none_or(|ts| commit.author_ts > ts) {
                cursor.last_author_ts = Some(commit.author_ts);
            }
        })?;
    }

    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha7_truncates_to_seven_characters() {
        let commit = CommitRecord {
            sha: "abcdef1234567890".to_string(),
            author_ts: Utc.timestamp_opt(0, 0).unwrap(),
            subject: "test".to_string(),
            files: Vec::new(),
        };
        assert_eq!(commit.sha7(), "abcdef1");
    }
}
