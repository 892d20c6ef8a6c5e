//! Per-source cursor state for graph capture (spec §3, §4.9), persisted
//! as JSON under the same locked-file discipline as triage state.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// `graph-capture-state.json`: one cursor per commit source directory.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CommitCaptureState {
    #[serde(default)]
    pub repos: HashMap<String, RepoCursor>,
}

/// One repo's commit-capture cursor: idempotency is enforced two ways —
/// the cursor bounds which commits are even considered, and `seen_shas`
/// guards against re-capturing a commit the ledger's own content-hash
/// dedupe might otherwise allow through a re-ordered scan.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RepoCursor {
    #[serde(default)]
    pub last_author_ts: Option<DateTime<Utc>>,
    #[serde(default)]
    pub seen_shas: HashSet<String>,
}

/// `graph-capture-md-state.json`: one cursor per markdown source file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MarkdownCaptureState {
    #[serde(default)]
    pub files: HashMap<String, FileCursor>,
}

/// One markdown file's capture cursor.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileCursor {
    /// File mtime (Unix seconds) as of the last successful scan.
    #[serde(default)]
    pub mtime_secs: i64,
    /// Section fingerprints already captured, so a file whose mtime moved
    /// but whose heading content did not still skips already-seen
    /// sections (spec §4.9 idempotency-by-fingerprint).
    #[serde(default)]
    pub seen_fingerprints: HashSet<String>,
}

fn read_json<T: Default + for<'de> Deserialize<'de>>(path: &Path) -> T {
    std::fs::read_to_string(path)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

/// Load, mutate, and persist a commit-capture state file under an
/// exclusive file lock held for the duration of `mutate` (spec §5
/// "scoped acquisition, guaranteed release").
pub fn with_locked_commit_state<F, R>(path: &Path, mutate: F) -> Result<R>
where
    F: FnOnce(&mut CommitCaptureState) -> R,
{
    with_locked_json_typed(path, mutate)
}

/// Load, mutate, and persist a markdown-capture state file under an
/// exclusive file lock.
pub fn with_locked_markdown_state<F, R>(path: &Path, mutate: F) -> Result<R>
where
    F: FnOnce(&mut MarkdownCaptureState) -> R,
{
    with_locked_json_typed(path, mutate)
}

/// Generic locked-read-mutate-write helper over any `Default +
/// Serialize + Deserialize` state document, following the same
/// lock/read/mutate/write/unlock sequence as
/// [`crate::triage::state::with_locked_state`] (RAII-guaranteed release
/// on every exit path, including panics).
fn with_locked_json_typed<T, F, R>(path: &Path, mutate: F) -> Result<R>
where
    T: Default + Serialize + for<'de> Deserialize<'de>,
    F: FnOnce(&mut T) -> R,
{
    use fs4::FileExt;
    use std::fs::OpenOptions;
    use std::io::{Read, Seek, SeekFrom, Write};

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    file.lock_exclusive()
        .map_err(|e| crate::error::Error::StorageUnavailable(format!("graph-capture state lock: {e}")))?;

    let result = (|| -> Result<R> {
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let mut state: T = if contents.trim().is_empty() {
            T::default()
        } else {
            serde_json::from_str(&contents)?
        };

        let result = mutate(&mut state);

        let serialized = serde_json::to_string_pretty(&state)?;
        file.seek(SeekFrom::Start(0))?;
        file.set_len(0)?;
        file.write_all(serialized.as_bytes())?;
        file.flush()?;

        Ok(result)
    })();

    let _ = fs4::fs_std::FileExt::unlock(&file);

    result
}

/// Read a commit-capture state file without acquiring a lock, for
/// diagnostics.
#[must_use]
pub fn read_commit_state(path: &Path) -> CommitCaptureState {
    read_json(path)
}

/// Read a markdown-capture state file without acquiring a lock.
#[must_use]
pub fn read_markdown_state(path: &Path) -> MarkdownCaptureState {
    read_json(path)
}
