//! Per-mode triage de-duplication state: a monotonic cursor plus a
//! bounded, LRU-evicted alerted-hash set (spec §3, §4.8), persisted as
//! JSON under a scoped OS-level file lock with guaranteed release.

use chrono::{DateTime, Utc};
use fs4::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::constants::TRIAGE_ALERTED_SET_CAPACITY;
use crate::error::{Error, Result};

/// One triage mode's persisted de-duplication state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageState {
    /// Last observation id seen by this mode's scan.
    #[serde(default)]
    pub cursor_id: i64,
    /// Timestamp of the last scan.
    #[serde(default)]
    pub cursor_ts: Option<DateTime<Utc>>,
    /// Already-alerted item hashes, oldest-first for LRU eviction.
    #[serde(default)]
    alerted: VecDeque<String>,
}

impl Default for TriageState {
    fn default() -> Self {
        Self {
            cursor_id: 0,
            cursor_ts: None,
            alerted: VecDeque::new(),
        }
    }
}

impl TriageState {
    /// Whether `hash` has already been alerted.
    #[must_use]
    pub fn has_alerted(&self, hash: &str) -> bool {
        self.alerted.iter().any(|h| h == hash)
    }

    /// Record a newly-alerted item, evicting the oldest entry if the
    /// bounded capacity would otherwise be exceeded.
    pub fn record_alert(&mut self, hash: impl Into<String>) {
        let hash = hash.into();
        if self.has_alerted(&hash) {
            return;
        }
        if self.alerted.len() >= TRIAGE_ALERTED_SET_CAPACITY {
            self.alerted.pop_front();
        }
        self.alerted.push_back(hash);
    }

    /// Advance the cursor. Never moves it backward.
    pub fn advance_cursor(&mut self, id: i64, ts: DateTime<Utc>) {
        if id > self.cursor_id {
            self.cursor_id = id;
            self.cursor_ts = Some(ts);
        }
    }
}

/// Load, mutate, and persist a mode's state file under an exclusive
/// file lock held for the duration of `mutate`. The lock is released on
/// every exit path, including a panic inside `mutate`, since the guard
/// drops via RAII when the stack unwinds.
pub fn with_locked_state<F, R>(path: &Path, mutate: F) -> Result<R>
where
    F: FnOnce(&mut TriageState) -> R,
{
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
        .map_err(|e| Error::StorageUnavailable(format!("triage state lock: {e}")))?;

    let result = (|| -> Result<R> {
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let mut state: TriageState = if contents.trim().is_empty() {
            TriageState::default()
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

    // Best-effort: an inherited lock is released by the OS when the file
    // descriptor closes even if this call fails.
    let _ = fs4::fs_std::FileExt::unlock(&file);

    result
}

/// Read a mode's state without acquiring a lock, for diagnostics.
pub fn read_state(path: &Path) -> Result<TriageState> {
    if !path.exists() {
        return Ok(TriageState::default());
    }
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    if contents.trim().is_empty() {
        return Ok(TriageState::default());
    }
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn alerted_set_evicts_oldest_beyond_capacity() {
        let mut state = TriageState::default();
        for i in 0..(TRIAGE_ALERTED_SET_CAPACITY + 5) {
            state.record_alert(format!("hash-{i}"));
        }
        assert_eq!(state.alerted.len(), TRIAGE_ALERTED_SET_CAPACITY);
        assert!(!state.has_alerted("hash-0"));
        assert!(state.has_alerted(&format!("hash-{}", TRIAGE_ALERTED_SET_CAPACITY + 4)));
    }

    #[test]
    fn cursor_never_moves_backward() {
        let mut state = TriageState::default();
        state.advance_cursor(10, Utc::now());
        state.advance_cursor(5, Utc::now());
        assert_eq!(state.cursor_id, 10);
    }

    #[test]
    fn persisted_state_round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks-state.json");

        with_locked_state(&path, |state| {
            state.advance_cursor(7, Utc::now());
            state.record_alert("abc123");
        })
        .unwrap();

        let reloaded = read_state(&path).unwrap();
        assert_eq!(reloaded.cursor_id, 7);
        assert!(reloaded.has_alerted("abc123"));
    }

    #[test]
    fn rerunning_with_no_new_items_is_a_no_op() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks-state.json");

        with_locked_state(&path, |state| {
            state.record_alert("x");
        })
        .unwrap();
        with_locked_state(&path, |state| {
            assert!(state.has_alerted("x"));
        })
        .unwrap();
    }
}
