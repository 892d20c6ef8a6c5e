//! Graph capture (C9): idempotent indexing of source-control commits and
//! markdown headings into the ledger as ordinary `note` observations, so
//! they participate in retrieval like anything else. Index-only — no file
//! bodies or diffs are stored, only summaries and structured detail.

pub mod git;
pub mod markdown;
pub mod state;

use serde::{Deserialize, Serialize};

/// Outcome of one capture scan, returned to the CLI for `graph
/// capture-git`/`graph capture-md` reporting (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GraphCaptureReceipt {
    /// Candidates considered (commits listed, or files discovered).
    pub scanned: usize,
    /// Candidates that were new relative to the stored cursor.
    pub changed: usize,
    /// Observations actually inserted into the ledger.
    pub inserted: usize,
    /// Candidates skipped because they were already captured.
    pub skipped_existing: usize,
}
