//! Fixed constants called out by name in the specification. Kept separate
//! from the tunable `MemoryConfig` knobs in [`crate::config`] — these are
//! not operator-configurable because the spec defines them as part of the
//! algorithm, not as policy.

/// Reciprocal Rank Fusion damping constant (spec §4.5).
pub const RRF_K: f64 = 60.0;

/// Upper bound on a single recall request's `limit` (spec §4.5, §8).
pub const MAX_RECALL_LIMIT: usize = 50;

/// Default candidate-generation multiplier applied to `limit` per tier
/// before fusion (spec §4.5).
pub const DEFAULT_TIER_MULTIPLIER: usize = 2;

/// Upper bound on the per-tier candidate multiplier (spec §4.5).
pub const MAX_TIER_MULTIPLIER: usize = 25;

/// Default idempotency window for duplicate content-hash detection
/// (spec §4.1).
pub const DEFAULT_IDEMPOTENCY_WINDOW_HOURS: i64 = 24;

/// Default embedding-loop batch size during harvest (spec §4.3).
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 16;

/// Default per-call embedding provider timeout, in seconds (spec §5).
pub const DEFAULT_EMBED_TIMEOUT_SECS: u64 = 30;

/// Maximum length of an observation summary, in UTF-8 characters
/// (spec §3).
pub const MAX_SUMMARY_CHARS: usize = 512;

/// Truncation length applied to a `message.content` derived summary
/// (spec §4.2).
pub const DERIVED_SUMMARY_CHARS: usize = 200;

/// Importance score threshold for the `must_remember` label (spec §3).
pub const IMPORTANCE_MUST_REMEMBER: f64 = 0.80;

/// Importance score threshold for the `nice_to_have` label (spec §3).
pub const IMPORTANCE_NICE_TO_HAVE: f64 = 0.50;

/// Default token budget for a packed context bundle (spec §4.6).
pub const DEFAULT_BUDGET_TOKENS: usize = 2048;

/// Default maximum number of included items in a packed bundle.
pub const DEFAULT_MAX_ITEMS: usize = 20;

/// Default maximum number of L2 (raw detail) items in a packed bundle.
pub const DEFAULT_MAX_L2_ITEMS: usize = 3;

/// Default cap on `nice_to_have` items admitted into a packed bundle.
pub const DEFAULT_NICE_CAP: usize = 8;

/// Default near-duplicate text-similarity threshold for auto-capture
/// (spec §4.7).
pub const DEFAULT_DEDUPE_SIMILARITY_THRESHOLD: f64 = 0.92;

/// Default near-duplicate vector-similarity threshold for auto-capture
/// (spec §4.7).
pub const DEFAULT_DUPLICATE_SEARCH_MIN_SCORE: f64 = 0.94;

/// Default cap on auto-captured items per conversation turn (spec §4.7).
pub const DEFAULT_MAX_ITEMS_PER_TURN: usize = 2;

/// Default minimum character length for greeting/acknowledgement-based
/// trivial-prompt detection (spec §4.7).
pub const DEFAULT_TRIVIAL_MIN_CHARS: usize = 24;

/// Bound on the alerted-hash set retained per triage mode, with LRU
/// eviction beyond this size (spec §3).
pub const TRIAGE_ALERTED_SET_CAPACITY: usize = 10_000;

/// Maximum items in a receipt's top-N arrays (spec §4.10).
pub const RECEIPT_MAX_ITEMS_CEILING: usize = 10;

/// Default receipt top-N array length.
pub const DEFAULT_RECEIPT_MAX_ITEMS: usize = 5;

/// Process exit code signalling "triage found something needing attention".
pub const TRIAGE_EXIT_ATTENTION: i32 = 10;

/// Process exit code signalling "triage ran clean".
pub const TRIAGE_EXIT_OK: i32 = 0;
