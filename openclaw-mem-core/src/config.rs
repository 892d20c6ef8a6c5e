//! The single validated configuration struct covering every
//! operator-tunable knob enumerated across spec §4 and §6.
//!
//! `#[serde(deny_unknown_fields)]` on every level: an operator typo in a
//! config file surfaces as a load-time error rather than a silently
//! ignored key, per the Design Notes' "no implicit additional keys"
//! guidance. File loading (TOML) and environment-variable overrides live
//! in `openclaw-mem-cli::config`; this struct is the validated target of
//! that loader, not the loader itself.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::clamp::ClampConfig;
use crate::constants::{
    DEFAULT_BUDGET_TOKENS, DEFAULT_DEDUPE_SIMILARITY_THRESHOLD, DEFAULT_DUPLICATE_SEARCH_MIN_SCORE,
    DEFAULT_EMBED_BATCH_SIZE, DEFAULT_EMBED_TIMEOUT_SECS, DEFAULT_IDEMPOTENCY_WINDOW_HOURS,
    DEFAULT_MAX_ITEMS, DEFAULT_MAX_ITEMS_PER_TURN, DEFAULT_MAX_L2_ITEMS, DEFAULT_NICE_CAP,
    DEFAULT_TIER_MULTIPLIER, DEFAULT_TRIVIAL_MIN_CHARS,
};
use crate::pack::Budgets;
use crate::policy::capture::{CaptureCategory, CaptureConfig};

/// `OPENCLAW_MEM_IMPORTANCE_SCORER` / `--importance-scorer` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ImportanceScorer {
    #[default]
    HeuristicV1,
    Off,
}

/// Busy-timeout/backoff knobs for the ledger's single-writer discipline
/// (spec §4.1).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriterContention {
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_busy_timeout_budget_ms")]
    pub busy_timeout_budget_ms: u64,
}

fn default_initial_backoff_ms() -> u64 {
    10
}
fn default_busy_timeout_budget_ms() -> u64 {
    2_000
}

impl Default for WriterContention {
    fn default() -> Self {
        Self {
            initial_backoff_ms: default_initial_backoff_ms(),
            busy_timeout_budget_ms: default_busy_timeout_budget_ms(),
        }
    }
}

/// Ingest/harvest tunables (spec §4.3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    #[serde(default = "default_idempotency_window_hours")]
    pub idempotency_window_hours: i64,
    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,
}

fn default_idempotency_window_hours() -> i64 {
    DEFAULT_IDEMPOTENCY_WINDOW_HOURS
}
fn default_embed_batch_size() -> usize {
    DEFAULT_EMBED_BATCH_SIZE
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            idempotency_window_hours: default_idempotency_window_hours(),
            embed_batch_size: default_embed_batch_size(),
        }
    }
}

/// Recall/tiered-retrieval tunables (spec §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecallConfig {
    #[serde(default = "default_tier_multiplier")]
    pub tier_multiplier: usize,
    /// Model identifier used for vector search and embedding calls.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embed_timeout_secs")]
    pub embed_timeout_secs: u64,
}

fn default_tier_multiplier() -> usize {
    DEFAULT_TIER_MULTIPLIER
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_embed_timeout_secs() -> u64 {
    DEFAULT_EMBED_TIMEOUT_SECS
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            tier_multiplier: default_tier_multiplier(),
            embedding_model: default_embedding_model(),
            embed_timeout_secs: default_embed_timeout_secs(),
        }
    }
}

/// Context Packer tunables (spec §4.6), re-exporting [`Budgets`] under
/// the `deny_unknown_fields` config umbrella.
pub type PackConfig = Budgets;

/// Auto-recall trivial-prompt gating tunables (spec §4.7).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrivialConfig {
    #[serde(default = "default_trivial_min_chars")]
    pub trivial_min_chars: usize,
}

fn default_trivial_min_chars() -> usize {
    DEFAULT_TRIVIAL_MIN_CHARS
}

impl Default for TrivialConfig {
    fn default() -> Self {
        Self {
            trivial_min_chars: default_trivial_min_chars(),
        }
    }
}

/// The operator-level graph-capture permission toggles (spec §6
/// environment variables). The core treats presence as a permission, not
/// a scheduler — these flags only gate whether `graph capture-*` may run,
/// not when.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct GraphCaptureToggles {
    #[serde(default)]
    pub auto_recall: bool,
    #[serde(default)]
    pub auto_capture: bool,
    #[serde(default)]
    pub auto_capture_md: bool,
}

/// The top-level, fully validated configuration object. Passed explicitly
/// into every component constructor; there is no ambient global.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    #[serde(default)]
    pub importance_scorer: ImportanceScorer,
    #[serde(default)]
    pub clamp: ClampConfig,
    #[serde(default)]
    pub writer_contention: WriterContention,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub recall: RecallConfig,
    #[serde(default = "default_pack")]
    pub pack: PackConfig,
    #[serde(default)]
    pub trivial: TrivialConfig,
    #[serde(default)]
    pub capture: CaptureConfigToml,
    #[serde(default)]
    pub graph: GraphCaptureToggles,
}

fn default_pack() -> PackConfig {
    Budgets {
        budget_tokens: DEFAULT_BUDGET_TOKENS,
        max_items: DEFAULT_MAX_ITEMS,
        max_l2_items: DEFAULT_MAX_L2_ITEMS,
        nice_cap: DEFAULT_NICE_CAP,
    }
}

/// A TOML/JSON-friendly mirror of [`CaptureConfig`] (which stores its
/// allowed-category set as a `HashSet` with no stable default ordering on
/// disk); converted via [`CaptureConfigToml::resolve`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureConfigToml {
    #[serde(default = "default_allowed_categories")]
    pub allowed_categories: Vec<CaptureCategory>,
    #[serde(default = "default_dedupe_similarity_threshold")]
    pub dedupe_similarity_threshold: f64,
    #[serde(default = "default_duplicate_search_min_score")]
    pub duplicate_search_min_score: f64,
    #[serde(default = "default_max_items_per_turn")]
    pub max_items_per_turn: usize,
    #[serde(default = "default_max_chars_per_item")]
    pub max_chars_per_item: usize,
}

fn default_allowed_categories() -> Vec<CaptureCategory> {
    vec![
        CaptureCategory::Todo,
        CaptureCategory::Decision,
        CaptureCategory::Preference,
    ]
}
fn default_dedupe_similarity_threshold() -> f64 {
    DEFAULT_DEDUPE_SIMILARITY_THRESHOLD
}
fn default_duplicate_search_min_score() -> f64 {
    DEFAULT_DUPLICATE_SEARCH_MIN_SCORE
}
fn default_max_items_per_turn() -> usize {
    DEFAULT_MAX_ITEMS_PER_TURN
}
fn default_max_chars_per_item() -> usize {
    280
}

impl Default for CaptureConfigToml {
    fn default() -> Self {
        Self {
            allowed_categories: default_allowed_categories(),
            dedupe_similarity_threshold: default_dedupe_similarity_threshold(),
            duplicate_search_min_score: default_duplicate_search_min_score(),
            max_items_per_turn: default_max_items_per_turn(),
            max_chars_per_item: default_max_chars_per_item(),
        }
    }
}

impl CaptureConfigToml {
    /// Resolve into the runtime [`CaptureConfig`] used by
    /// [`crate::policy::capture::classify_turn`].
    #[must_use]
    pub fn resolve(&self) -> CaptureConfig {
        CaptureConfig {
            allowed_categories: self.allowed_categories.iter().copied().collect::<HashSet<_>>(),
            dedupe_similarity_threshold: self.dedupe_similarity_threshold,
            duplicate_search_min_score: self.duplicate_search_min_score,
            max_items_per_turn: self.max_items_per_turn,
            max_chars_per_item: self.max_chars_per_item,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            importance_scorer: ImportanceScorer::default(),
            clamp: ClampConfig::default(),
            writer_contention: WriterContention::default(),
            ingest: IngestConfig::default(),
            recall: RecallConfig::default(),
            pack: default_pack(),
            trivial: TrivialConfig::default(),
            capture: CaptureConfigToml::default(),
            graph: GraphCaptureToggles::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = MemoryConfig::default();
        let serialized = toml::to_string(&config).expect("serialize");
        let reloaded: MemoryConfig = toml::from_str(&serialized).expect("deserialize");
        assert_eq!(reloaded.recall.embedding_model, config.recall.embedding_model);
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let toml_text = "unknown_knob = true\n";
        let result: Result<MemoryConfig, _> = toml::from_str(toml_text);
        assert!(result.is_err());
    }

    #[test]
    fn capture_config_toml_resolves_to_runtime_set() {
        let toml_config = CaptureConfigToml {
            allowed_categories: vec![CaptureCategory::Todo],
            ..CaptureConfigToml::default()
        };
        let resolved = toml_config.resolve();
        assert!(resolved.allowed_categories.contains(&CaptureCategory::Todo));
        assert!(!resolved.allowed_categories.contains(&CaptureCategory::Decision));
    }
}
