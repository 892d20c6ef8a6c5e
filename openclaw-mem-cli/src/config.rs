//! Configuration loading: file, then environment, then defaults (spec
//! §6), grounded in the teacher's file/env precedence split
//! (`memory-cli/src/config/loader/{file,env}.rs`).

use std::path::PathBuf;

use openclaw_mem_core::config::MemoryConfig;
use openclaw_mem_core::embeddings_client::EmbeddingProviderConfig;
use serde::{Deserialize, Serialize};

/// CLI-level settings layered on top of [`MemoryConfig`]: where the
/// ledger file lives, the base directory for state files (triage,
/// graph-capture cursors), and the optional embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    #[serde(default)]
    pub db_path: Option<String>,
    #[serde(default)]
    pub base_dir: Option<String>,
    #[serde(default)]
    pub embedding: Option<EmbeddingProviderConfig>,
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl CliConfig {
    pub fn db_path(&self) -> String {
        self.db_path.clone().unwrap_or_else(|| "openclaw-mem.db".to_string())
    }

    pub fn base_dir(&self) -> PathBuf {
        self.base_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Load configuration: a `--config` file (if given) or `openclaw-mem.toml`
/// in the current directory (if present), overlaid with environment
/// variables, falling back to defaults for anything unset.
pub fn load_config(explicit_path: Option<&std::path::Path>) -> anyhow::Result<CliConfig> {
    let mut config = match explicit_path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("reading config file {}: {e}", path.display()))?;
            toml::from_str(&contents)
                .map_err(|e| anyhow::anyhow!("parsing config file {}: {e}", path.display()))?
        }
        None => {
            let default_path = std::path::Path::new("openclaw-mem.toml");
            if default_path.exists() {
                let contents = std::fs::read_to_string(default_path)?;
                toml::from_str(&contents)
                    .map_err(|e| anyhow::anyhow!("parsing openclaw-mem.toml: {e}"))?
            } else {
                CliConfig::default()
            }
        }
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut CliConfig) {
    if let Ok(db) = std::env::var("OPENCLAW_MEM_DB") {
        config.db_path = Some(db);
    }
    if let Ok(scorer) = std::env::var("OPENCLAW_MEM_IMPORTANCE_SCORER") {
        config.memory.importance_scorer = match scorer.as_str() {
            "off" => openclaw_mem_core::config::ImportanceScorer::Off,
            _ => openclaw_mem_core::config::ImportanceScorer::HeuristicV1,
        };
    }
    if let Some(v) = truthy_env("OPENCLAW_MEM_GRAPH_AUTO_RECALL") {
        config.memory.graph.auto_recall = v;
    }
    if let Some(v) = truthy_env("OPENCLAW_MEM_GRAPH_AUTO_CAPTURE") {
        config.memory.graph.auto_capture = v;
    }
    if let Some(v) = truthy_env("OPENCLAW_MEM_GRAPH_AUTO_CAPTURE_MD") {
        config.memory.graph.auto_capture_md = v;
    }
}

fn truthy_env(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    Some(matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_no_file_and_no_env() {
        let config = CliConfig::default();
        assert_eq!(config.db_path(), "openclaw-mem.db");
    }
}
