//! Wires a [`CliConfig`] into the concrete collaborators every command
//! needs: the ledger handle and (optionally) an embedding provider.
//! Grounded in the teacher's `initialize_storage` split (`memory-cli`'s
//! `main.rs`) of "load config, then build the backends once."

use std::path::PathBuf;

use openclaw_mem_core::embeddings_client::HttpEmbeddingProvider;
use openclaw_mem_storage::LibsqlLedger;

use crate::config::CliConfig;

/// The opened ledger plus an optional embedding provider, shared by every
/// command that needs to talk to storage.
pub struct Context {
    pub ledger: LibsqlLedger,
    pub embedder: Option<HttpEmbeddingProvider>,
    pub config: CliConfig,
}

impl Context {
    pub async fn open(config: CliConfig) -> anyhow::Result<Self> {
        let ledger = LibsqlLedger::open(
            &config.db_path(),
            config.memory.writer_contention,
            config.memory.ingest.idempotency_window_hours,
        )
        .await?;

        let embedder = config
            .embedding
            .clone()
            .map(HttpEmbeddingProvider::new)
            .transpose()?;

        Ok(Self {
            ledger,
            embedder,
            config,
        })
    }

    pub fn base_dir(&self) -> PathBuf {
        self.config.base_dir()
    }

    pub fn embedding_model(&self) -> String {
        self.config.memory.recall.embedding_model.clone()
    }
}
