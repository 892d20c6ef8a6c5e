//! Error taxonomy for the ledger, ingest, retrieval, and policy layers (spec §7).

/// Result type alias used throughout `openclaw-mem-core`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the core. Per-record failures (`SchemaViolation`,
/// `Duplicate`, `EmbeddingInputTooLong`, `ProviderUnavailable`,
/// `PolicyRejected`) are accumulated into receipts by callers rather than
/// aborting a batch; only whole-job failures should propagate past a CLI
/// command boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input record missing a required field or with an invalid type.
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// Content-hash already present within the idempotency window.
    #[error("duplicate observation (content-hash already present)")]
    Duplicate,

    /// Transient IO error against the ledger; retried with bounded backoff
    /// by the caller before being escalated.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Writer-lock busy-timeout exceeded. Retryable.
    #[error("ledger writer contended")]
    Contended,

    /// Embedding provider rejected the input length.
    #[error("embedding input too long")]
    EmbeddingInputTooLong,

    /// Embedding provider call failed for any other reason (transient).
    #[error("embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The policy engine blocked the operation (trivial prompt, secret-like
    /// capture, duplicate). Not surfaced as a hard error — recorded as a
    /// rejection reason in the relevant receipt.
    #[error("policy rejected: {0}")]
    PolicyRejected(String),

    /// An id failed its expected shape or references an unknown row.
    #[error("invalid id: {0}")]
    InvalidId(String),

    /// A durable export was attempted without the required confirmation
    /// token.
    #[error("consent required for durable export")]
    ConsentRequired,

    /// An observation referenced by id does not exist.
    #[error("unknown observation: {0}")]
    UnknownObservation(i64),

    /// An embedding vector's length did not match the declared dimension
    /// for its model.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Declared dimension for the model.
        expected: usize,
        /// Actual vector length.
        actual: usize,
    },

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem IO failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the caller may retry this operation after a backoff.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::StorageUnavailable(_)
                | Error::Contended
                | Error::ProviderUnavailable(_)
                | Error::Io(_)
        )
    }
}
