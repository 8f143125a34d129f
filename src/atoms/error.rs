// ── Recall Atoms: Error Types ──────────────────────────────────────────────
// Single canonical error enum for the retrieval engine, built with `thiserror`.
//
// Design rules:
//   • Variants are coarse-grained by failure kind (query, embedding, tier,
//     deadline, unavailability, plumbing).
//   • Only `InvalidQuery` and `RetrievalUnavailable` ever leave
//     `RetrievalEngine::search`; everything else is absorbed and logged.
//   • The `#[from]` attribute wires std/external error conversions.
//   • No variant carries secret material (API keys) in its message.

use crate::atoms::types::Tier;
use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EngineError {
    /// Caller contract violation: empty query, zero limit, no tier selected.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Embedder failed to produce a vector.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// A single tier's vector query failed.
    #[error("Tier query error: {tier}: {message}")]
    TierQuery { tier: Tier, message: String },

    /// A deadline expired before the external call answered.
    #[error("Timeout: {operation} exceeded {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    /// Both the local fast path and the remote fallback failed.
    #[error("Retrieval unavailable: local path: {local}; remote path: {remote}")]
    RetrievalUnavailable { local: String, remote: String },

    /// Filesystem or OS-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP / network failure (reqwest layer).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Configuration is invalid or unreadable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catch-all for errors that do not yet have a dedicated variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenience constructors ───────────────────────────────────────────────

impl EngineError {
    pub fn tier_query(tier: Tier, message: impl Into<String>) -> Self {
        Self::TierQuery { tier, message: message.into() }
    }

    pub fn timeout(operation: impl Into<String>, after_ms: u64) -> Self {
        Self::Timeout { operation: operation.into(), after_ms }
    }

    pub fn unavailable(local: impl Into<String>, remote: impl Into<String>) -> Self {
        Self::RetrievalUnavailable { local: local.into(), remote: remote.into() }
    }

    /// True for the two errors that are allowed to cross the engine boundary.
    pub fn is_caller_visible(&self) -> bool {
        matches!(self, Self::InvalidQuery(_) | Self::RetrievalUnavailable { .. })
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(e: toml::de::Error) -> Self {
        EngineError::Config(e.to_string())
    }
}

// ── String bridges ─────────────────────────────────────────────────────────

impl From<String> for EngineError {
    fn from(s: String) -> Self {
        EngineError::Other(s)
    }
}

impl From<&str> for EngineError {
    fn from(s: &str) -> Self {
        EngineError::Other(s.to_string())
    }
}

/// All engine operations return this type.
pub type EngineResult<T> = Result<T, EngineError>;

impl From<EngineError> for String {
    fn from(e: EngineError) -> Self {
        e.to_string()
    }
}
