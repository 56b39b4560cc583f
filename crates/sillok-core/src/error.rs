//! Error types for sillok.
//!
//! Unified error type covering store loading, provider calls, and request
//! handling. Error codes follow the pattern `SLK-XXX` for easy debugging.

use thiserror::Error;

/// Result type alias for sillok operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sillok operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Store directory missing or unreadable (SLK-001).
    #[error("[SLK-001] Store load error: {0}")]
    StoreLoad(String),

    /// `meta.jsonl` line failed to parse (SLK-002).
    #[error("[SLK-002] Store metadata parse error: {0}")]
    MetaParse(String),

    /// Referenced doc-id is outside `[0, len(metas))` (SLK-003).
    #[error("[SLK-003] Doc id {0} out of range")]
    DocIdOutOfRange(u32),

    /// Configuration error (SLK-004).
    #[error("[SLK-004] Configuration error: {0}")]
    Config(String),

    /// Embedding provider call failed (SLK-005).
    #[error("[SLK-005] Embedder error: {0}")]
    Embedder(String),

    /// LLM provider call failed (SLK-006).
    #[error("[SLK-006] LLM error: {0}")]
    Llm(String),

    /// The answer-or-request contract failed irrecoverably (SLK-007).
    #[error("[SLK-007] Agent contract error: {0}")]
    AgentContract(String),

    /// IO error (SLK-008).
    #[error("[SLK-008] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error (SLK-009).
    #[error("[SLK-009] Serialization error: {0}")]
    Serialization(String),

    /// Internal invariant violation (SLK-010).
    #[error("[SLK-010] Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the error code (e.g., "SLK-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::StoreLoad(_) => "SLK-001",
            Self::MetaParse(_) => "SLK-002",
            Self::DocIdOutOfRange(_) => "SLK-003",
            Self::Config(_) => "SLK-004",
            Self::Embedder(_) => "SLK-005",
            Self::Llm(_) => "SLK-006",
            Self::AgentContract(_) => "SLK-007",
            Self::Io(_) => "SLK-008",
            Self::Serialization(_) => "SLK-009",
            Self::Internal(_) => "SLK-010",
        }
    }

    /// Returns true if this error is recoverable, i.e. the caller may retry
    /// or fall back rather than aborting the whole request.
    ///
    /// Store load and internal invariant violations are not recoverable;
    /// provider failures are, since the agent loop defines documented
    /// fallbacks for each (see `answer_or_request` and friends).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::StoreLoad(_) | Self::MetaParse(_) | Self::Internal(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
