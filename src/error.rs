//! Engine error taxonomy.
//!
//! Every variant carries a stable kind string plus a human-readable reason;
//! no internal state (lock names, addresses) appears in messages.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Invalid score: {0}")]
    InvalidScore(String),

    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: i64 },

    #[error("Rejected by anti-cheat policy: {0}")]
    AntiCheatRejected(String),

    #[error("Anti-cheat policy unavailable: {0}")]
    AntiCheatUnavailable(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("Partial commit: {failed} of {total} target boards failed")]
    PartialCommitFailure { failed: usize, total: usize },
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Stable machine-readable kind, independent of the reason text.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidScore(_) => "invalid_score",
            EngineError::RateLimited { .. } => "rate_limited",
            EngineError::AntiCheatRejected(_) => "anti_cheat_rejected",
            EngineError::AntiCheatUnavailable(_) => "anti_cheat_unavailable",
            EngineError::InvalidQuery(_) => "invalid_query",
            EngineError::RegistryUnavailable(_) => "registry_unavailable",
            EngineError::PartialCommitFailure { .. } => "partial_commit_failure",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::RateLimited { .. }
                | EngineError::AntiCheatUnavailable(_)
                | EngineError::RegistryUnavailable(_)
                | EngineError::PartialCommitFailure { .. }
        )
    }
}
