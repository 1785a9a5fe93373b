//! Domain-level error taxonomy.
//!
//! Configuration errors are fatal before any processing begins; backend
//! errors are retried and degraded by the orchestrator and only surface
//! here when a whole unit of work is lost.

use crate::config::ConfigError;

/// relnotes domain errors.
#[derive(Debug, thiserror::Error)]
pub enum RelnotesError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("backend error: {0}")]
    Backend(#[from] relnotes_llm::BackendError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("summarization cancelled")]
    Cancelled,
}

/// Result type for relnotes domain operations.
pub type Result<T> = std::result::Result<T, RelnotesError>;
