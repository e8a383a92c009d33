//! Error types for agent-core

use thiserror::Error;

/// Result type alias for agent-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for agent operations
#[derive(Error, Debug)]
pub enum Error {
    /// Generic error message
    #[error("{0}")]
    Generic(String),

    /// The query could not be accepted at all
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Agent processing failed
    #[error("Agent processing failed: {0}")]
    ProcessingFailed(String),

    /// The generation service returned an error
    #[error("Generation failed: {0}")]
    GenerationFailed(String),
}
