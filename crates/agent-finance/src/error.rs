//! Error types for retrieval and analysis operations

use thiserror::Error;

/// Finance-specific errors
///
/// Most of these never reach the caller of the retriever: provider failures
/// are folded into [`crate::market::Lookup::Failed`] and logged. Only query
/// validation and construction-time problems surface as `Err`.
#[derive(Debug, Error)]
pub enum FinanceError {
    /// API request failed
    #[error("API error: {0}")]
    ApiError(String),

    /// Invalid stock symbol provided
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Data not available for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The query cannot be processed at all
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A document with this id is already in the corpus
    #[error("Duplicate document id: {0}")]
    DuplicateDocument(String),

    /// The generation service failed
    #[error("Generation error: {0}")]
    Generation(#[from] agent_llm::LLMError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for finance operations
pub type Result<T> = std::result::Result<T, FinanceError>;

impl From<FinanceError> for agent_core::Error {
    fn from(err: FinanceError) -> Self {
        match err {
            FinanceError::InvalidQuery(msg) => agent_core::Error::InvalidQuery(msg),
            FinanceError::Generation(e) => agent_core::Error::GenerationFailed(e.to_string()),
            other => agent_core::Error::ProcessingFailed(other.to_string()),
        }
    }
}

impl From<agent_core::Error> for FinanceError {
    fn from(err: agent_core::Error) -> Self {
        match err {
            agent_core::Error::InvalidQuery(msg) => FinanceError::InvalidQuery(msg),
            other => FinanceError::Other(other.to_string()),
        }
    }
}

impl From<regex::Error> for FinanceError {
    fn from(err: regex::Error) -> Self {
        FinanceError::ConfigError(format!("invalid pattern: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FinanceError::InvalidSymbol("INVALID".to_string());
        assert_eq!(err.to_string(), "Invalid symbol: INVALID");

        let err = FinanceError::DataUnavailable {
            symbol: "ZZZZZ".to_string(),
            reason: "no quote".to_string(),
        };
        assert_eq!(err.to_string(), "Data not available for ZZZZZ: no quote");
    }

    #[test]
    fn test_error_conversion() {
        let agent_err: agent_core::Error = FinanceError::ApiError("boom".to_string()).into();
        match agent_err {
            agent_core::Error::ProcessingFailed(msg) => assert!(msg.contains("API error")),
            _ => panic!("Expected ProcessingFailed variant"),
        }

        let agent_err: agent_core::Error = FinanceError::InvalidQuery("too short".to_string()).into();
        assert!(matches!(agent_err, agent_core::Error::InvalidQuery(_)));
    }
}
