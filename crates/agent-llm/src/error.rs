//! Generation-service failures

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LLMError>;

/// Why a completion could not be produced
///
/// Agents treat every variant the same way: the generated text is dropped
/// and the evidence digest is used instead.
#[derive(Error, Debug)]
pub enum LLMError {
    /// Non-success status not covered below
    #[error("generation request failed: {0}")]
    RequestFailed(String),

    #[error("generation service rejected the credentials")]
    AuthenticationFailed,

    #[error("generation service is throttling requests: {0}")]
    RateLimitExceeded(String),

    /// Bad request or unknown model
    #[error("generation request rejected: {0}")]
    InvalidRequest(String),

    #[error("could not encode generation payload: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[cfg(feature = "openai")]
    #[error("transport error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Body parsed but carried no usable text
    #[error("unexpected completion payload: {0}")]
    UnexpectedResponse(String),

    /// Neither an API key nor a base URL is available
    #[error("generation provider not configured: {0}")]
    ConfigurationError(String),
}
