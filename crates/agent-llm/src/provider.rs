//! LLM provider trait definition

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// Trait for text-generation providers
///
/// Implementations wrap one generation backend. Agents only ever see this
/// trait, so a failing or missing backend never reaches the retrieval core.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate text for the request
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the provider name (e.g., "openai")
    fn name(&self) -> &str;
}
