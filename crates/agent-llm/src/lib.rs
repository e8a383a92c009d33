//! Text-generation contract for the financial agents
//!
//! The generation service is a black box: a prompt, a system prompt and
//! sampling parameters go in, generated text (or a provider error) comes out.
//! This crate pins that contract down:
//!
//! - Completion request/response types
//! - Provider trait for generation backends
//! - An OpenAI-compatible provider (behind the `openai` feature)

pub mod completion;
pub mod error;
pub mod provider;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{LLMError, Result};
pub use provider::LLMProvider;

// Provider implementations (feature-gated)
#[cfg(feature = "openai")]
pub mod providers;
