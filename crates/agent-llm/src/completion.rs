//! Completion request and response types

use serde::{Deserialize, Serialize};

/// Defaults applied by [`CompletionRequestBuilder::new`]
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_MAX_TOKENS: usize = 800;

/// Request for one text generation
///
/// Mirrors the generation service contract: prompt, system prompt,
/// temperature and a bound on output tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,

    /// Question plus the rendered evidence block
    pub prompt: String,

    /// Citation rules for the agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    pub temperature: f32,

    /// Upper bound on output tokens
    pub max_tokens: usize,
}

/// Generated text, unaudited
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub text: String,

    /// Only present when the provider reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl TokenUsage {
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

impl CompletionRequest {
    pub fn builder(model: impl Into<String>) -> CompletionRequestBuilder {
        CompletionRequestBuilder::new(model)
    }
}

/// Builder for [`CompletionRequest`], starting from the low-temperature defaults
pub struct CompletionRequestBuilder {
    model: String,
    prompt: String,
    system: Option<String>,
    temperature: f32,
    max_tokens: usize,
}

impl CompletionRequestBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: String::new(),
            system: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn build(self) -> CompletionRequest {
        CompletionRequest {
            model: self.model,
            prompt: self.prompt,
            system: self.system,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}
