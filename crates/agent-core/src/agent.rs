//! Core Agent trait definition

use crate::{Context, Result, Source};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What an agent hands back to the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentOutput {
    /// Display name of the producing agent
    pub agent: String,
    /// Analysis text; numbers in it must carry citation markers
    pub content: String,
    /// Sources the content is allowed to cite
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl AgentOutput {
    /// Create an output
    pub fn new(agent: impl Into<String>, content: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            agent: agent.into(),
            content: content.into(),
            sources,
        }
    }
}

/// Core trait that all agents must implement
///
/// Agents never retrieve on their own: the orchestrator places the retrieved
/// evidence in the [`Context`] and every agent reads it from there.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Analyse `query` against the evidence in `context`
    async fn run(&self, query: &str, context: &Context) -> Result<AgentOutput>;

    /// Get the agent's name
    fn name(&self) -> &str;
}
