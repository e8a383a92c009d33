//! Execution context for agents
//!
//! The `Context` carries the evidence retrieved for one request, the outputs
//! of agents that already ran, and a small key-value store for request
//! metadata.

use crate::{AgentOutput, Evidence};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Well-known context keys for request metadata
pub mod keys {
    /// Request identifier
    pub const REQUEST_ID: &str = "request_id";
    /// Ticker symbols sent to the live provider, in first-appearance order
    pub const TICKER_CANDIDATES: &str = "ticker_candidates";
}

/// Context passed to agents during execution
///
/// # Example
///
/// ```
/// use agent_core::{Context, Evidence, Source};
///
/// let ctx = Context::new()
///     .with_evidence(Evidence::from_sources(vec![Source::document("d1", "Report")]))
///     .with_request_id("req-123");
///
/// assert_eq!(ctx.request_id(), Some("req-123"));
/// assert_eq!(ctx.sources().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    evidence: Evidence,
    agent_outputs: Vec<AgentOutput>,
    data: HashMap<String, serde_json::Value>,
}

impl Context {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    // =========== Builder Methods ===========

    /// Set the retrieved evidence
    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence = evidence;
        self
    }

    /// Set the request ID
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.insert(keys::REQUEST_ID, serde_json::json!(request_id.into()));
        self
    }

    /// Add outputs of agents that already ran
    pub fn with_agent_outputs(mut self, outputs: Vec<AgentOutput>) -> Self {
        self.agent_outputs.extend(outputs);
        self
    }

    // =========== Common Accessors ===========

    /// Retrieved evidence
    pub fn evidence(&self) -> &Evidence {
        &self.evidence
    }

    /// Retrieved sources, empty when there is no evidence
    pub fn sources(&self) -> &[crate::Source] {
        self.evidence.sources()
    }

    /// Outputs of agents that already ran
    pub fn agent_outputs(&self) -> &[AgentOutput] {
        &self.agent_outputs
    }

    /// Record an agent output
    pub fn push_output(&mut self, output: AgentOutput) {
        self.agent_outputs.push(output);
    }

    /// Get the request ID
    pub fn request_id(&self) -> Option<&str> {
        self.get(keys::REQUEST_ID).and_then(|v| v.as_str())
    }

    // =========== Generic Key-Value Operations ===========

    /// Insert a value into the context
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    /// Get a value from the context
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Insert a typed value into the context
    pub fn insert_typed<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> crate::Result<()> {
        let json_value = serde_json::to_value(value).map_err(|e| {
            crate::Error::ProcessingFailed(format!("Failed to serialize context value: {e}"))
        })?;
        self.data.insert(key.into(), json_value);
        Ok(())
    }

    /// Get a typed value from the context
    pub fn get_typed<T: for<'de> Deserialize<'de>>(&self, key: &str) -> crate::Result<Option<T>> {
        match self.data.get(key) {
            None => Ok(None),
            Some(value) => {
                let typed = serde_json::from_value(value.clone()).map_err(|e| {
                    crate::Error::ProcessingFailed(format!(
                        "Failed to deserialize context value: {e}"
                    ))
                })?;
                Ok(Some(typed))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Source;

    #[test]
    fn test_default_has_no_evidence() {
        let ctx = Context::new();
        assert!(ctx.evidence().is_empty());
        assert!(ctx.sources().is_empty());
        assert!(ctx.agent_outputs().is_empty());
        assert_eq!(ctx.request_id(), None);
    }

    #[test]
    fn test_outputs_accumulate() {
        let mut ctx = Context::new().with_agent_outputs(vec![AgentOutput::new(
            "Market Data Agent",
            "text",
            Vec::new(),
        )]);
        ctx.push_output(AgentOutput::new("Portfolio & Risk Agent", "text", Vec::new()));

        let names: Vec<_> = ctx.agent_outputs().iter().map(|o| o.agent.as_str()).collect();
        assert_eq!(names, vec!["Market Data Agent", "Portfolio & Risk Agent"]);
    }

    #[test]
    fn test_typed_values() {
        let mut ctx = Context::new()
            .with_evidence(Evidence::from_sources(vec![Source::document("d1", "Report")]));
        ctx.insert_typed(keys::TICKER_CANDIDATES, &vec!["AAPL", "MSFT"])
            .unwrap();

        let tickers: Vec<String> = ctx.get_typed(keys::TICKER_CANDIDATES).unwrap().unwrap();
        assert_eq!(tickers, vec!["AAPL", "MSFT"]);
        assert!(ctx.get_typed::<Vec<String>>("missing").unwrap().is_none());
        assert_eq!(ctx.sources()[0].id, "doc:d1");
    }
}
