//! Market data agent: pricing, trading activity and price history

use super::{EvidenceWriter, FocusRouter, GenerationSettings, prompts};
use crate::error::Result;
use crate::metrics::AgentFocus;
use agent_core::{Agent, AgentOutput, Context, Source};
use agent_llm::LLMProvider;
use async_trait::async_trait;
use std::sync::Arc;

/// Reads live quote snapshots and history statistics
#[derive(Clone)]
pub struct MarketDataAgent {
    writer: EvidenceWriter,
    router: FocusRouter,
}

impl MarketDataAgent {
    pub const NAME: &'static str = "Market Data Agent";

    pub fn new(settings: GenerationSettings) -> Result<Self> {
        Ok(Self {
            writer: EvidenceWriter::new(settings)?,
            router: FocusRouter::default(),
        })
    }

    pub fn with_llm(mut self, llm: Arc<dyn LLMProvider>) -> Self {
        self.writer.set_llm(llm);
        self
    }

    /// Route live metrics by the table the retriever uses
    pub fn with_router(mut self, router: FocusRouter) -> Self {
        self.router = router;
        self
    }

    /// Live quote and history sources
    pub fn focus(&self, source: &Source) -> bool {
        self.router.accepts(AgentFocus::Market, source)
    }
}

#[async_trait]
impl Agent for MarketDataAgent {
    async fn run(&self, query: &str, context: &Context) -> agent_core::Result<AgentOutput> {
        let sources = self.router.select(AgentFocus::Market, context.sources());
        let content = self
            .writer
            .write(Self::NAME, "Market data", prompts::MARKET_DATA_SYSTEM, query, &sources)
            .await;
        Ok(AgentOutput::new(Self::NAME, content, sources))
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}
