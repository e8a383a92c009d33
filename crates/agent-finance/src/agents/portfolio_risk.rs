//! Portfolio and risk agent: volatility, leverage, liquidity and beta

use super::{EvidenceWriter, FocusRouter, GenerationSettings, prompts};
use crate::error::Result;
use crate::metrics::AgentFocus;
use agent_core::{Agent, AgentOutput, Context, Source};
use agent_llm::LLMProvider;
use async_trait::async_trait;
use std::sync::Arc;

/// Reads history statistics and balance-sheet risk metrics
#[derive(Clone)]
pub struct PortfolioRiskAgent {
    writer: EvidenceWriter,
    router: FocusRouter,
}

impl PortfolioRiskAgent {
    pub const NAME: &'static str = "Portfolio & Risk Agent";

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

    pub fn focus(&self, source: &Source) -> bool {
        self.router.accepts(AgentFocus::Risk, source)
    }
}

#[async_trait]
impl Agent for PortfolioRiskAgent {
    async fn run(&self, query: &str, context: &Context) -> agent_core::Result<AgentOutput> {
        let sources = self.router.select(AgentFocus::Risk, context.sources());
        let content = self
            .writer
            .write(Self::NAME, "Risk", prompts::PORTFOLIO_RISK_SYSTEM, query, &sources)
            .await;
        Ok(AgentOutput::new(Self::NAME, content, sources))
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{Evidence, UNCERTAINTY_PHRASE};

    #[test]
    fn test_focus() {
        let agent = PortfolioRiskAgent::new(GenerationSettings::default()).unwrap();
        assert!(agent.focus(&Source::live("MSFT", "history:1y", "t")));
        assert!(agent.focus(&Source::live("MSFT", "beta", "t")));
        assert!(!agent.focus(&Source::live("MSFT", "eps", "t")));
        assert!(!agent.focus(&Source::document("d", "t")));
    }

    #[tokio::test]
    async fn test_run_without_risk_evidence() {
        let context = Context::new().with_evidence(Evidence::from_sources(vec![
            Source::document("d", "Filing").with_snippet("Revenue: $1.0 billion"),
        ]));

        let agent = PortfolioRiskAgent::new(GenerationSettings::default()).unwrap();
        let output = agent.run("How risky is MSFT?", &context).await.unwrap();

        assert!(output.sources.is_empty());
        assert!(output.content.contains(UNCERTAINTY_PHRASE));
        assert!(!output.content.contains("MSFT"));
    }
}
