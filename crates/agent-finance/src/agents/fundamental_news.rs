//! Fundamentals and news agent: filings, reported financials and headlines

use super::{EvidenceWriter, FocusRouter, GenerationSettings, prompts};
use crate::error::Result;
use crate::metrics::AgentFocus;
use agent_core::{Agent, AgentOutput, Context, Source};
use agent_llm::LLMProvider;
use async_trait::async_trait;
use std::sync::Arc;

/// Reads corpus documents, fundamental metrics and headlines
#[derive(Clone)]
pub struct FundamentalNewsAgent {
    writer: EvidenceWriter,
    router: FocusRouter,
}

impl FundamentalNewsAgent {
    pub const NAME: &'static str = "Fundamental & News Agent";

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

    /// Documents, headlines and fundamental live metrics
    pub fn focus(&self, source: &Source) -> bool {
        self.router.accepts(AgentFocus::Fundamental, source)
    }
}

#[async_trait]
impl Agent for FundamentalNewsAgent {
    async fn run(&self, query: &str, context: &Context) -> agent_core::Result<AgentOutput> {
        let sources = self.router.select(AgentFocus::Fundamental, context.sources());
        let content = self
            .writer
            .write(
                Self::NAME,
                "Fundamentals and news",
                prompts::FUNDAMENTAL_NEWS_SYSTEM,
                query,
                &sources,
            )
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
    use crate::agents::test_support::CannedProvider;
    use agent_core::Evidence;

    fn context() -> Context {
        Context::new().with_evidence(Evidence::from_sources(vec![
            Source::document("aapl-q4", "AAPL Q4 Earnings").with_snippet("Revenue: $89.5 billion"),
            Source::document_metric("aapl-q4", "eps", "AAPL Q4 Earnings").with_snippet("EPS $1.46"),
            Source::live("AAPL", "news:0", "Apple ships new chips"),
            Source::live("AAPL", "price", "AAPL Current Price").with_snippet("Current Price: $189.50"),
        ]))
    }

    #[test]
    fn test_focus() {
        let agent = FundamentalNewsAgent::new(GenerationSettings::default()).unwrap();
        assert!(agent.focus(&Source::document("d", "t")));
        assert!(agent.focus(&Source::live("AAPL", "eps", "t")));
        assert!(agent.focus(&Source::live("AAPL", "news:3", "t")));
        assert!(!agent.focus(&Source::live("AAPL", "beta", "t")));
    }

    #[tokio::test]
    async fn test_run_digest() {
        let agent = FundamentalNewsAgent::new(GenerationSettings::default()).unwrap();
        let output = agent.run("AAPL revenue and news", &context()).await.unwrap();

        assert_eq!(output.sources.len(), 3);
        assert!(output.content.contains("\"Revenue: $89.5 billion\" [doc:aapl-q4]"));
        assert!(output.content.contains("- Apple ships new chips [live:AAPL:news:0]"));
        assert!(!output.content.contains("189.50"));
    }

    #[tokio::test]
    async fn test_generated_text_citing_outside_focus_is_rejected() {
        // the price source exists but was not handed to this agent
        let reply = "Shares trade at $189.50 [live:AAPL:price].";
        let agent = FundamentalNewsAgent::new(GenerationSettings::default())
            .unwrap()
            .with_llm(Arc::new(CannedProvider(Some(reply.to_string()))));

        let output = agent.run("AAPL revenue", &context()).await.unwrap();
        assert!(output.content.starts_with("Fundamentals and news:\n"));
    }
}
