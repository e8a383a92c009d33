//! Final answer synthesis
//!
//! Produces four markdown sections from the retrieved evidence and the
//! earlier agent outputs. The deterministic layout is used unless a
//! generation provider returns text that keeps every section and passes the
//! citation audit.

use super::{EvidenceWriter, FocusRouter, GenerationSettings, digest_line, prompts};
use crate::corpus::snippet::single_line;
use crate::error::Result;
use crate::metrics::AgentFocus;
use agent_core::{Agent, AgentOutput, Context, Source, UNCERTAINTY_PHRASE};
use agent_llm::LLMProvider;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

pub const THESIS_HEADING: &str = "## Investment Thesis";
pub const RISKS_HEADING: &str = "## Key Risks";
pub const EVIDENCE_HEADING: &str = "## Evidence & Sources";
pub const RECOMMENDATION_HEADING: &str = "## Recommendation";

const SECTIONS: [&str; 4] = [THESIS_HEADING, RISKS_HEADING, EVIDENCE_HEADING, RECOMMENDATION_HEADING];

const THESIS_LIMIT: usize = 4;
const RISK_LIMIT: usize = 3;

#[derive(Clone)]
pub struct SummarizerAgent {
    writer: EvidenceWriter,
    router: FocusRouter,
}

impl SummarizerAgent {
    pub const NAME: &'static str = "Summarizer";

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

    /// Deterministic structured answer over `sources`
    pub fn compose(&self, sources: &[Source]) -> String {
        let thesis: Vec<String> = sources
            .iter()
            .filter(|s| {
                self.router.accepts(AgentFocus::Market, s) || self.router.accepts(AgentFocus::Fundamental, s)
            })
            .take(THESIS_LIMIT)
            .map(digest_line)
            .collect();
        let risks: Vec<String> = sources
            .iter()
            .filter(|s| self.router.accepts(AgentFocus::Risk, s))
            .take(RISK_LIMIT)
            .map(digest_line)
            .collect();
        let evidence: Vec<String> = sources
            .iter()
            .map(|s| match &s.url {
                Some(url) => format!("- [{}] {} ({url})", s.id, single_line(&s.title)),
                None => format!("- [{}] {}", s.id, single_line(&s.title)),
            })
            .collect();

        let recommendation = if sources.is_empty() {
            format!("- No recommendation: {UNCERTAINTY_PHRASE} in the retrieved evidence.")
        } else {
            "- Weigh the cited figures against your own objectives; this summary is informational and not investment advice."
                .to_string()
        };

        [
            section(THESIS_HEADING, &thesis, "Supporting figures"),
            section(RISKS_HEADING, &risks, "Risk figures"),
            section(EVIDENCE_HEADING, &evidence, "Sources"),
            format!("{RECOMMENDATION_HEADING}\n{recommendation}"),
        ]
        .join("\n\n")
    }
}

fn section(heading: &str, bullets: &[String], missing: &str) -> String {
    if bullets.is_empty() {
        format!("{heading}\n- {missing}: {UNCERTAINTY_PHRASE}.")
    } else {
        format!("{heading}\n{}", bullets.join("\n"))
    }
}

fn has_all_sections(text: &str) -> bool {
    SECTIONS.iter().all(|heading| text.contains(heading))
}

#[async_trait]
impl Agent for SummarizerAgent {
    async fn run(&self, query: &str, context: &Context) -> agent_core::Result<AgentOutput> {
        let sources = context.sources();

        if !sources.is_empty() {
            match self.writer.prompts().summary(query, context.agent_outputs(), sources) {
                Ok(prompt) => {
                    let generated = self
                        .writer
                        .generate(Self::NAME, prompts::SUMMARIZER_SYSTEM, prompt, sources, has_all_sections)
                        .await;
                    if let Some(text) = generated {
                        return Ok(AgentOutput::new(Self::NAME, text, sources.to_vec()));
                    }
                },
                Err(e) => warn!(agent = Self::NAME, error = %e, "Prompt rendering failed"),
            }
        }

        Ok(AgentOutput::new(Self::NAME, self.compose(sources), sources.to_vec()))
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}
