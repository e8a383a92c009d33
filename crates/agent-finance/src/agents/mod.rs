//! Analysis agents
//!
//! Each agent reads the evidence placed in the [`agent_core::Context`],
//! keeps the slice relevant to its focus and writes a short analysis. With a
//! generation provider the text is generated and then audited; without one,
//! or when generation fails or cites badly, the agent falls back to a digest
//! that quotes snippets verbatim.

pub mod fundamental_news;
pub mod market_data;
pub mod portfolio_risk;
pub mod prompts;
pub mod summarizer;

pub use fundamental_news::FundamentalNewsAgent;
pub use market_data::MarketDataAgent;
pub use portfolio_risk::PortfolioRiskAgent;
pub use summarizer::SummarizerAgent;

use crate::attribution::AttributionChecker;
use crate::corpus::snippet::single_line;
use crate::error::Result;
use crate::metrics::{AgentFocus, MetricTable};
use agent_core::{Source, UNCERTAINTY_PHRASE};
use agent_llm::{CompletionRequest, LLMProvider};
use agent_utils::Settings;
use prompts::Prompts;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Sampling parameters shared by every agent
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for GenerationSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            model: settings.llm_model.clone(),
            temperature: settings.llm_temperature,
            max_tokens: settings.llm_max_tokens,
        }
    }
}

/// Slice of a live source id: `live:AAPL:history:1mo` gives `history:1mo`
pub(crate) fn live_slice(id: &str) -> Option<&str> {
    id.strip_prefix("live:")?.split_once(':').map(|(_, slice)| slice)
}

/// Decides which agents read a source
///
/// Documents go to the fundamentals agent. Live metric sources follow
/// [`MetricSpec::agents`](crate::metrics::MetricSpec::agents) of the table
/// the retriever used, so a metric added through JSON reaches its agent
/// without code changes. Slices the retriever builds itself (`comprehensive`,
/// `price`, `history:*`, `news:*`) have fixed routes.
#[derive(Debug, Clone)]
pub struct FocusRouter {
    slices: HashMap<String, Vec<AgentFocus>>,
}

impl FocusRouter {
    pub fn new(table: &MetricTable) -> Self {
        let mut slices: HashMap<String, Vec<AgentFocus>> = HashMap::from([
            ("comprehensive".to_string(), vec![AgentFocus::Market, AgentFocus::Risk]),
            ("price".to_string(), vec![AgentFocus::Market]),
        ]);
        for metric in table.iter() {
            slices.insert(metric.name.clone(), metric.agents().to_vec());
        }
        Self { slices }
    }

    /// Whether the agent with `focus` reads `source`
    pub fn accepts(&self, focus: AgentFocus, source: &Source) -> bool {
        if source.provenance().is_document() {
            return focus == AgentFocus::Fundamental;
        }
        let Some(slice) = live_slice(&source.id) else {
            return false;
        };
        if slice.starts_with("history:") {
            return matches!(focus, AgentFocus::Market | AgentFocus::Risk);
        }
        if slice.starts_with("news:") {
            return focus == AgentFocus::Fundamental;
        }
        self.slices
            .get(slice)
            .is_some_and(|agents| agents.contains(&focus))
    }

    /// Sources the agent with `focus` reads, in retrieval order
    pub fn select(&self, focus: AgentFocus, sources: &[Source]) -> Vec<Source> {
        sources
            .iter()
            .filter(|s| self.accepts(focus, s))
            .cloned()
            .collect()
    }
}

impl Default for FocusRouter {
    fn default() -> Self {
        Self::new(&MetricTable::default())
    }
}

/// One bullet per source quoting its snippet with the citation marker
pub fn digest(sources: &[Source]) -> String {
    sources
        .iter()
        .map(digest_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Citation stays on the same line as the quoted value
pub(crate) fn digest_line(source: &Source) -> String {
    let title = single_line(&source.title);
    match &source.snippet {
        Some(snippet) => format!("- {title}: \"{}\" {}", single_line(snippet), source.citation()),
        None => format!("- {title} {}", source.citation()),
    }
}

/// Statement used when an agent has nothing to cite
pub fn no_evidence_note(focus: &str) -> String {
    format!("{focus}: {UNCERTAINTY_PHRASE} in the retrieved evidence.")
}

/// Generation with audit and digest fallback, shared by the agent shells
#[derive(Clone)]
pub(crate) struct EvidenceWriter {
    llm: Option<Arc<dyn LLMProvider>>,
    settings: GenerationSettings,
    prompts: Prompts,
    checker: AttributionChecker,
}

impl EvidenceWriter {
    pub(crate) fn new(settings: GenerationSettings) -> Result<Self> {
        Ok(Self {
            llm: None,
            settings,
            prompts: Prompts::new()?,
            checker: AttributionChecker::new()?,
        })
    }

    pub(crate) fn set_llm(&mut self, llm: Arc<dyn LLMProvider>) {
        self.llm = Some(llm);
    }

    pub(crate) fn prompts(&self) -> &Prompts {
        &self.prompts
    }

    /// Raw completion from `llm`
    async fn complete(&self, llm: &dyn LLMProvider, system: &str, prompt: String) -> Result<String> {
        let request = CompletionRequest::builder(&self.settings.model)
            .system(prompts::system_prompt(system))
            .prompt(prompt)
            .temperature(self.settings.temperature)
            .max_tokens(self.settings.max_tokens)
            .build();

        let response = llm.complete(request).await?;
        Ok(response.text)
    }

    /// Generated text that passes the audit, if a provider is configured
    ///
    /// `accept` adds agent-specific checks on top of the citation audit.
    pub(crate) async fn generate(
        &self,
        agent: &str,
        system: &str,
        prompt: String,
        sources: &[Source],
        accept: impl Fn(&str) -> bool,
    ) -> Option<String> {
        let llm = self.llm.as_ref()?;

        let text = match self.complete(llm.as_ref(), system, prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(agent, provider = llm.name(), error = %e, "Generation failed, using digest");
                return None;
            },
        };

        let report = self.checker.check(&text, sources);
        if !report.is_compliant() || !report.unknown_citations.is_empty() || !accept(&text) {
            warn!(
                agent,
                violations = ?report.violations(),
                "Generated text rejected, using digest"
            );
            return None;
        }

        debug!(agent, claims = report.claims.len(), "Generated text passed citation audit");
        Some(text)
    }

    /// Analysis of `sources` for one focus area
    pub(crate) async fn write(
        &self,
        agent: &str,
        focus: &str,
        system: &str,
        query: &str,
        sources: &[Source],
    ) -> String {
        if sources.is_empty() {
            return no_evidence_note(focus);
        }

        if self.llm.is_some() {
            match self.prompts.agent(query, sources) {
                Ok(prompt) => {
                    if let Some(text) = self.generate(agent, system, prompt, sources, |_| true).await {
                        return text;
                    }
                },
                Err(e) => warn!(agent, error = %e, "Prompt rendering failed, using digest"),
            }
        }

        format!("{focus}:\n{}", digest(sources))
    }
}
