//! Request orchestration
//!
//! One request runs retrieval once, hands the evidence to the three analysis
//! agents in turn, then to the summarizer. Every agent output is audited for
//! uncited numbers; problems become warnings, never errors. The only fatal
//! condition is an invalid query.

use crate::agents::{
    FocusRouter, FundamentalNewsAgent, GenerationSettings, MarketDataAgent, PortfolioRiskAgent,
    SummarizerAgent,
};
use crate::attribution::AttributionChecker;
use crate::error::{FinanceError, Result};
use crate::retriever::{Retriever, STARVATION_WARNING};
use agent_core::context::keys;
use agent_core::{Agent, AgentOutput, Context, Evidence};
use agent_llm::LLMProvider;
use agent_utils::Settings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const MIN_QUERY_CHARS: usize = 3;
pub const MAX_QUERY_CHARS: usize = 2000;

/// Final answer used when sources are required and none were retrieved
pub const INSUFFICIENT_EVIDENCE_ANSWER: &str = "I do not have enough retrieved evidence to answer reliably: no verified source found. Provide documents or connect a data source, then retry.";

/// Metadata keys of [`AnalyzeResponse::meta`]
pub mod meta_keys {
    pub const REQUEST_ID: &str = "request_id";
    pub const SOURCES_RETRIEVED: &str = "sources_retrieved";
    pub const MARKET_DATA: &str = "market_data";
    pub const TICKERS: &str = "tickers";
}

/// One analysis request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub query: String,
    /// Ticker to look up before any found in the query
    #[serde(default)]
    pub ticker: Option<String>,
    /// Overrides the configured result bound
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl AnalyzeRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ticker: None,
            top_k: None,
        }
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }
}

/// Whether live market data backed the answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    Live,
    Offline,
}

/// Outcome of one analysis request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub mode: ResponseMode,
    pub final_answer: String,
    /// Analysis agents in run order, then the summarizer
    pub agent_outputs: Vec<AgentOutput>,
    pub warnings: Vec<String>,
    pub meta: BTreeMap<String, String>,
}

/// Runs retrieval, the analysis agents and the summarizer for one request
pub struct Orchestrator {
    retriever: Retriever,
    settings: Settings,
    market: MarketDataAgent,
    fundamental: FundamentalNewsAgent,
    risk: PortfolioRiskAgent,
    summarizer: SummarizerAgent,
    checker: AttributionChecker,
}

impl Orchestrator {
    pub fn new(retriever: Retriever, settings: Settings) -> Result<Self> {
        let generation = GenerationSettings::from(&settings);
        let router = FocusRouter::new(&retriever.config().metrics);
        Ok(Self {
            market: MarketDataAgent::new(generation.clone())?.with_router(router.clone()),
            fundamental: FundamentalNewsAgent::new(generation.clone())?.with_router(router.clone()),
            risk: PortfolioRiskAgent::new(generation.clone())?.with_router(router.clone()),
            summarizer: SummarizerAgent::new(generation)?.with_router(router),
            retriever,
            checker: AttributionChecker::new()?,
            settings,
        })
    }

    /// Let every agent generate text through `llm`
    pub fn with_llm(mut self, llm: Arc<dyn LLMProvider>) -> Self {
        self.market = self.market.with_llm(Arc::clone(&llm));
        self.fundamental = self.fundamental.with_llm(Arc::clone(&llm));
        self.risk = self.risk.with_llm(Arc::clone(&llm));
        self.summarizer = self.summarizer.with_llm(llm);
        self
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn retriever_mut(&mut self) -> &mut Retriever {
        &mut self.retriever
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn validate(query: &str) -> Result<()> {
        let chars = query.chars().count();
        if chars < MIN_QUERY_CHARS {
            return Err(FinanceError::InvalidQuery(format!(
                "query must be at least {MIN_QUERY_CHARS} characters"
            )));
        }
        if chars > MAX_QUERY_CHARS {
            return Err(FinanceError::InvalidQuery(format!(
                "query must be at most {MAX_QUERY_CHARS} characters"
            )));
        }
        Ok(())
    }

    fn audit(&self, output: &AgentOutput, warnings: &mut Vec<String>) {
        let report = self.checker.check(&output.content, &output.sources);
        for violation in report.violations() {
            warn!(agent = %output.agent, %violation, "Attribution violation");
            warnings.push(format!("{}: {violation}", output.agent));
        }
    }

    /// Analyse one request
    pub async fn run(&self, request: AnalyzeRequest) -> Result<AnalyzeResponse> {
        let query = request.query.trim();
        Self::validate(query)?;

        let request_id = Uuid::new_v4().to_string();
        let top_k = request.top_k.unwrap_or(self.settings.top_k);
        let mut warnings = Vec::new();

        let (evidence, tickers) = if self.settings.enable_retrieval {
            let retrieval = self
                .retriever
                .gather(query, request.ticker.as_deref(), top_k)
                .await;
            warnings.extend(retrieval.warnings);
            (retrieval.evidence, retrieval.tickers)
        } else {
            debug!(%request_id, "Retrieval disabled");
            (Evidence::none("retrieval disabled"), Vec::new())
        };

        let starved = evidence.is_empty();
        if starved && self.settings.require_sources && !warnings.iter().any(|w| w == STARVATION_WARNING) {
            warnings.push(STARVATION_WARNING.to_string());
        }
        let sources_retrieved = evidence.sources().len();

        let mut context = Context::new()
            .with_evidence(evidence)
            .with_request_id(request_id.clone());
        context.insert_typed(keys::TICKER_CANDIDATES, &tickers)?;

        let agents: [&dyn Agent; 3] = [&self.market, &self.fundamental, &self.risk];
        for agent in agents {
            match agent.run(query, &context).await {
                Ok(output) => {
                    self.audit(&output, &mut warnings);
                    context.push_output(output);
                },
                Err(e) => {
                    warn!(agent = agent.name(), error = %e, "Agent failed");
                    warnings.push(format!("{} failed: {e}", agent.name()));
                },
            }
        }

        let summary = self.summarizer.run(query, &context).await?;
        self.audit(&summary, &mut warnings);

        let final_answer = if starved && self.settings.require_sources {
            INSUFFICIENT_EVIDENCE_ANSWER.to_string()
        } else {
            summary.content.clone()
        };

        let mut agent_outputs = context.agent_outputs().to_vec();
        agent_outputs.push(summary);

        let mode = match self.retriever.market_data_name() {
            Some(_) if self.settings.enable_retrieval => ResponseMode::Live,
            _ => ResponseMode::Offline,
        };

        let mut meta = BTreeMap::new();
        meta.insert(meta_keys::REQUEST_ID.to_string(), request_id.clone());
        meta.insert(meta_keys::SOURCES_RETRIEVED.to_string(), sources_retrieved.to_string());
        meta.insert(
            meta_keys::MARKET_DATA.to_string(),
            self.retriever.market_data_name().unwrap_or("none").to_string(),
        );
        meta.insert(meta_keys::TICKERS.to_string(), tickers.join(","));

        info!(
            %request_id,
            sources = sources_retrieved,
            warnings = warnings.len(),
            mode = ?mode,
            "Analysis finished"
        );

        Ok(AnalyzeResponse {
            mode,
            final_answer,
            agent_outputs,
            warnings,
            meta,
        })
    }
}
