//! Evidence retrieval and attribution for financial agents
//!
//! This crate answers the question "what evidence do we have for this
//! query?" and enforces that every number a downstream agent writes can be
//! traced back to it. It includes:
//!
//! - Ticker and metric extraction from free-text queries
//! - A data-driven metric keyword table
//! - An in-memory document corpus with keyword scoring and sentence selection
//! - Live market data (Yahoo Finance, or a deterministic in-memory provider)
//!   with per-category failure isolation
//! - The aggregator merging both into one ranked, deduplicated source list
//! - A citation audit for generated text
//! - Analysis agents, a summarizer and the request orchestrator
//!
//! # Example
//!
//! ```rust,no_run
//! use agent_finance::{DocumentCorpus, RetrievalConfig, Retriever, YahooProvider};
//! use std::sync::Arc;
//!
//! # async fn demo() -> agent_finance::Result<()> {
//! let retriever = Retriever::new(DocumentCorpus::seeded()?, RetrievalConfig::default())?
//!     .with_market_data(Arc::new(YahooProvider::new()?));
//!
//! for source in retriever.retrieve("What is AAPL's operating income?", 5).await {
//!     println!("[{}] {}", source.id, source.snippet.unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

pub mod agents;
pub mod api;
pub mod attribution;
pub mod config;
pub mod corpus;
pub mod error;
pub mod extract;
pub mod market;
pub mod metrics;
pub mod orchestrator;
pub mod retriever;

// Re-export main types for convenience
pub use agents::{
    FocusRouter, FundamentalNewsAgent, GenerationSettings, MarketDataAgent, PortfolioRiskAgent,
    SummarizerAgent,
};
pub use api::{HistoryPeriod, InMemoryMarketData, MarketDataProvider, NewsItem, PriceBar, YahooProvider};
pub use attribution::{AttributionChecker, AttributionReport, NumericClaim};
pub use config::{MarketDataConfig, RetrievalConfig, ScoringWeights};
pub use corpus::{Document, DocumentCorpus, DocumentKind};
pub use error::{FinanceError, Result};
pub use extract::{Extraction, Extractor};
pub use metrics::{AgentFocus, DataCategory, MetricField, MetricSpec, MetricTable, ValueFormat};
pub use orchestrator::{AnalyzeRequest, AnalyzeResponse, Orchestrator, ResponseMode};
pub use retriever::{Retrieval, Retriever, STARVATION_WARNING, dedup_by_id};
