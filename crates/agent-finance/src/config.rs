//! Configuration for retrieval and market data access

use crate::error::{FinanceError, Result};
use crate::metrics::MetricTable;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Named weights of the document scoring function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Document ticker appears in the query
    pub ticker: u32,
    /// Per query term found in the document title
    pub title_term: u32,
    /// Per query term found in the document body
    pub body_term: u32,
    /// Per generic financial term present in both query and body
    pub generic_term: u32,
    /// Sentence contains a number with a magnitude or percent suffix
    pub numeric_sentence_bonus: u32,
    /// Query terms must be longer than this to count toward sentence scores
    pub sentence_term_min_len: usize,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            ticker: 10,
            title_term: 5,
            body_term: 2,
            generic_term: 3,
            numeric_sentence_bonus: 5,
            sentence_term_min_len: 3,
        }
    }
}

/// Configuration for evidence retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Document scoring weights
    pub weights: ScoringWeights,

    /// Maximum snippet length in characters before the ellipsis
    pub snippet_max_chars: usize,

    /// Tickers queried against the live provider per request
    pub max_live_tickers: usize,

    /// Result bound used when the caller does not give one
    pub default_top_k: usize,

    /// Headlines fetched per ticker
    pub news_limit: usize,

    /// Generic financial terms scored in both query and body
    pub generic_terms: Vec<String>,

    /// Phrases that make a query broad: every live category is fetched
    pub broad_query_keywords: Vec<String>,

    /// Metric keyword table
    pub metrics: MetricTable,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            snippet_max_chars: 200,
            max_live_tickers: 2,
            default_top_k: 5,
            news_limit: 5,
            generic_terms: [
                "revenue",
                "income",
                "earnings",
                "eps",
                "margin",
                "report",
                "filing",
                "quarterly",
                "annual",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
            broad_query_keywords: [
                "analyze",
                "analysis",
                "overview",
                "outlook",
                "comprehensive",
                "summary",
                "should i",
                "invest",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
            metrics: MetricTable::default(),
        }
    }
}

impl RetrievalConfig {
    /// Create a new configuration builder
    pub fn builder() -> RetrievalConfigBuilder {
        RetrievalConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.snippet_max_chars == 0 {
            return Err(FinanceError::ConfigError(
                "snippet_max_chars must be greater than 0".to_string(),
            ));
        }

        if self.default_top_k == 0 {
            return Err(FinanceError::ConfigError(
                "default_top_k must be greater than 0".to_string(),
            ));
        }

        self.metrics.validate()
    }

    /// Whether a query asks for everything rather than named metrics
    pub fn is_broad_query(&self, query_lower: &str, matched_metrics: usize) -> bool {
        matched_metrics == 0
            || self
                .broad_query_keywords
                .iter()
                .any(|kw| query_lower.contains(kw.as_str()))
    }
}

/// Builder for RetrievalConfig
#[derive(Debug, Default)]
pub struct RetrievalConfigBuilder {
    weights: Option<ScoringWeights>,
    snippet_max_chars: Option<usize>,
    max_live_tickers: Option<usize>,
    default_top_k: Option<usize>,
    news_limit: Option<usize>,
    generic_terms: Option<Vec<String>>,
    broad_query_keywords: Option<Vec<String>>,
    metrics: Option<MetricTable>,
}

impl RetrievalConfigBuilder {
    /// Set the scoring weights
    pub fn weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Set the snippet length bound
    pub fn snippet_max_chars(mut self, chars: usize) -> Self {
        self.snippet_max_chars = Some(chars);
        self
    }

    /// Set how many tickers hit the live provider
    pub fn max_live_tickers(mut self, tickers: usize) -> Self {
        self.max_live_tickers = Some(tickers);
        self
    }

    /// Set the default result bound
    pub fn default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = Some(top_k);
        self
    }

    /// Set headlines per ticker
    pub fn news_limit(mut self, limit: usize) -> Self {
        self.news_limit = Some(limit);
        self
    }

    /// Replace the generic term list
    pub fn generic_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.generic_terms = Some(terms.into_iter().map(|t| t.into().to_lowercase()).collect());
        self
    }

    /// Replace the broad-query phrase list
    pub fn broad_query_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.broad_query_keywords =
            Some(keywords.into_iter().map(|k| k.into().to_lowercase()).collect());
        self
    }

    /// Replace the metric table
    pub fn metrics(mut self, metrics: MetricTable) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<RetrievalConfig> {
        let defaults = RetrievalConfig::default();

        let config = RetrievalConfig {
            weights: self.weights.unwrap_or(defaults.weights),
            snippet_max_chars: self.snippet_max_chars.unwrap_or(defaults.snippet_max_chars),
            max_live_tickers: self.max_live_tickers.unwrap_or(defaults.max_live_tickers),
            default_top_k: self.default_top_k.unwrap_or(defaults.default_top_k),
            news_limit: self.news_limit.unwrap_or(defaults.news_limit),
            generic_terms: self.generic_terms.unwrap_or(defaults.generic_terms),
            broad_query_keywords: self
                .broad_query_keywords
                .unwrap_or(defaults.broad_query_keywords),
            metrics: self.metrics.unwrap_or(defaults.metrics),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Configuration for the Yahoo Finance provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketDataConfig {
    /// quoteSummary endpoint; `{symbol}` is replaced with the ticker
    pub quote_summary_url: String,

    /// Search endpoint used for headlines
    pub search_url: String,

    /// Public quote page; `{symbol}` is replaced with the ticker
    pub quote_page_url: String,

    /// Request timeout duration
    pub request_timeout: Duration,

    /// Requests per second allowed against Yahoo
    pub requests_per_second: u32,

    /// User-Agent header sent with raw HTTP requests
    pub user_agent: String,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            quote_summary_url: "https://query2.finance.yahoo.com/v10/finance/quoteSummary/{symbol}"
                .to_string(),
            search_url: "https://query2.finance.yahoo.com/v1/finance/search".to_string(),
            quote_page_url: "https://finance.yahoo.com/quote/{symbol}".to_string(),
            request_timeout: Duration::from_secs(10),
            requests_per_second: 5,
            user_agent: "Mozilla/5.0 (compatible; agent-finance)".to_string(),
        }
    }
}

impl MarketDataConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.requests_per_second == 0 {
            return Err(FinanceError::ConfigError(
                "requests_per_second must be greater than 0".to_string(),
            ));
        }

        for (name, value) in [
            ("quote_summary_url", &self.quote_summary_url),
            ("quote_page_url", &self.quote_page_url),
        ] {
            if !value.contains("{symbol}") {
                return Err(FinanceError::ConfigError(format!(
                    "{name} must contain a {{symbol}} placeholder"
                )));
            }
        }

        url::Url::parse(&self.search_url)
            .map_err(|e| FinanceError::ConfigError(format!("invalid search_url: {e}")))?;

        Ok(())
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the request quota
    pub fn with_requests_per_second(mut self, rps: u32) -> Self {
        self.requests_per_second = rps;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RetrievalConfig::default();
        assert_eq!(config.weights.ticker, 10);
        assert_eq!(config.weights.title_term, 5);
        assert_eq!(config.weights.body_term, 2);
        assert_eq!(config.weights.generic_term, 3);
        assert_eq!(config.snippet_max_chars, 200);
        assert_eq!(config.max_live_tickers, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = RetrievalConfig::builder()
            .snippet_max_chars(80)
            .max_live_tickers(3)
            .generic_terms(["Revenue", "EBITDA"])
            .build()
            .unwrap();

        assert_eq!(config.snippet_max_chars, 80);
        assert_eq!(config.max_live_tickers, 3);
        assert_eq!(config.generic_terms, vec!["revenue", "ebitda"]);
        assert_eq!(config.default_top_k, 5);
    }

    #[test]
    fn test_config_validation() {
        let result = RetrievalConfig::builder().default_top_k(0).build();
        assert!(matches!(result, Err(FinanceError::ConfigError(_))));

        let result = RetrievalConfig::builder().snippet_max_chars(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_broad_query() {
        let config = RetrievalConfig::default();
        assert!(config.is_broad_query("tell me about aapl", 0));
        assert!(config.is_broad_query("analyze aapl revenue", 1));
        assert!(!config.is_broad_query("aapl revenue", 1));
    }

    #[test]
    fn test_market_data_config_validation() {
        assert!(MarketDataConfig::default().validate().is_ok());

        let config = MarketDataConfig::default().with_requests_per_second(0);
        assert!(config.validate().is_err());

        let config = MarketDataConfig {
            quote_page_url: "https://example.com".to_string(),
            ..MarketDataConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
