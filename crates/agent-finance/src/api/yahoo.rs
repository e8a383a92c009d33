//! Yahoo Finance provider
//!
//! Price history goes through `yahoo_finance_api`; the quoteSummary and
//! search endpoints have no binding there and are read with raw HTTP.
//! All three calls share one rate limiter.

use super::{HistoryPeriod, InfoBag, MarketDataProvider, NewsItem, PriceBar, value_as_f64};
use crate::config::MarketDataConfig;
use crate::error::{FinanceError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;
use yahoo_finance_api as yahoo;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// quoteSummary modules, highest priority first when keys collide
const SUMMARY_MODULES: &[&str] = &[
    "financialData",
    "price",
    "summaryDetail",
    "defaultKeyStatistics",
    "incomeStatementHistory",
];

/// Yahoo Finance market data provider
pub struct YahooProvider {
    client: Client,
    connector: yahoo::YahooConnector,
    config: MarketDataConfig,
    rate_limiter: SharedRateLimiter,
}

impl YahooProvider {
    /// Create a provider with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(MarketDataConfig::default())
    }

    /// Create a provider with custom configuration
    pub fn with_config(config: MarketDataConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        let connector = yahoo::YahooConnector::new()
            .map_err(|e| FinanceError::YahooFinanceError(e.to_string()))?;

        let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(rps)));

        Ok(Self {
            client,
            connector,
            config,
            rate_limiter,
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> &MarketDataConfig {
        &self.config
    }

    async fn get_json(&self, url: Url, symbol: &str) -> Result<Value> {
        self.rate_limiter.until_ready().await;
        debug!(%url, "Requesting Yahoo Finance");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FinanceError::ApiError(format!(
                "Yahoo Finance returned HTTP {status} for {symbol}"
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    #[instrument(skip(self), fields(provider = "yahoo"))]
    async fn info(&self, ticker: &str) -> Result<InfoBag> {
        let base = self.config.quote_summary_url.replace("{symbol}", ticker);
        let url = Url::parse_with_params(&base, &[("modules", SUMMARY_MODULES.join(","))])
            .map_err(|e| FinanceError::ConfigError(format!("invalid quote summary url: {e}")))?;

        let body = self.get_json(url, ticker).await?;
        flatten_quote_summary(ticker, &body)
    }

    #[instrument(skip(self), fields(provider = "yahoo"))]
    async fn history(&self, ticker: &str, period: HistoryPeriod) -> Result<Vec<PriceBar>> {
        self.rate_limiter.until_ready().await;

        let response = self
            .connector
            .get_quote_range(ticker, "1d", period.as_str())
            .await
            .map_err(|e| FinanceError::YahooFinanceError(e.to_string()))?;

        let quotes = response
            .quotes()
            .map_err(|e| FinanceError::YahooFinanceError(e.to_string()))?;

        Ok(quotes
            .iter()
            .filter_map(|q| {
                Some(PriceBar {
                    timestamp: DateTime::<Utc>::from_timestamp(q.timestamp as i64, 0)?,
                    open: q.open,
                    high: q.high,
                    low: q.low,
                    close: q.close,
                    volume: q.volume,
                })
            })
            .collect())
    }

    #[instrument(skip(self), fields(provider = "yahoo"))]
    async fn news(&self, ticker: &str, limit: usize) -> Result<Vec<NewsItem>> {
        let url = Url::parse_with_params(
            &self.config.search_url,
            &[
                ("q", ticker.to_string()),
                ("newsCount", limit.to_string()),
                ("quotesCount", "0".to_string()),
            ],
        )
        .map_err(|e| FinanceError::ConfigError(format!("invalid search url: {e}")))?;

        let body = self.get_json(url, ticker).await?;
        Ok(parse_news(&body, limit))
    }

    fn name(&self) -> &'static str {
        "Yahoo Finance"
    }

    fn quote_url(&self, ticker: &str) -> Option<String> {
        Some(self.config.quote_page_url.replace("{symbol}", ticker))
    }
}

/// Flatten a quoteSummary payload into one bag of numeric fields
///
/// `{"raw": n, "fmt": ".."}` wrappers are unwrapped. Statement histories
/// contribute their most recent statement.
fn flatten_quote_summary(symbol: &str, body: &Value) -> Result<InfoBag> {
    let summary = &body["quoteSummary"];
    let Some(result) = summary["result"].get(0).and_then(Value::as_object) else {
        let reason = summary["error"]["description"]
            .as_str()
            .unwrap_or("empty quoteSummary result")
            .to_string();
        return Err(FinanceError::DataUnavailable {
            symbol: symbol.to_string(),
            reason,
        });
    };

    let mut bag = InfoBag::new();
    for module in SUMMARY_MODULES {
        let Some(fields) = result.get(*module).and_then(Value::as_object) else {
            continue;
        };
        for (key, value) in fields {
            if let Some(statements) = value.as_array() {
                if let Some(latest) = statements.first().and_then(Value::as_object) {
                    insert_numbers(&mut bag, latest);
                }
            } else if let Some(n) = value_as_f64(value) {
                bag.entry(key.clone()).or_insert_with(|| Value::from(n));
            }
        }
    }

    Ok(bag)
}

fn insert_numbers(bag: &mut InfoBag, fields: &serde_json::Map<String, Value>) {
    for (key, value) in fields {
        if let Some(n) = value_as_f64(value) {
            bag.entry(key.clone()).or_insert_with(|| Value::from(n));
        }
    }
}

fn parse_news(body: &Value, limit: usize) -> Vec<NewsItem> {
    let text = |item: &Value, key: &str| {
        item[key]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    body["news"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(NewsItem {
                        title: text(item, "title")?,
                        publisher: text(item, "publisher"),
                        link: text(item, "link"),
                        summary: text(item, "summary"),
                    })
                })
                .take(limit)
                .collect()
        })
        .unwrap_or_default()
}
