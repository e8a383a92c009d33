//! Deterministic in-memory provider
//!
//! Backs offline runs and tests. Tickers without data fail the way a real
//! provider does for unknown symbols, and any category can be made to fail
//! on purpose.

use super::{HistoryPeriod, InfoBag, MarketDataProvider, NewsItem, PriceBar};
use crate::error::{FinanceError, Result};
use crate::metrics::DataCategory;
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::collections::{HashMap, HashSet};

/// Provider serving fixed data per ticker
#[derive(Debug, Clone, Default)]
pub struct InMemoryMarketData {
    info: HashMap<String, InfoBag>,
    history: HashMap<String, Vec<PriceBar>>,
    news: HashMap<String, Vec<NewsItem>>,
    failing: HashSet<(String, DataCategory)>,
}

impl InMemoryMarketData {
    /// Provider with no data at all
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the info bag for `ticker`; non-object values are ignored
    pub fn with_info(mut self, ticker: &str, info: serde_json::Value) -> Self {
        if let serde_json::Value::Object(map) = info {
            self.info.insert(ticker.to_string(), map);
        }
        self
    }

    /// Set the daily bars for `ticker`
    pub fn with_history(mut self, ticker: &str, bars: Vec<PriceBar>) -> Self {
        self.history.insert(ticker.to_string(), bars);
        self
    }

    /// Daily bars from closes, one day apart starting 2024-01-02
    pub fn with_closes(self, ticker: &str, closes: &[f64], volume: u64) -> Self {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).single();
        let bars = closes
            .iter()
            .enumerate()
            .filter_map(|(i, &close)| {
                let timestamp = start? + Duration::days(i as i64);
                Some(PriceBar {
                    timestamp,
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume,
                })
            })
            .collect();
        self.with_history(ticker, bars)
    }

    /// Set the headlines for `ticker`
    pub fn with_news(mut self, ticker: &str, items: Vec<NewsItem>) -> Self {
        self.news.insert(ticker.to_string(), items);
        self
    }

    /// Make one category fail for `ticker`
    pub fn failing(mut self, ticker: &str, category: DataCategory) -> Self {
        self.failing.insert((ticker.to_string(), category));
        self
    }

    fn check(&self, ticker: &str, category: DataCategory) -> Result<()> {
        if self.failing.contains(&(ticker.to_string(), category)) {
            return Err(FinanceError::ApiError(format!(
                "simulated {} failure for {ticker}",
                category.as_str()
            )));
        }
        Ok(())
    }

    fn unavailable(ticker: &str, what: &str) -> FinanceError {
        FinanceError::DataUnavailable {
            symbol: ticker.to_string(),
            reason: format!("no {what}"),
        }
    }
}

#[async_trait]
impl MarketDataProvider for InMemoryMarketData {
    async fn info(&self, ticker: &str) -> Result<InfoBag> {
        self.check(ticker, DataCategory::Info)?;
        self.info
            .get(ticker)
            .cloned()
            .ok_or_else(|| Self::unavailable(ticker, "quote data"))
    }

    async fn history(&self, ticker: &str, _period: HistoryPeriod) -> Result<Vec<PriceBar>> {
        self.check(ticker, DataCategory::History)?;
        self.history
            .get(ticker)
            .cloned()
            .ok_or_else(|| Self::unavailable(ticker, "price history"))
    }

    async fn news(&self, ticker: &str, limit: usize) -> Result<Vec<NewsItem>> {
        self.check(ticker, DataCategory::News)?;
        self.news
            .get(ticker)
            .map(|items| items.iter().take(limit).cloned().collect())
            .ok_or_else(|| Self::unavailable(ticker, "news"))
    }

    fn name(&self) -> &'static str {
        "In-Memory Market Data"
    }

    fn quote_url(&self, _ticker: &str) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_serves_fixture_data() {
        let provider = InMemoryMarketData::new()
            .with_info("AAPL", json!({"currentPrice": 189.5}))
            .with_closes("AAPL", &[100.0, 102.0], 1_000)
            .with_news("AAPL", vec![NewsItem::new("a"), NewsItem::new("b")]);

        assert!(provider.info("AAPL").await.unwrap().contains_key("currentPrice"));
        let bars = provider.history("AAPL", HistoryPeriod::OneMonth).await.unwrap();
        assert_eq!(bars.len(), 2);
        assert!(bars[0].timestamp < bars[1].timestamp);
        assert_eq!(provider.news("AAPL", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_ticker_fails() {
        let provider = InMemoryMarketData::new();
        assert!(matches!(
            provider.info("ZZZZZ").await,
            Err(FinanceError::DataUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_simulated_failure_is_per_category() {
        let provider = InMemoryMarketData::new()
            .with_info("MSFT", json!({"currentPrice": 400.0}))
            .with_news("MSFT", vec![NewsItem::new("headline")])
            .failing("MSFT", DataCategory::Info);

        assert!(matches!(provider.info("MSFT").await, Err(FinanceError::ApiError(_))));
        assert!(provider.news("MSFT", 5).await.is_ok());
    }
}
