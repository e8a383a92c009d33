//! Market data providers
//!
//! A provider answers three independent calls per ticker: a loosely typed
//! info bag, a daily price series and recent headlines. Nothing about the
//! bag's schema is guaranteed, so readers go through [`number`].

pub mod memory;
pub mod yahoo;

pub use memory::InMemoryMarketData;
pub use yahoo::YahooProvider;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Loosely typed quote/fundamentals bag keyed by provider field name
pub type InfoBag = serde_json::Map<String, Value>;

/// One daily OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// A recent headline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl NewsItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            publisher: None,
            link: None,
            summary: None,
        }
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// Window of the historical series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryPeriod {
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
}

impl HistoryPeriod {
    /// Provider range code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FiveDays => "5d",
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
        }
    }

    /// Pick the window from temporal hints in the query; one month by default
    pub fn from_query(query: &str) -> Self {
        let lower = query.to_lowercase();
        if lower.contains("year") || lower.contains("12 months") {
            Self::OneYear
        } else if lower.contains("6 months") {
            Self::SixMonths
        } else if lower.contains("3 months") || lower.contains("quarter") {
            Self::ThreeMonths
        } else if lower.contains("week") {
            Self::FiveDays
        } else {
            Self::OneMonth
        }
    }
}

impl std::fmt::Display for HistoryPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External market data source
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Quote and fundamentals for one ticker
    async fn info(&self, ticker: &str) -> Result<InfoBag>;

    /// Daily bars over `period`, oldest first
    async fn history(&self, ticker: &str, period: HistoryPeriod) -> Result<Vec<PriceBar>>;

    /// Up to `limit` recent headlines
    async fn news(&self, ticker: &str, limit: usize) -> Result<Vec<NewsItem>>;

    /// Display name used in source titles
    fn name(&self) -> &'static str;

    /// Public page for a ticker, if the provider has one
    fn quote_url(&self, ticker: &str) -> Option<String>;
}

/// Read a numeric field from a loosely-typed bag
///
/// Accepts plain numbers, `{"raw": n}` wrappers and numeric strings
/// (thousands separators allowed). Anything else, including non-finite
/// values, is absent.
pub fn number(bag: &InfoBag, key: &str) -> Option<f64> {
    bag.get(key).and_then(value_as_f64)
}

pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        Value::Object(map) => map.get("raw").and_then(value_as_f64),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_history_period_from_query() {
        assert_eq!(HistoryPeriod::from_query("AAPL over the past year"), HistoryPeriod::OneYear);
        assert_eq!(HistoryPeriod::from_query("last 12 months"), HistoryPeriod::OneYear);
        assert_eq!(HistoryPeriod::from_query("last 6 months"), HistoryPeriod::SixMonths);
        assert_eq!(HistoryPeriod::from_query("last 3 months"), HistoryPeriod::ThreeMonths);
        assert_eq!(HistoryPeriod::from_query("this QUARTER"), HistoryPeriod::ThreeMonths);
        assert_eq!(HistoryPeriod::from_query("this week"), HistoryPeriod::FiveDays);
        assert_eq!(HistoryPeriod::from_query("volatility of MSFT"), HistoryPeriod::OneMonth);
        assert_eq!(HistoryPeriod::OneMonth.to_string(), "1mo");
    }

    #[test]
    fn test_number_accepts_loose_shapes() {
        let bag = json!({
            "plain": 189.5,
            "wrapped": {"raw": 2.5, "fmt": "2.50"},
            "text": "1,234.5",
            "junk": "n/a",
            "null": null,
            "list": [1, 2]
        });
        let bag = bag.as_object().unwrap();

        assert_eq!(number(bag, "plain"), Some(189.5));
        assert_eq!(number(bag, "wrapped"), Some(2.5));
        assert_eq!(number(bag, "text"), Some(1234.5));
        assert_eq!(number(bag, "junk"), None);
        assert_eq!(number(bag, "null"), None);
        assert_eq!(number(bag, "list"), None);
        assert_eq!(number(bag, "missing"), None);
    }

    #[test]
    fn test_number_rejects_non_finite() {
        let mut bag = InfoBag::new();
        bag.insert("inf".to_string(), json!("inf"));
        bag.insert("nan".to_string(), json!("NaN"));
        assert_eq!(number(&bag, "inf"), None);
        assert_eq!(number(&bag, "nan"), None);
    }
}
