//! Live market data adapter
//!
//! Wraps a [`MarketDataProvider`] so that every category lookup is guarded
//! on its own: a failure becomes [`Lookup::Failed`], is logged, and never
//! stops the other categories.

use crate::api::{HistoryPeriod, InfoBag, MarketDataProvider, NewsItem, PriceBar, number};
use crate::metrics::DataCategory;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Trading days per year used to annualize volatility
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Outcome of one guarded category lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// The provider returned usable data
    Found(T),
    /// The provider answered but had nothing usable
    Absent,
    /// The provider call failed
    Failed(String),
}

impl<T> Lookup<T> {
    /// The found value, if any
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Absent | Self::Failed(_) => None,
        }
    }

    pub fn as_found(&self) -> Option<&T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Absent | Self::Failed(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Self::Found(value) => Lookup::Found(f(value)),
            Self::Absent => Lookup::Absent,
            Self::Failed(reason) => Lookup::Failed(reason),
        }
    }
}

/// Numeric fields of one ticker's info bag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSnapshot {
    pub ticker: String,
    values: BTreeMap<String, f64>,
}

/// Field aliases: when the first key is missing the second is used
const FIELD_FALLBACKS: &[(&str, &str)] = &[("currentPrice", "regularMarketPrice")];

impl MarketSnapshot {
    /// Keep every numeric field of `bag`; anything else is dropped
    pub fn from_info(ticker: &str, bag: &InfoBag) -> Self {
        let mut values: BTreeMap<String, f64> = bag
            .keys()
            .filter_map(|key| number(bag, key).map(|v| (key.clone(), v)))
            .collect();

        for (primary, fallback) in FIELD_FALLBACKS {
            if !values.contains_key(*primary) {
                if let Some(v) = values.get(*fallback).copied() {
                    values.insert((*primary).to_string(), v);
                }
            }
        }

        Self {
            ticker: ticker.to_string(),
            values,
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn current_price(&self) -> Option<f64> {
        self.get("currentPrice")
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Statistics derived from a daily price series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryStats {
    pub period: HistoryPeriod,
    pub latest_close: f64,
    /// `YYYY-MM-DD` of the latest bar
    pub latest_date: String,
    /// (latest - first) / first * 100
    pub period_return: f64,
    /// Sample stdev of daily returns * sqrt(252) * 100; needs two returns
    pub volatility: Option<f64>,
    pub average_volume: f64,
    pub observations: usize,
}

impl HistoryStats {
    /// Derive statistics; bars with a non-positive or non-finite close are skipped
    pub fn from_bars(period: HistoryPeriod, bars: &[PriceBar]) -> Option<Self> {
        let valid: Vec<&PriceBar> = bars
            .iter()
            .filter(|b| b.close.is_finite() && b.close > 0.0)
            .collect();
        let first = valid.first()?;
        let last = valid.last()?;

        let closes: Vec<f64> = valid.iter().map(|b| b.close).collect();
        let returns = daily_returns(&closes);

        Some(Self {
            period,
            latest_close: last.close,
            latest_date: last.timestamp.format("%Y-%m-%d").to_string(),
            period_return: (last.close - first.close) / first.close * 100.0,
            volatility: annualized_volatility(&returns),
            average_volume: valid.iter().map(|b| b.volume as f64).sum::<f64>() / valid.len() as f64,
            observations: valid.len(),
        })
    }
}

/// Fractional day-over-day changes
pub fn daily_returns(closes: &[f64]) -> Vec<f64> {
    closes.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect()
}

/// Sample standard deviation (n - 1 denominator)
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// Annualized volatility in percent
pub fn annualized_volatility(returns: &[f64]) -> Option<f64> {
    sample_std_dev(returns).map(|sd| sd * TRADING_DAYS_PER_YEAR.sqrt() * 100.0)
}

/// Guarded access to a market data provider
#[derive(Clone)]
pub struct MarketDataAdapter {
    provider: Arc<dyn MarketDataProvider>,
}

impl MarketDataAdapter {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn quote_url(&self, ticker: &str) -> Option<String> {
        self.provider.quote_url(ticker)
    }

    fn failed<T>(ticker: &str, category: DataCategory, err: &dyn std::fmt::Display) -> Lookup<T> {
        warn!(
            ticker,
            category = category.as_str(),
            error = %err,
            "Market data lookup failed"
        );
        Lookup::Failed(err.to_string())
    }

    /// Quote and fundamentals
    pub async fn snapshot(&self, ticker: &str) -> Lookup<MarketSnapshot> {
        match self.provider.info(ticker).await {
            Ok(bag) => {
                let snapshot = MarketSnapshot::from_info(ticker, &bag);
                if snapshot.is_empty() {
                    debug!(ticker, "Info bag carried no numeric fields");
                    Lookup::Absent
                } else {
                    Lookup::Found(snapshot)
                }
            },
            Err(e) => Self::failed(ticker, DataCategory::Info, &e),
        }
    }

    /// Price series statistics
    pub async fn history(&self, ticker: &str, period: HistoryPeriod) -> Lookup<HistoryStats> {
        match self.provider.history(ticker, period).await {
            Ok(bars) => HistoryStats::from_bars(period, &bars).map_or(Lookup::Absent, Lookup::Found),
            Err(e) => Self::failed(ticker, DataCategory::History, &e),
        }
    }

    /// Recent headlines
    pub async fn news(&self, ticker: &str, limit: usize) -> Lookup<Vec<NewsItem>> {
        match self.provider.news(ticker, limit).await {
            Ok(items) if items.is_empty() => Lookup::Absent,
            Ok(items) => Lookup::Found(items),
            Err(e) => Self::failed(ticker, DataCategory::News, &e),
        }
    }
}
