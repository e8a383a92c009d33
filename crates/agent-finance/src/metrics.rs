//! Metric keyword table
//!
//! Maps a canonical metric name to the surface forms used to spot it in a
//! query and in document text, the provider call that can supply it, and the
//! provider fields that carry its value. The aggregator only ever iterates
//! this table, so adding a metric is a data change:
//!
//! ```
//! use agent_finance::metrics::MetricTable;
//!
//! let table = MetricTable::from_json(r#"[
//!     {"name": "ebitda", "label": "EBITDA", "keywords": ["ebitda"], "category": "info",
//!      "fields": [{"key": "ebitda", "label": "EBITDA", "format": "large_currency"}]}
//! ]"#).unwrap();
//!
//! assert_eq!(table.match_query("What is MSFT EBITDA?")[0].name, "ebitda");
//! ```

use crate::error::{FinanceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which provider call can supply a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataCategory {
    /// Quote and fundamentals bag
    Info,
    /// Historical price series
    History,
    /// Recent headlines
    News,
}

impl DataCategory {
    /// All categories, in fetch order
    pub const ALL: [DataCategory; 3] = [Self::Info, Self::History, Self::News];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::History => "history",
            Self::News => "news",
        }
    }

    /// Agents reading a metric of this category when its spec names none
    pub fn default_focus(self) -> &'static [AgentFocus] {
        match self {
            Self::Info | Self::News => &[AgentFocus::Fundamental],
            Self::History => &[AgentFocus::Market, AgentFocus::Risk],
        }
    }
}

/// Analysis agent that reads a metric's live sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentFocus {
    /// Quotes, trading activity, price history
    Market,
    /// Reported financials, filings, headlines
    Fundamental,
    /// Volatility, leverage, liquidity
    Risk,
}

/// How a provider value is rendered into a snippet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueFormat {
    /// `$189.25`
    Currency,
    /// `$2.95T`, `$89.50B`
    LargeCurrency,
    /// Provider fraction rendered as percent: `0.452` becomes `45.20%`
    Percent,
    /// Plain two-decimal number
    Ratio,
    /// Integer with thousands separators
    Count,
}

impl ValueFormat {
    /// Render `value` in this format
    pub fn render(self, value: f64) -> String {
        match self {
            Self::Currency => format!("${value:.2}"),
            Self::LargeCurrency => format_large_currency(value),
            Self::Percent => format!("{:.2}%", value * 100.0),
            Self::Ratio => format!("{value:.2}"),
            Self::Count => format_count(value),
        }
    }
}

fn format_large_currency(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();
    if abs >= 1_000_000_000_000.0 {
        format!("{sign}${:.2}T", abs / 1_000_000_000_000.0)
    } else if abs >= 1_000_000_000.0 {
        format!("{sign}${:.2}B", abs / 1_000_000_000.0)
    } else if abs >= 1_000_000.0 {
        format!("{sign}${:.2}M", abs / 1_000_000.0)
    } else {
        format!("{sign}${abs:.2}")
    }
}

pub(crate) fn format_count(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// One provider field backing a metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricField {
    /// Key in the provider's info bag
    pub key: String,
    /// Label used in snippets
    pub label: String,
    /// Rendering
    pub format: ValueFormat,
}

/// A canonical metric and its surface forms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSpec {
    /// Canonical name, also used in source ids (`live:AAPL:<name>`)
    pub name: String,
    /// Human-readable label
    pub label: String,
    /// Lowercase phrases matched against queries and documents
    pub keywords: Vec<String>,
    /// Provider call that supplies the metric
    pub category: DataCategory,
    /// Agents that read this metric's live sources; empty means the
    /// category default
    #[serde(default)]
    pub focus: Vec<AgentFocus>,
    /// Provider fields, empty for history and news metrics
    #[serde(default)]
    pub fields: Vec<MetricField>,
}

impl MetricSpec {
    /// Whether any keyword occurs in `text_lower`
    pub fn matches(&self, text_lower: &str) -> bool {
        self.keywords.iter().any(|kw| text_lower.contains(kw.as_str()))
    }

    /// Agents this metric is routed to
    pub fn agents(&self) -> &[AgentFocus] {
        if self.focus.is_empty() {
            self.category.default_focus()
        } else {
            &self.focus
        }
    }
}

/// Ordered, data-driven metric table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricTable {
    metrics: Vec<MetricSpec>,
}

impl MetricTable {
    /// Build a table from specs, validating it
    pub fn new(metrics: Vec<MetricSpec>) -> Result<Self> {
        let table = Self {
            metrics: metrics
                .into_iter()
                .map(|mut spec| {
                    spec.keywords = spec.keywords.iter().map(|k| k.to_lowercase()).collect();
                    spec
                })
                .collect(),
        };
        table.validate()?;
        Ok(table)
    }

    /// Load a table from a JSON array of specs
    pub fn from_json(json: &str) -> Result<Self> {
        let metrics: Vec<MetricSpec> = serde_json::from_str(json)?;
        Self::new(metrics)
    }

    /// Check names are unique and every metric has a keyword
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for spec in &self.metrics {
            if spec.name.is_empty() {
                return Err(FinanceError::ConfigError("metric name must not be empty".to_string()));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(FinanceError::ConfigError(format!(
                    "duplicate metric name: {}",
                    spec.name
                )));
            }
            if spec.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(FinanceError::ConfigError(format!(
                    "metric {} has no keywords",
                    spec.name
                )));
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricSpec> {
        self.metrics.iter()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Look up a metric by canonical name
    pub fn get(&self, name: &str) -> Option<&MetricSpec> {
        self.metrics.iter().find(|m| m.name == name)
    }

    /// Metrics whose keywords appear in `query`, case-insensitively, in table order
    pub fn match_query(&self, query: &str) -> Vec<&MetricSpec> {
        let lower = query.to_lowercase();
        self.metrics.iter().filter(|m| m.matches(&lower)).collect()
    }

    /// Distinct info fields across the table, in table order
    pub fn info_fields(&self) -> Vec<&MetricField> {
        let mut seen = HashSet::new();
        self.metrics
            .iter()
            .filter(|m| m.category == DataCategory::Info)
            .flat_map(|m| m.fields.iter())
            .filter(|f| seen.insert(f.key.as_str()))
            .collect()
    }
}

fn field(key: &str, label: &str, format: ValueFormat) -> MetricField {
    MetricField {
        key: key.to_string(),
        label: label.to_string(),
        format,
    }
}

fn spec(
    name: &str,
    label: &str,
    keywords: &[&str],
    category: DataCategory,
    focus: &[AgentFocus],
    fields: Vec<MetricField>,
) -> MetricSpec {
    MetricSpec {
        name: name.to_string(),
        label: label.to_string(),
        keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
        category,
        focus: focus.to_vec(),
        fields,
    }
}

impl Default for MetricTable {
    fn default() -> Self {
        use AgentFocus::{Fundamental, Market, Risk};
        use DataCategory::{History, Info, News};
        use ValueFormat::{Count, Currency, LargeCurrency, Percent, Ratio};

        Self {
            metrics: vec![
                spec(
                    "price",
                    "Current Price",
                    &["price", "quote", "trading at", "share price"],
                    Info,
                    &[Market],
                    vec![field("currentPrice", "Current Price", Currency)],
                ),
                spec(
                    "market_cap",
                    "Market Cap",
                    &["market cap", "market capitalization", "market value"],
                    Info,
                    &[Market],
                    vec![field("marketCap", "Market Cap", LargeCurrency)],
                ),
                spec(
                    "volume",
                    "Volume",
                    &["volume", "shares traded"],
                    Info,
                    &[Market],
                    vec![
                        field("volume", "Volume", Count),
                        field("averageVolume", "Average Volume", Count),
                    ],
                ),
                spec(
                    "pe_ratio",
                    "P/E Ratio",
                    &["p/e", "pe ratio", "price to earnings", "price-to-earnings"],
                    Info,
                    &[Fundamental],
                    vec![field("trailingPE", "P/E Ratio", Ratio)],
                ),
                spec(
                    "eps",
                    "EPS",
                    &["eps", "earnings per share"],
                    Info,
                    &[Fundamental],
                    vec![field("trailingEps", "EPS", Currency)],
                ),
                spec(
                    "revenue",
                    "Revenue",
                    &["revenue", "sales"],
                    Info,
                    &[Fundamental],
                    vec![field("totalRevenue", "Revenue", LargeCurrency)],
                ),
                spec(
                    "operating_income",
                    "Operating Income",
                    &["operating income", "operating profit"],
                    Info,
                    &[Fundamental],
                    vec![
                        field("operatingIncome", "Operating Income", LargeCurrency),
                        field("operatingCashflow", "Operating Cash Flow", LargeCurrency),
                    ],
                ),
                spec(
                    "net_income",
                    "Net Income",
                    &["net income", "net profit"],
                    Info,
                    &[Fundamental],
                    vec![field("netIncomeToCommon", "Net Income", LargeCurrency)],
                ),
                spec(
                    "margins",
                    "Margins",
                    &["margin", "profitability"],
                    Info,
                    &[Fundamental],
                    vec![
                        field("grossMargins", "Gross Margin", Percent),
                        field("operatingMargins", "Operating Margin", Percent),
                        field("profitMargins", "Profit Margin", Percent),
                    ],
                ),
                spec(
                    "dividend_yield",
                    "Dividend Yield",
                    &["dividend"],
                    Info,
                    &[Fundamental],
                    vec![field("dividendYield", "Dividend Yield", Percent)],
                ),
                spec(
                    "week_52_range",
                    "52-Week Range",
                    &["52-week", "52 week", "year high", "year low"],
                    Info,
                    &[Market, Risk],
                    vec![
                        field("fiftyTwoWeekHigh", "52-Week High", Currency),
                        field("fiftyTwoWeekLow", "52-Week Low", Currency),
                    ],
                ),
                spec(
                    "beta",
                    "Beta",
                    &["beta"],
                    Info,
                    &[Risk],
                    vec![field("beta", "Beta", Ratio)],
                ),
                spec(
                    "book_value",
                    "Book Value",
                    &["book value", "price to book", "price-to-book", "p/b"],
                    Info,
                    &[Fundamental],
                    vec![
                        field("bookValue", "Book Value", Currency),
                        field("priceToBook", "Price-to-Book", Ratio),
                    ],
                ),
                spec(
                    "debt_to_equity",
                    "Debt-to-Equity",
                    &["debt", "leverage"],
                    Info,
                    &[Risk],
                    vec![field("debtToEquity", "Debt-to-Equity", Ratio)],
                ),
                spec(
                    "liquidity",
                    "Liquidity Ratios",
                    &["current ratio", "quick ratio", "liquidity"],
                    Info,
                    &[Risk],
                    vec![
                        field("currentRatio", "Current Ratio", Ratio),
                        field("quickRatio", "Quick Ratio", Ratio),
                    ],
                ),
                spec(
                    "cash_flow",
                    "Cash Flow",
                    &["cash flow", "fcf"],
                    Info,
                    &[Fundamental],
                    vec![
                        field("freeCashflow", "Free Cash Flow", LargeCurrency),
                        field("operatingCashflow", "Operating Cash Flow", LargeCurrency),
                    ],
                ),
                spec(
                    "performance",
                    "Price Performance",
                    &[
                        "return",
                        "performance",
                        "volatility",
                        "volatile",
                        "historical",
                        "history",
                        "trend",
                        "risk",
                    ],
                    History,
                    &[Market, Risk],
                    Vec::new(),
                ),
                spec(
                    "news",
                    "News",
                    &["news", "headline", "sentiment", "announcement"],
                    News,
                    &[Fundamental],
                    Vec::new(),
                ),
            ],
        }
    }
}
