//! Evidence aggregation
//!
//! Merges live provider data and corpus matches into one ranked, deduplicated
//! list of [`Source`]s. Candidates are concatenated in priority order:
//!
//! 1. live data per ticker (combined snapshot, per-metric values, history, news)
//! 2. corpus sentence matches
//! 3. the current-price lookup for the first ticker
//! 4. metric values pattern-matched in corpus text
//!
//! then deduplicated by id (first wins) and cut to `top_k`.

use crate::api::{HistoryPeriod, MarketDataProvider, NewsItem};
use crate::config::RetrievalConfig;
use crate::corpus::snippet::{SentencePicker, single_line, truncate};
use crate::corpus::{Document, DocumentCorpus};
use crate::error::{FinanceError, Result};
use crate::extract::{Extraction, Extractor};
use crate::market::{HistoryStats, Lookup, MarketDataAdapter, MarketSnapshot};
use crate::metrics::{DataCategory, MetricField, MetricSpec, format_count};
use agent_core::{Evidence, Source};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Warning attached when retrieval yields no genuine source
pub const STARVATION_WARNING: &str = "No sources retrieved. Output may be incomplete; consider expanding the corpus or increasing Top-K.";

/// Fields quoted in the combined snapshot source
const COMPREHENSIVE_FIELD_LIMIT: usize = 8;

/// Outcome of one retrieval call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieval {
    pub evidence: Evidence,
    pub warnings: Vec<String>,
    /// Tickers sent to the live provider
    pub tickers: Vec<String>,
}

#[derive(Default)]
struct LiveSources {
    primary: Vec<Source>,
    legacy: Option<Source>,
    tickers: Vec<String>,
}

/// Evidence aggregator over a shared corpus and an optional live provider
#[derive(Clone)]
pub struct Retriever {
    corpus: Arc<DocumentCorpus>,
    market: Option<MarketDataAdapter>,
    config: Arc<RetrievalConfig>,
    extractor: Extractor,
    picker: SentencePicker,
    metric_patterns: Arc<HashMap<String, Regex>>,
}

impl Retriever {
    /// Create a retriever without live data
    pub fn new(corpus: DocumentCorpus, config: RetrievalConfig) -> Result<Self> {
        config.validate()?;

        let mut metric_patterns = HashMap::new();
        for metric in config.metrics.iter() {
            metric_patterns.insert(metric.name.clone(), metric_value_pattern(metric)?);
        }

        Ok(Self {
            corpus: Arc::new(corpus),
            market: None,
            config: Arc::new(config),
            extractor: Extractor::new()?,
            picker: SentencePicker::new()?,
            metric_patterns: Arc::new(metric_patterns),
        })
    }

    /// Attach a live market data provider
    pub fn with_market_data(mut self, provider: Arc<dyn MarketDataProvider>) -> Self {
        self.market = Some(MarketDataAdapter::new(provider));
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn corpus(&self) -> &DocumentCorpus {
        &self.corpus
    }

    pub fn has_market_data(&self) -> bool {
        self.market.is_some()
    }

    /// Name of the attached provider
    pub fn market_data_name(&self) -> Option<&'static str> {
        self.market.as_ref().map(MarketDataAdapter::provider_name)
    }

    /// Add a document; visible to every later call on this retriever
    ///
    /// Clones sharing the old corpus keep seeing it unchanged.
    pub fn add_document(&mut self, document: Document) -> Result<()> {
        Arc::make_mut(&mut self.corpus).add_document(document)
    }

    /// Ranked, deduplicated sources, at most `top_k`
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Vec<Source> {
        self.collect(query, None, top_k).await.0
    }

    /// Retrieve and wrap the result, flagging evidence starvation
    ///
    /// `ticker_hint` is tried before any ticker extracted from the query.
    /// A hint that is not a well-formed symbol is dropped with a warning.
    pub async fn gather(&self, query: &str, ticker_hint: Option<&str>, top_k: usize) -> Retrieval {
        let mut warnings = Vec::new();
        let hint = match ticker_hint.map(str::trim).filter(|t| !t.is_empty()) {
            Some(hint) if !is_symbol(hint) => {
                warn!(hint, "Ignoring malformed ticker hint");
                warnings.push(FinanceError::InvalidSymbol(hint.to_string()).to_string());
                None
            },
            other => other,
        };

        let (sources, tickers) = self.collect(query, hint, top_k).await;

        if sources.is_empty() {
            warnings.push(STARVATION_WARNING.to_string());
        }

        Retrieval {
            evidence: Evidence::from_sources(sources),
            warnings,
            tickers,
        }
    }

    async fn collect(
        &self,
        query: &str,
        ticker_hint: Option<&str>,
        top_k: usize,
    ) -> (Vec<Source>, Vec<String>) {
        let extraction = self.extractor.extract(query, &self.config.metrics);
        debug!(
            tickers = ?extraction.tickers,
            metrics = ?extraction.metrics.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
            "Extracted query candidates"
        );

        let live = self.live_sources(query, &extraction, ticker_hint).await;
        let documents = self.document_sources(query, top_k);
        let metric_hits = self.metric_sources(&extraction);

        let counts = (live.primary.len(), documents.len(), metric_hits.len());

        let mut candidates = live.primary;
        candidates.extend(documents);
        candidates.extend(live.legacy);
        candidates.extend(metric_hits);

        let mut sources = dedup_by_id(candidates);
        sources.truncate(top_k);

        info!(
            live = counts.0,
            documents = counts.1,
            metric_hits = counts.2,
            returned = sources.len(),
            top_k,
            "Retrieval finished"
        );

        (sources, live.tickers)
    }

    /// Corpus sentence matches, placeholders excluded
    fn document_sources(&self, query: &str, top_k: usize) -> Vec<Source> {
        self.corpus
            .search(query, top_k, &self.config, &self.picker)
            .iter()
            .map(|m| m.to_source())
            .collect()
    }

    /// Exact metric values quoted from corpus text
    fn metric_sources(&self, extraction: &Extraction<'_>) -> Vec<Source> {
        let mut sources = Vec::new();
        for metric in &extraction.metrics {
            let Some(pattern) = self.metric_patterns.get(&metric.name) else {
                continue;
            };
            for document in self.corpus.genuine() {
                if let Some(hit) = pattern.find(&document.content) {
                    sources.push(
                        Source::document_metric(&document.id, &metric.name, &document.title)
                            .with_snippet(single_line(hit.as_str())),
                    );
                }
            }
        }
        sources
    }

    async fn live_sources(
        &self,
        query: &str,
        extraction: &Extraction<'_>,
        ticker_hint: Option<&str>,
    ) -> LiveSources {
        let Some(market) = &self.market else {
            return LiveSources::default();
        };

        let mut seen = HashSet::new();
        let tickers: Vec<String> = ticker_hint
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .into_iter()
            .chain(extraction.tickers.iter().cloned())
            .filter(|t| seen.insert(t.clone()))
            .take(self.config.max_live_tickers)
            .collect();

        if tickers.is_empty() {
            return LiveSources::default();
        }

        let query_lower = query.to_lowercase();
        let categories: HashSet<DataCategory> =
            if self.config.is_broad_query(&query_lower, extraction.metrics.len()) {
                DataCategory::ALL.into_iter().collect()
            } else {
                extraction.metrics.iter().map(|m| m.category).collect()
            };
        let period = HistoryPeriod::from_query(query);
        let provider = market.provider_name();
        let info_fields = self.config.metrics.info_fields();

        let mut primary = Vec::new();
        let mut first_snapshot = None;

        for (i, ticker) in tickers.iter().enumerate() {
            let url = market.quote_url(ticker);

            let snapshot = if categories.contains(&DataCategory::Info) {
                Some(market.snapshot(ticker).await)
            } else {
                None
            };
            if let Some(snap) = snapshot.as_ref().and_then(Lookup::as_found) {
                primary.extend(comprehensive_source(snap, &info_fields, provider, url.as_deref()));
                primary.extend(
                    extraction
                        .metrics
                        .iter()
                        .filter(|m| m.category == DataCategory::Info)
                        .filter_map(|m| metric_source(snap, m, provider, url.as_deref())),
                );
            }

            if categories.contains(&DataCategory::History) {
                if let Lookup::Found(stats) = market.history(ticker, period).await {
                    primary.push(history_source(ticker, &stats, provider, url.as_deref()));
                }
            }

            if categories.contains(&DataCategory::News) {
                if let Lookup::Found(items) = market.news(ticker, self.config.news_limit).await {
                    primary.extend(news_sources(ticker, &items, self.config.snippet_max_chars));
                }
            }

            if i == 0 {
                first_snapshot = snapshot;
            }
        }

        let first = &tickers[0];
        let snapshot = match first_snapshot {
            Some(lookup) => lookup,
            None => market.snapshot(first).await,
        };
        let legacy = snapshot
            .as_found()
            .and_then(|snap| price_source(snap, market.quote_url(first).as_deref()));

        LiveSources {
            primary,
            legacy,
            tickers,
        }
    }
}

/// Exchange symbol shape: `AAPL`, `BRK.B`, `RDS-A`, `^GSPC`
fn is_symbol(symbol: &str) -> bool {
    let body = symbol.strip_prefix('^').unwrap_or(symbol);
    (1..=10).contains(&body.len())
        && body.starts_with(|c: char| c.is_ascii_alphabetic())
        && body.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

/// Keep the first source of every id, preserving order
pub fn dedup_by_id(sources: Vec<Source>) -> Vec<Source> {
    let mut seen = HashSet::new();
    sources
        .into_iter()
        .filter(|s| seen.insert(s.id.clone()))
        .collect()
}

/// `keyword` then an optional colon or dash and a number with an optional magnitude
fn metric_value_pattern(metric: &MetricSpec) -> Result<Regex> {
    let mut keywords: Vec<&str> = metric
        .keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect();
    // longest first so "operating income" beats a shorter overlapping phrase
    keywords.sort_by_key(|k| std::cmp::Reverse(k.len()));
    let alternation = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");

    Ok(Regex::new(&format!(
        r"(?i)\b(?:{alternation})\b\s*[:\-]?\s*\$?\s*\d[\d,]*(?:\.\d+)?\s*(?:billion|million|%)?"
    ))?)
}

fn render_fields(snapshot: &MarketSnapshot, fields: &[&MetricField]) -> Vec<String> {
    fields
        .iter()
        .filter_map(|f| {
            snapshot
                .get(&f.key)
                .map(|v| format!("{}: {}", f.label, f.format.render(v)))
        })
        .collect()
}

fn with_optional_url(source: Source, url: Option<&str>) -> Source {
    match url {
        Some(url) => source.with_url(url),
        None => source,
    }
}

fn comprehensive_source(
    snapshot: &MarketSnapshot,
    fields: &[&MetricField],
    provider: &str,
    url: Option<&str>,
) -> Option<Source> {
    let mut parts = render_fields(snapshot, fields);
    if parts.is_empty() {
        return None;
    }
    parts.truncate(COMPREHENSIVE_FIELD_LIMIT);

    let ticker = &snapshot.ticker;
    let source = Source::live(ticker, "comprehensive", format!("{ticker} Market Data ({provider})"))
        .with_snippet(parts.join(" | "));
    Some(with_optional_url(source, url))
}

fn metric_source(
    snapshot: &MarketSnapshot,
    metric: &MetricSpec,
    provider: &str,
    url: Option<&str>,
) -> Option<Source> {
    let fields: Vec<&MetricField> = metric.fields.iter().collect();
    let parts = render_fields(snapshot, &fields);
    if parts.is_empty() {
        return None;
    }

    let ticker = &snapshot.ticker;
    let source = Source::live(ticker, &metric.name, format!("{ticker} {} ({provider})", metric.label))
        .with_snippet(parts.join(" | "));
    Some(with_optional_url(source, url))
}

fn price_source(snapshot: &MarketSnapshot, url: Option<&str>) -> Option<Source> {
    let price = snapshot.current_price()?;
    let ticker = &snapshot.ticker;
    let source = Source::live(ticker, "price", format!("{ticker} Current Price"))
        .with_snippet(format!("Current Price: ${price:.2}"));
    Some(with_optional_url(source, url))
}

fn history_source(ticker: &str, stats: &HistoryStats, provider: &str, url: Option<&str>) -> Source {
    let period = stats.period.as_str();
    let mut parts = vec![
        format!("Latest Close: ${:.2} ({})", stats.latest_close, stats.latest_date),
        format!("{period} Return: {:.2}%", stats.period_return),
    ];
    if let Some(vol) = stats.volatility {
        parts.push(format!("Annualized Volatility: {vol:.2}%"));
    }
    parts.push(format!("Avg Volume: {}", format_count(stats.average_volume)));

    let source = Source::live(
        ticker,
        &format!("history:{period}"),
        format!("{ticker} Price History ({period}, {provider})"),
    )
    .with_snippet(parts.join(" | "));
    with_optional_url(source, url)
}

fn news_sources(ticker: &str, items: &[NewsItem], max_chars: usize) -> Vec<Source> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let mut source = Source::live(ticker, &format!("news:{i}"), &item.title);
            if let Some(link) = &item.link {
                source = source.with_url(link);
            }
            let snippet = match (&item.publisher, &item.summary) {
                (Some(publisher), Some(summary)) => Some(format!("{publisher}: {summary}")),
                (None, Some(summary)) => Some(summary.clone()),
                (Some(publisher), None) => Some(publisher.clone()),
                (None, None) => None,
            };
            match snippet {
                Some(text) => source.with_snippet(truncate(&text, max_chars)),
                None => source,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{InMemoryMarketData, MockMarketDataProvider};
    use crate::error::FinanceError;
    use crate::metrics::MetricTable;
    use serde_json::json;

    fn corpus() -> DocumentCorpus {
        DocumentCorpus::from_documents(vec![
            Document::new(
                "aapl-q4",
                "AAPL Q4 2023 Earnings Report",
                "Apple posted record services. Revenue: $89.5 billion. Operating Income: $24.1 billion.",
            )
            .with_ticker("AAPL"),
            Document::new(
                "msft-fy23",
                "MSFT FY2023 Annual Report",
                "Microsoft revenue: $211.9 billion. Cloud grew 22%.",
            )
            .with_ticker("MSFT"),
        ])
        .unwrap()
    }

    fn provider() -> InMemoryMarketData {
        InMemoryMarketData::new()
            .with_info(
                "AAPL",
                json!({"currentPrice": 189.5, "marketCap": 2.95e12, "totalRevenue": 3.83e11}),
            )
            .with_closes("AAPL", &[100.0, 102.0, 101.0, 105.0], 1_000)
            .with_news(
                "AAPL",
                vec![NewsItem::new("Apple ships new chips").with_publisher("Reuters")],
            )
    }

    fn retriever() -> Retriever {
        Retriever::new(corpus(), RetrievalConfig::default())
            .unwrap()
            .with_market_data(Arc::new(provider()))
    }

    fn ids(sources: &[Source]) -> Vec<&str> {
        sources.iter().map(|s| s.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_priority_order() {
        let sources = retriever().retrieve("AAPL revenue", 20).await;
        assert_eq!(
            ids(&sources),
            vec![
                "live:AAPL:comprehensive",
                "live:AAPL:revenue",
                "doc:aapl-q4",
                "doc:msft-fy23",
                "live:AAPL:price",
                "doc:aapl-q4:metric:revenue",
                "doc:msft-fy23:metric:revenue",
            ]
        );
        assert_eq!(sources[1].snippet.as_deref(), Some("Revenue: $383.00B"));
        assert_eq!(sources[4].snippet.as_deref(), Some("Current Price: $189.50"));
        assert_eq!(sources[5].snippet.as_deref(), Some("Revenue: $89.5 billion"));
        assert_eq!(sources[6].snippet.as_deref(), Some("revenue: $211.9 billion"));
    }

    #[tokio::test]
    async fn test_price_metric_shadows_legacy_lookup() {
        let sources = retriever().retrieve("AAPL price", 20).await;
        let price: Vec<_> = sources.iter().filter(|s| s.id == "live:AAPL:price").collect();
        assert_eq!(price.len(), 1);
        assert_eq!(price[0].title, "AAPL Current Price (In-Memory Market Data)");
        assert_eq!(ids(&sources)[..2], ["live:AAPL:comprehensive", "live:AAPL:price"]);
    }

    #[tokio::test]
    async fn test_broad_query_fetches_every_category() {
        let sources = retriever().retrieve("Give me an overview of AAPL", 20).await;
        let ids = ids(&sources);
        assert!(ids.contains(&"live:AAPL:comprehensive"));
        assert!(ids.contains(&"live:AAPL:history:1mo"));
        assert!(ids.contains(&"live:AAPL:news:0"));

        let history = sources.iter().find(|s| s.id == "live:AAPL:history:1mo").unwrap();
        let snippet = history.snippet.as_deref().unwrap();
        assert!(snippet.contains("Latest Close: $105.00 (2024-01-05)"));
        assert!(snippet.contains("1mo Return: 5.00%"));
        assert!(snippet.contains("Annualized Volatility: 39.49%"));

        let news = sources.iter().find(|s| s.id == "live:AAPL:news:0").unwrap();
        assert_eq!(news.title, "Apple ships new chips");
        assert_eq!(news.snippet.as_deref(), Some("Reuters"));
    }

    #[tokio::test]
    async fn test_narrow_query_skips_unrelated_categories() {
        let sources = retriever().retrieve("AAPL news this week", 20).await;
        let ids = ids(&sources);
        assert!(ids.contains(&"live:AAPL:news:0"));
        assert!(!ids.iter().any(|id| id.starts_with("live:AAPL:history")));
        assert!(!ids.contains(&"live:AAPL:comprehensive"));
        // the first ticker's price is still looked up
        assert!(ids.contains(&"live:AAPL:price"));
    }

    #[tokio::test]
    async fn test_history_period_follows_query() {
        let sources = retriever().retrieve("AAPL volatility over the past year", 20).await;
        assert!(ids(&sources).contains(&"live:AAPL:history:1y"));
    }

    #[tokio::test]
    async fn test_only_two_tickers_hit_the_provider() {
        let mut mock = MockMarketDataProvider::new();
        mock.expect_info()
            .times(3)
            .returning(|_| Err(FinanceError::ApiError("down".to_string())));
        mock.expect_name().return_const("mock");
        mock.expect_quote_url().returning(|_| None);

        let retriever = Retriever::new(DocumentCorpus::new(), RetrievalConfig::default())
            .unwrap()
            .with_market_data(Arc::new(mock));

        // AAPL and MSFT only; the price lookup reuses the AAPL result
        let first = retriever.gather("AAPL MSFT GOOG NVDA price", None, 5).await;
        assert_eq!(first.tickers, vec!["AAPL", "MSFT"]);
        assert!(first.evidence.is_empty());
        assert_eq!(first.warnings, vec![STARVATION_WARNING.to_string()]);

        let hinted = retriever.gather("what about the quote?", Some("tsla"), 5).await;
        assert_eq!(hinted.tickers, vec!["TSLA"]);
    }

    #[tokio::test]
    async fn test_malformed_hint_becomes_warning() {
        let retrieval = retriever().gather("AAPL revenue", Some(" not a ticker! "), 20).await;
        assert_eq!(retrieval.tickers, vec!["AAPL"]);
        assert_eq!(retrieval.warnings, vec!["Invalid symbol: not a ticker!".to_string()]);
        assert!(!retrieval.evidence.is_empty());

        let blank = retriever().gather("AAPL revenue", Some("  "), 20).await;
        assert!(blank.warnings.is_empty());
    }

    #[test]
    fn test_symbol_shape() {
        for symbol in ["A", "aapl", "BRK.B", "RDS-A", "^GSPC"] {
            assert!(is_symbol(symbol), "{symbol}");
        }
        for symbol in ["", "^", "AA PL", "$AAPL", "9984", "TOOLONGSYMBOL"] {
            assert!(!is_symbol(symbol), "{symbol}");
        }
    }

    #[tokio::test]
    async fn test_provider_failure_keeps_other_categories() {
        let provider = provider().failing("AAPL", DataCategory::Info);
        let retriever = Retriever::new(corpus(), RetrievalConfig::default())
            .unwrap()
            .with_market_data(Arc::new(provider));

        let sources = retriever.retrieve("Give me an overview of AAPL", 20).await;
        let ids = ids(&sources);
        assert!(!ids.contains(&"live:AAPL:comprehensive"));
        assert!(!ids.contains(&"live:AAPL:price"));
        assert!(ids.contains(&"live:AAPL:history:1mo"));
        assert!(ids.contains(&"live:AAPL:news:0"));
    }

    #[tokio::test]
    async fn test_without_market_data() {
        let retriever = Retriever::new(corpus(), RetrievalConfig::default()).unwrap();
        let sources = retriever.retrieve("AAPL operating income", 5).await;
        assert!(sources.iter().all(|s| s.provenance().is_document()));

        let hit = sources
            .iter()
            .find(|s| s.id == "doc:aapl-q4:metric:operating_income")
            .unwrap();
        assert_eq!(hit.snippet.as_deref(), Some("Operating Income: $24.1 billion"));
        assert_eq!(hit.title, "AAPL Q4 2023 Earnings Report");
    }

    #[tokio::test]
    async fn test_add_document_is_visible_to_later_calls() {
        let mut retriever = Retriever::new(corpus(), RetrievalConfig::default()).unwrap();
        let before = retriever.clone();
        retriever
            .add_document(
                Document::new("nvda-q3", "NVDA Q3 Datacenter Update", "Data center revenue: $14.5 billion.")
                    .with_ticker("NVDA"),
            )
            .unwrap();

        let sources = retriever.retrieve("NVDA datacenter", 5).await;
        assert_eq!(sources[0].id, "doc:nvda-q3");
        assert!(before.corpus().get("nvda-q3").is_none());
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let sources = vec![
            Source::live("AAPL", "price", "a").with_snippet("first"),
            Source::document("d", "b"),
            Source::live("AAPL", "price", "a").with_snippet("second"),
        ];
        let once = dedup_by_id(sources);
        assert_eq!(once.len(), 2);
        assert_eq!(once[0].snippet.as_deref(), Some("first"));
        assert_eq!(dedup_by_id(once.clone()), once);
    }

    #[test]
    fn test_metric_pattern() {
        let table = MetricTable::default();
        let pattern = metric_value_pattern(table.get("operating_income").unwrap()).unwrap();
        let text = "Total operating income - $1,234.5 million for the year.";
        assert_eq!(pattern.find(text).unwrap().as_str().trim(), "operating income - $1,234.5 million");
        assert!(pattern.find("operating income grew strongly").is_none());

        let margins = metric_value_pattern(table.get("margins").unwrap()).unwrap();
        assert_eq!(margins.find("Gross margin: 45.2%.").unwrap().as_str(), "margin: 45.2%");
    }

    #[test]
    fn test_comprehensive_source_requires_data() {
        let table = MetricTable::default();
        let fields = table.info_fields();
        let empty = MarketSnapshot::from_info("AAPL", &serde_json::Map::new());
        assert!(comprehensive_source(&empty, &fields, "p", None).is_none());

        let bag = json!({"currentPrice": 189.5, "marketCap": 2.95e12});
        let snapshot = MarketSnapshot::from_info("AAPL", bag.as_object().unwrap());
        let source = comprehensive_source(&snapshot, &fields, "Yahoo Finance", Some("https://q/AAPL")).unwrap();
        assert_eq!(source.title, "AAPL Market Data (Yahoo Finance)");
        assert_eq!(source.snippet.as_deref(), Some("Current Price: $189.50 | Market Cap: $2.95T"));
        assert_eq!(source.url.as_deref(), Some("https://q/AAPL"));
    }
}
