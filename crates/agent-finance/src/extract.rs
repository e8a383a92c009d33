//! Ticker and metric extraction from free-text queries
//!
//! Extraction is a candidate generator: shouted words like `WHAT` come back
//! as tickers too, and the live adapter simply finds no data for them.

use crate::error::Result;
use crate::metrics::{MetricSpec, MetricTable};
use regex::Regex;
use std::collections::HashSet;

const TICKER_PATTERN: &str = r"\b[A-Z]{1,5}\b";

/// Tickers and metrics found in one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction<'a> {
    /// Distinct candidate tickers in order of first appearance
    pub tickers: Vec<String>,
    /// Matched metrics in table order
    pub metrics: Vec<&'a MetricSpec>,
}

impl Extraction<'_> {
    /// Whether nothing at all was recognised
    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty() && self.metrics.is_empty()
    }
}

/// Pure extractor over a compiled ticker pattern
#[derive(Debug, Clone)]
pub struct Extractor {
    ticker_re: Regex,
}

impl Extractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            ticker_re: Regex::new(TICKER_PATTERN)?,
        })
    }

    /// Candidate tickers: runs of 1-5 uppercase ASCII letters bounded by word breaks
    pub fn tickers(&self, query: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.ticker_re
            .find_iter(query)
            .map(|m| m.as_str())
            .filter(|symbol| seen.insert(*symbol))
            .map(str::to_string)
            .collect()
    }

    /// Run both extractions
    pub fn extract<'a>(&self, query: &str, table: &'a MetricTable) -> Extraction<'a> {
        Extraction {
            tickers: self.tickers(query),
            metrics: table.match_query(query),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> Extractor {
        Extractor::new().unwrap()
    }

    #[test]
    fn test_tickers_in_order_of_first_appearance() {
        let tickers = extractor().tickers("Compare MSFT and AAPL, then MSFT again vs. GOOGL");
        assert_eq!(tickers, vec!["MSFT", "AAPL", "GOOGL"]);
    }

    #[test]
    fn test_word_boundaries() {
        let ex = extractor();
        assert!(ex.tickers("TOOLONG is six letters plus").is_empty());
        assert!(ex.tickers("Q4 results").is_empty());
        assert_eq!(ex.tickers("(NVDA)"), vec!["NVDA"]);
        assert_eq!(ex.tickers("price of ZZZZZ?"), vec!["ZZZZZ"]);
    }

    #[test]
    fn test_false_positives_are_kept() {
        let tickers = extractor().tickers("WHAT IS THE PRICE OF AAPL");
        assert_eq!(tickers, vec!["WHAT", "IS", "THE", "PRICE", "OF", "AAPL"]);
    }

    #[test]
    fn test_empty_query() {
        let table = MetricTable::default();
        let extraction = extractor().extract("", &table);
        assert!(extraction.is_empty());
    }

    #[test]
    fn test_every_well_formed_ticker_is_found() {
        let ex = extractor();
        for ticker in ["A", "GE", "IBM", "AAPL", "GOOGL"] {
            for template in ["{} stock", "what about {}?", "news on {} today", "{}"] {
                let query = template.replace("{}", ticker);
                assert!(
                    ex.tickers(&query).contains(&ticker.to_string()),
                    "{ticker} missing from {query:?}"
                );
            }
        }
    }

    #[test]
    fn test_extract_metrics() {
        let table = MetricTable::default();
        let extraction = extractor().extract("What is AAPL's P/E ratio and EPS?", &table);
        assert_eq!(extraction.tickers, vec!["AAPL", "P", "E", "EPS"]);
        let names: Vec<_> = extraction.metrics.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["pe_ratio", "eps"]);
    }
}
