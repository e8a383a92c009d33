//! Keyword scoring of documents against a query

use super::Document;
use crate::config::RetrievalConfig;

/// Lowercased query plus its whitespace-split terms
#[derive(Debug, Clone)]
pub struct QueryTerms {
    lower: String,
}

impl QueryTerms {
    pub fn new(query: &str) -> Self {
        Self {
            lower: query.to_lowercase(),
        }
    }

    /// The lowercased query
    pub fn lower(&self) -> &str {
        &self.lower
    }

    /// Whitespace-split terms of the lowercased query
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.lower.split_whitespace()
    }
}

/// Score one document; zero means "not a match"
///
/// Every query term counts once per occurrence in the query, so a repeated
/// term weighs more.
pub fn score_document(query: &QueryTerms, document: &Document, config: &RetrievalConfig) -> u32 {
    let weights = &config.weights;
    let title = document.title.to_lowercase();
    let body = document.content.to_lowercase();
    let mut score = 0;

    let ticker_hit = document
        .ticker
        .as_deref()
        .is_some_and(|t| !t.is_empty() && query.lower().contains(&t.to_lowercase()));
    if ticker_hit {
        score += weights.ticker;
    }

    for term in query.terms() {
        if title.contains(term) {
            score += weights.title_term;
        }
        if body.contains(term) {
            score += weights.body_term;
        }
    }

    for generic in &config.generic_terms {
        if query.lower().contains(generic.as_str()) && body.contains(generic.as_str()) {
            score += weights.generic_term;
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::DocumentKind;

    fn doc(ticker: Option<&str>, title: &str, content: &str) -> Document {
        Document {
            id: "d".to_string(),
            title: title.to_string(),
            kind: DocumentKind::EarningsReport,
            ticker: ticker.map(str::to_string),
            content: content.to_string(),
            date: None,
        }
    }

    #[test]
    fn test_each_weight() {
        let config = RetrievalConfig::default();

        // ticker only: "xyz" is in neither title nor body
        let d = doc(Some("XYZ"), "alpha", "beta");
        assert_eq!(score_document(&QueryTerms::new("XYZ"), &d, &config), 10);

        // one title term
        let d = doc(None, "Quarterly Update", "nothing");
        assert_eq!(score_document(&QueryTerms::new("update"), &d, &config), 5);

        // one body term
        let d = doc(None, "Title", "cash position improved");
        assert_eq!(score_document(&QueryTerms::new("position"), &d, &config), 2);

        // "revenue" is a body term (+2) and a generic term in both (+3)
        let d = doc(None, "Title", "revenue grew");
        assert_eq!(score_document(&QueryTerms::new("revenue"), &d, &config), 5);
    }

    #[test]
    fn test_combined_score() {
        let config = RetrievalConfig::default();
        let d = doc(
            Some("AAPL"),
            "AAPL Q4 2023 Earnings Report",
            "Apple reported revenue of $89.5 billion.",
        );
        let query = QueryTerms::new("AAPL revenue");
        // ticker 10, "aapl" in title 5 + body 0, "revenue" body 2, generic revenue 3
        assert_eq!(score_document(&query, &d, &config), 20);
    }

    #[test]
    fn test_unrelated_scores_zero() {
        let config = RetrievalConfig::default();
        let d = doc(Some("MSFT"), "Microsoft FY2023", "Cloud grew.");
        assert_eq!(
            score_document(&QueryTerms::new("tesla deliveries"), &d, &config),
            0
        );
    }
}
