//! End-to-end retrieval scenarios through the public API

use agent_core::{Evidence, Provenance};
use agent_finance::{
    DataCategory, Document, DocumentCorpus, DocumentKind, Extractor, InMemoryMarketData,
    MetricTable, RetrievalConfig, Retriever, STARVATION_WARNING, dedup_by_id,
};
use serde_json::json;
use std::sync::Arc;

fn apple_corpus() -> DocumentCorpus {
    DocumentCorpus::from_documents(vec![
        Document::new(
            "aapl-q4-2023",
            "AAPL Q4 2023 Earnings Report",
            "Apple reported results for its fiscal fourth quarter. Revenue: $89.5 billion, down 1% year over year. Operating Income: $24.1 billion. Services reached an all-time high.",
        )
        .with_kind(DocumentKind::EarningsReport)
        .with_ticker("AAPL")
        .with_date("2023-11-02"),
        Document::new(
            "msft-fy2023",
            "MSFT FY2023 Annual Report",
            "Microsoft revenue: $211.9 billion. Operating income: $88.5 billion.",
        )
        .with_kind(DocumentKind::AnnualFiling)
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
        .with_closes("AAPL", &[100.0, 102.0, 101.0, 105.0], 50_000_000)
}

fn retriever() -> Retriever {
    Retriever::new(apple_corpus(), RetrievalConfig::default())
        .unwrap()
        .with_market_data(Arc::new(provider()))
}

#[test]
fn test_well_formed_tickers_are_always_candidates() {
    let extractor = Extractor::new().unwrap();
    for (query, ticker) in [
        ("Buy NVDA now?", "NVDA"),
        ("What about T?", "T"),
        ("msft vs GOOGL.", "GOOGL"),
        ("(BRK) holdings", "BRK"),
        ("AAPL's margins", "AAPL"),
    ] {
        assert!(
            extractor.tickers(query).iter().any(|t| t == ticker),
            "{ticker} missing from {query:?}"
        );
    }
}

#[tokio::test]
async fn test_metric_table_drives_extraction() {
    let table = MetricTable::from_json(
        r#"[{"name": "backlog", "label": "Backlog", "keywords": ["backlog"], "category": "info"}]"#,
    )
    .unwrap();
    let config = RetrievalConfig::builder().metrics(table).build().unwrap();
    let corpus = DocumentCorpus::from_documents(vec![Document::new(
        "boeing",
        "BA Annual Report",
        "Total backlog: $520 billion at year end.",
    )])
    .unwrap();

    let retriever = Retriever::new(corpus, config).unwrap();
    let sources = retriever.retrieve("BA backlog", 5).await;
    let hit = sources
        .iter()
        .find(|s| s.id == "doc:boeing:metric:backlog")
        .unwrap();
    assert_eq!(hit.snippet.as_deref(), Some("backlog: $520 billion"));
}

#[tokio::test]
async fn test_operating_income_needle() {
    let retriever = Retriever::new(apple_corpus(), RetrievalConfig::default()).unwrap();
    let sources = retriever
        .retrieve("What was Apple's operating income in Q4 2023?", 5)
        .await;

    let needle = sources
        .iter()
        .find(|s| {
            s.snippet
                .as_deref()
                .is_some_and(|snippet| snippet.contains("Operating Income") && snippet.contains("24.1"))
        })
        .expect("a source quoting the operating income");
    assert_eq!(
        needle.provenance(),
        Provenance::Document {
            document_id: "aapl-q4-2023".to_string()
        }
    );
}

#[tokio::test]
async fn test_unknown_ticker_yields_no_live_sources() {
    let sources = retriever().retrieve("Get current price for ZZZZZ", 5).await;
    assert!(!sources.iter().any(|s| {
        matches!(s.provenance(), Provenance::Live { ticker } if ticker == "ZZZZZ")
    }));
}

#[tokio::test]
async fn test_provider_outage_degrades_to_documents() {
    let provider = provider()
        .failing("AAPL", DataCategory::Info)
        .failing("AAPL", DataCategory::History)
        .failing("AAPL", DataCategory::News);
    let retriever = Retriever::new(apple_corpus(), RetrievalConfig::default())
        .unwrap()
        .with_market_data(Arc::new(provider));

    let sources = retriever.retrieve("Analyze AAPL revenue", 5).await;
    assert!(!sources.is_empty());
    assert!(sources.iter().all(|s| s.provenance().is_document()));
}

#[tokio::test]
async fn test_top_k_keeps_priority_order() {
    let retriever = retriever();
    let all = retriever.retrieve("AAPL revenue", 50).await;
    assert!(all.len() >= 5, "{all:?}");

    let top = retriever.retrieve("AAPL revenue", 2).await;
    assert_eq!(top.len(), 2);
    assert_eq!(top, all[..2].to_vec());
    assert_eq!(top[0].id, "live:AAPL:comprehensive");
    assert_eq!(top[1].id, "live:AAPL:revenue");

    // documents precede the price lookup, which precedes metric hits
    let position = |id: &str| all.iter().position(|s| s.id == id).unwrap();
    assert!(position("doc:aapl-q4-2023") < position("live:AAPL:price"));
    assert!(position("live:AAPL:price") < position("doc:aapl-q4-2023:metric:revenue"));
}

#[tokio::test]
async fn test_dedup_is_idempotent_on_retrieval_output() {
    let sources = retriever().retrieve("Give me an overview of AAPL revenue", 50).await;
    let once = dedup_by_id(sources.clone());
    assert_eq!(once, sources);
    assert_eq!(dedup_by_id(once.clone()), once);
}

#[tokio::test]
async fn test_zero_score_documents_are_excluded() {
    let retriever = Retriever::new(apple_corpus(), RetrievalConfig::default()).unwrap();
    assert!(retriever.retrieve("zzz qqq", 5).await.is_empty());
}

#[tokio::test]
async fn test_placeholder_only_corpus_is_no_evidence() {
    let corpus = DocumentCorpus::from_documents(vec![
        Document::new(
            "example",
            "Example Document",
            "Example snippet relevant to the query. Revenue: $1.0 billion.",
        )
        .with_kind(DocumentKind::Placeholder),
    ])
    .unwrap();
    let retriever = Retriever::new(corpus, RetrievalConfig::default()).unwrap();

    let retrieval = retriever
        .gather("Example snippet revenue relevant query", None, 5)
        .await;
    assert!(matches!(retrieval.evidence, Evidence::NoEvidence { .. }));
    assert_eq!(retrieval.warnings, vec![STARVATION_WARNING.to_string()]);
}

#[tokio::test]
async fn test_added_document_surfaces_on_next_call() {
    let mut retriever = retriever();
    retriever
        .add_document(
            Document::new(
                "nvda-q3-fy2024",
                "NVDA Q3 FY2024 Datacenter Results",
                "Data Center revenue: $14.51 billion, up 279% from a year ago.",
            )
            .with_ticker("NVDA"),
        )
        .unwrap();

    let sources = retriever.retrieve("NVDA datacenter", 5).await;
    assert_eq!(sources[0].id, "doc:nvda-q3-fy2024");
}

#[tokio::test]
async fn test_seeded_corpus_end_to_end() {
    let retriever = Retriever::new(DocumentCorpus::seeded().unwrap(), RetrievalConfig::default()).unwrap();
    let sources = retriever.retrieve("MSFT operating income", 5).await;

    assert_eq!(sources[0].id, "doc:msft-fy2023-10k");
    assert!(sources.iter().all(|s| !s.id.starts_with("doc:example")));
    assert!(sources.len() <= 5);
}
