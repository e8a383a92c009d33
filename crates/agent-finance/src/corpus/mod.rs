//! In-memory document corpus with keyword-scored lookup
//!
//! Documents are immutable once added and never removed. The corpus is
//! cheap to clone and is shared read-only between requests; adding a
//! document needs `&mut self`, so concurrent writers are the embedding
//! application's problem.

pub mod scoring;
pub mod snippet;

use crate::config::RetrievalConfig;
use crate::error::{FinanceError, Result};
use agent_core::Source;
use scoring::{QueryTerms, score_document};
use serde::{Deserialize, Serialize};
use snippet::SentencePicker;
use tracing::debug;

const SEED_CORPUS: &str = include_str!("../../data/seed_corpus.json");

/// Kind of corpus entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    EarningsReport,
    AnnualFiling,
    QuarterlyFiling,
    Generic,
    /// Ships with the corpus by construction; never evidence
    Placeholder,
}

/// A corpus entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    #[serde(default)]
    pub ticker: Option<String>,
    pub content: String,
    #[serde(default)]
    pub date: Option<String>,
}

impl Document {
    /// Create a generic document
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind: DocumentKind::Generic,
            ticker: None,
            content: content.into(),
            date: None,
        }
    }

    pub fn with_kind(mut self, kind: DocumentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Placeholder entries are never matched or cited
    pub fn is_placeholder(&self) -> bool {
        self.kind == DocumentKind::Placeholder
    }
}

/// One scored document with its best sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMatch<'a> {
    pub document: &'a Document,
    pub score: u32,
    pub snippet: String,
}

impl DocumentMatch<'_> {
    /// Evidence item quoting the best sentence
    pub fn to_source(&self) -> Source {
        Source::document(&self.document.id, &self.document.title).with_snippet(&self.snippet)
    }
}

/// Ordered collection of documents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentCorpus {
    documents: Vec<Document>,
}

impl DocumentCorpus {
    /// Create an empty corpus
    pub fn new() -> Self {
        Self::default()
    }

    /// The bundled corpus of filing excerpts
    pub fn seeded() -> Result<Self> {
        Self::from_json(SEED_CORPUS)
    }

    /// Load a corpus from a JSON array of documents
    pub fn from_json(json: &str) -> Result<Self> {
        let documents: Vec<Document> = serde_json::from_str(json)?;
        Self::from_documents(documents)
    }

    /// Build a corpus, rejecting duplicate ids
    pub fn from_documents(documents: Vec<Document>) -> Result<Self> {
        let mut corpus = Self::new();
        for document in documents {
            corpus.add_document(document)?;
        }
        Ok(corpus)
    }

    /// Append a document; ids are unique and documents immutable
    pub fn add_document(&mut self, document: Document) -> Result<()> {
        if self.get(&document.id).is_some() {
            return Err(FinanceError::DuplicateDocument(document.id));
        }
        debug!(id = %document.id, kind = ?document.kind, "Adding document to corpus");
        self.documents.push(document);
        Ok(())
    }

    /// Add every document of `other`, stopping at the first duplicate
    pub fn extend(&mut self, other: DocumentCorpus) -> Result<()> {
        for document in other.documents {
            self.add_document(document)?;
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Documents that may serve as evidence
    pub fn genuine(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter().filter(|d| !d.is_placeholder())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Keyword-scored lookup
    ///
    /// Placeholders and zero scores are dropped; ties keep corpus order.
    pub fn search<'a>(
        &'a self,
        query: &str,
        top_k: usize,
        config: &RetrievalConfig,
        picker: &SentencePicker,
    ) -> Vec<DocumentMatch<'a>> {
        let terms = QueryTerms::new(query);

        let mut scored: Vec<(&Document, u32)> = self
            .genuine()
            .map(|doc| (doc, score_document(&terms, doc, config)))
            .filter(|(_, score)| *score > 0)
            .collect();
        // stable: equal scores keep corpus order
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.truncate(top_k);

        debug!(matches = scored.len(), "Corpus lookup finished");

        scored
            .into_iter()
            .map(|(document, score)| DocumentMatch {
                document,
                score,
                snippet: picker.best_sentence(&document.content, &terms, config),
            })
            .collect()
    }
}
