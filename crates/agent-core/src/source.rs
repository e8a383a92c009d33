//! Evidence items and retrieval outcomes
//!
//! A [`Source`] is the unit of evidence handed to every agent. Its `id` is
//! namespaced so provenance stays inspectable:
//!
//! - `live:<TICKER>:<slice>` for values read from the market-data provider
//! - `doc:<document id>` for sentences quoted from a corpus document
//! - `doc:<document id>:metric:<metric>` for pattern-matched metric values
//!
//! The serialized shape `{id, title, url, snippet}` (with `null` for absent
//! optionals) is consumed by downstream agents and UIs and must not change.

use serde::{Deserialize, Serialize};

/// Phrase every consumer must emit when a requested value has no source.
pub const UNCERTAINTY_PHRASE: &str = "no verified source found";

const LIVE_PREFIX: &str = "live:";
const DOC_PREFIX: &str = "doc:";
const METRIC_INFIX: &str = ":metric:";

/// A single evidence item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Stable identifier, unique within one retrieval call
    pub id: String,
    /// Short human-readable label
    pub title: String,
    /// Optional external link
    pub url: Option<String>,
    /// Optional quoted text, ideally containing the literal value
    pub snippet: Option<String>,
}

impl Source {
    /// Create a source with no url or snippet
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: None,
            snippet: None,
        }
    }

    /// Source for a live provider lookup of `ticker`
    pub fn live(ticker: &str, slice: &str, title: impl Into<String>) -> Self {
        Self::new(format!("{LIVE_PREFIX}{ticker}:{slice}"), title)
    }

    /// Source quoting a corpus document
    pub fn document(document_id: &str, title: impl Into<String>) -> Self {
        Self::new(format!("{DOC_PREFIX}{document_id}"), title)
    }

    /// Source for a metric value pattern-matched inside a corpus document
    pub fn document_metric(document_id: &str, metric: &str, title: impl Into<String>) -> Self {
        Self::new(format!("{DOC_PREFIX}{document_id}{METRIC_INFIX}{metric}"), title)
    }

    /// Attach an external link
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Attach a quoted snippet
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    /// Where this source came from, derived from the id namespace
    pub fn provenance(&self) -> Provenance {
        Provenance::from_id(&self.id)
    }

    /// Citation marker consumers place next to a quoted value
    pub fn citation(&self) -> String {
        format!("[{}]", self.id)
    }

    /// Whether the snippet carries at least one digit
    pub fn has_numeric_snippet(&self) -> bool {
        self.snippet
            .as_deref()
            .is_some_and(|s| s.chars().any(|c| c.is_ascii_digit()))
    }
}

/// Origin of a [`Source`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// A live provider lookup for one ticker
    Live { ticker: String },
    /// A corpus document
    Document { document_id: String },
    /// An id outside the known namespaces
    Unknown,
}

impl Provenance {
    /// Parse the provenance encoded in a source id
    pub fn from_id(id: &str) -> Self {
        if let Some(rest) = id.strip_prefix(LIVE_PREFIX) {
            return match rest.split_once(':') {
                Some((ticker, _)) if !ticker.is_empty() => Self::Live {
                    ticker: ticker.to_string(),
                },
                _ => Self::Unknown,
            };
        }

        if let Some(rest) = id.strip_prefix(DOC_PREFIX) {
            let document_id = rest.split_once(METRIC_INFIX).map_or(rest, |(doc, _)| doc);
            if document_id.is_empty() {
                return Self::Unknown;
            }
            return Self::Document {
                document_id: document_id.to_string(),
            };
        }

        Self::Unknown
    }

    /// True for live provider lookups
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live { .. })
    }

    /// True for corpus documents
    pub fn is_document(&self) -> bool {
        matches!(self, Self::Document { .. })
    }
}

/// Outcome of a retrieval call
///
/// `NoEvidence` replaces the old "example source" sentinel: consumers match on
/// it instead of inspecting ids or titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Evidence {
    /// At least one genuine source was retrieved
    Found { sources: Vec<Source> },
    /// Nothing genuine was retrieved
    NoEvidence { reason: String },
}

impl Evidence {
    /// Wrap a source list, collapsing an empty list into `NoEvidence`
    pub fn from_sources(sources: Vec<Source>) -> Self {
        if sources.is_empty() {
            Self::none("no sources retrieved")
        } else {
            Self::Found { sources }
        }
    }

    /// Build a `NoEvidence` outcome
    pub fn none(reason: impl Into<String>) -> Self {
        Self::NoEvidence {
            reason: reason.into(),
        }
    }

    /// Retrieved sources, empty for `NoEvidence`
    pub fn sources(&self) -> &[Source] {
        match self {
            Self::Found { sources } => sources,
            Self::NoEvidence { .. } => &[],
        }
    }

    /// True when no genuine source exists
    pub fn is_empty(&self) -> bool {
        self.sources().is_empty()
    }

    /// Look up a source by id
    pub fn get(&self, id: &str) -> Option<&Source> {
        self.sources().iter().find(|s| s.id == id)
    }
}

impl Default for Evidence {
    fn default() -> Self {
        Self::none("retrieval not run")
    }
}
