//! Citation audit for generated text
//!
//! Every numeric claim (currency amounts, percentages, magnitudes, decimals)
//! must sit on a line that carries a `[source-id]` marker naming one of the
//! sources handed to the writer. Text without claims passes; text that
//! declares [`UNCERTAINTY_PHRASE`] is recognised as an explicit refusal.

use crate::error::Result;
use agent_core::{Source, UNCERTAINTY_PHRASE};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

const CLAIM_PATTERN: &str = r"(?i)\$\s?\d[\d,]*(?:\.\d+)?(?:\s?(?:trillion|billion|million|[TBMK]\b))?|\d[\d,]*(?:\.\d+)?\s?(?:%|(?:trillion|billion|million)\b)|\b\d+\.\d+\b";
const CITATION_PATTERN: &str = r"\[([^\[\]]+)\]";

/// One numeric value found in the text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumericClaim {
    /// 1-based line number
    pub line: usize,
    pub text: String,
    /// The line cites at least one known source
    pub cited: bool,
}

/// Result of auditing one text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttributionReport {
    pub claims: Vec<NumericClaim>,
    /// Known source ids cited anywhere, in first-citation order
    pub citations: Vec<String>,
    /// Namespaced ids cited but not among the sources
    pub unknown_citations: Vec<String>,
    /// The text declares the uncertainty phrase
    pub has_uncertainty: bool,
}

impl AttributionReport {
    /// Every numeric claim is cited
    pub fn is_compliant(&self) -> bool {
        self.claims.iter().all(|c| c.cited)
    }

    pub fn uncited(&self) -> impl Iterator<Item = &NumericClaim> {
        self.claims.iter().filter(|c| !c.cited)
    }

    /// Human-readable problems, empty for a clean text
    pub fn violations(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .uncited()
            .map(|c| format!("uncited value {:?} on line {}", c.text, c.line))
            .collect();
        out.extend(
            self.unknown_citations
                .iter()
                .map(|id| format!("citation of unknown source [{id}]")),
        );
        out
    }
}

/// Compiled claim and citation patterns
#[derive(Debug, Clone)]
pub struct AttributionChecker {
    claim_re: Regex,
    citation_re: Regex,
}

impl AttributionChecker {
    pub fn new() -> Result<Self> {
        Ok(Self {
            claim_re: Regex::new(CLAIM_PATTERN)?,
            citation_re: Regex::new(CITATION_PATTERN)?,
        })
    }

    /// Audit `text` against the sources its writer was given
    pub fn check(&self, text: &str, sources: &[Source]) -> AttributionReport {
        let known: HashSet<&str> = sources.iter().map(|s| s.id.as_str()).collect();
        let mut report = AttributionReport {
            has_uncertainty: text.to_lowercase().contains(UNCERTAINTY_PHRASE),
            ..AttributionReport::default()
        };

        for (index, line) in text.lines().enumerate() {
            let mut line_cited = false;
            for group in self.citation_re.captures_iter(line) {
                let Some(inner) = group.get(1) else {
                    continue;
                };
                for id in inner.as_str().split([',', ';']).map(str::trim) {
                    if known.contains(id) {
                        line_cited = true;
                        if !report.citations.iter().any(|c| c == id) {
                            report.citations.push(id.to_string());
                        }
                    } else if id.contains(':') && !report.unknown_citations.iter().any(|c| c == id) {
                        report.unknown_citations.push(id.to_string());
                    }
                }
            }

            // digits inside markers are ids, not claims
            let bare = self.citation_re.replace_all(line, "");
            report.claims.extend(self.claim_re.find_iter(&bare).map(|m| NumericClaim {
                line: index + 1,
                text: m.as_str().trim().to_string(),
                cited: line_cited,
            }));
        }

        report
    }
}
