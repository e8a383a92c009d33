//! Most-relevant-sentence extraction

use super::scoring::QueryTerms;
use crate::config::RetrievalConfig;
use crate::error::Result;
use regex::Regex;

const NUMERIC_VALUE_PATTERN: &str = r"(?i)\d[\d,]*(?:\.\d+)?\s*(?:billion|million|%|per share)";
const ELLIPSIS: &str = "...";

/// Split on `.`, `!` or `?` followed by whitespace; the terminator stays
/// with its sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        if let Some(&(next, next_c)) = chars.peek() {
            if next_c.is_whitespace() {
                sentences.push(&text[start..i + c.len_utf8()]);
                start = next;
            }
        }
    }
    sentences.push(&text[start..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Collapse every whitespace run, line breaks included, to one space
pub fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Flatten `text` to one line and cut it to `max_chars` characters,
/// marking the cut with `...`
pub fn truncate(text: &str, max_chars: usize) -> String {
    let text = single_line(text);
    if text.chars().count() <= max_chars {
        return text;
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{}{ELLIPSIS}", head.trim_end())
}

/// Picks the sentence of a document that best answers a query
#[derive(Debug, Clone)]
pub struct SentencePicker {
    numeric_re: Regex,
}

impl SentencePicker {
    pub fn new() -> Result<Self> {
        Ok(Self {
            numeric_re: Regex::new(NUMERIC_VALUE_PATTERN)?,
        })
    }

    /// Whether `sentence` quotes a number with a magnitude, percent or per-share suffix
    pub fn has_numeric_value(&self, sentence: &str) -> bool {
        self.numeric_re.is_match(sentence)
    }

    /// Score of one sentence: long query terms it contains, plus the numeric bonus
    pub fn score_sentence(&self, sentence: &str, query: &QueryTerms, config: &RetrievalConfig) -> u32 {
        let lower = sentence.to_lowercase();
        let min_len = config.weights.sentence_term_min_len;
        let mut score = query
            .terms()
            .filter(|t| t.chars().count() > min_len && lower.contains(t))
            .count() as u32;
        if self.has_numeric_value(sentence) {
            score += config.weights.numeric_sentence_bonus;
        }
        score
    }

    /// Highest-scoring sentence (first wins ties), or the leading text when
    /// nothing scores; always truncated to `snippet_max_chars`
    pub fn best_sentence(&self, content: &str, query: &QueryTerms, config: &RetrievalConfig) -> String {
        let mut best: Option<(&str, u32)> = None;
        for sentence in split_sentences(content) {
            let score = self.score_sentence(sentence, query, config);
            if score > best.map_or(0, |(_, s)| s) {
                best = Some((sentence, score));
            }
        }

        let chosen = best.map_or_else(|| content.trim(), |(sentence, _)| sentence);
        truncate(chosen, config.snippet_max_chars)
    }
}
