//! Prompt templates for the analysis agents

use crate::error::{FinanceError, Result};
use agent_core::{AgentOutput, Source};
use minijinja::Environment;
use serde_json::json;

/// Rules shared by every system prompt
const CITATION_RULES: &str = r#"Rules:
- Use only the evidence provided. Do not rely on prior knowledge for figures.
- Every line that states a number (price, amount, percentage, ratio) must end with the [id] marker of the evidence it comes from, for example [live:AAPL:price].
- Quote values exactly as they appear in the evidence.
- If a requested value is not in the evidence, write "no verified source found" for it instead of estimating."#;

pub const MARKET_DATA_SYSTEM: &str = "You are a market data analyst. Describe current pricing, trading activity, valuation snapshots and recent price performance.";

pub const FUNDAMENTAL_NEWS_SYSTEM: &str = "You are a fundamental and news analyst. Describe reported financials, profitability, filings and recent headlines.";

pub const PORTFOLIO_RISK_SYSTEM: &str = "You are a portfolio risk analyst. Describe volatility, drawdown, leverage, liquidity and market sensitivity.";

pub const SUMMARIZER_SYSTEM: &str = "You are an investment research editor. Combine the analyst notes into one structured answer with the sections Investment Thesis, Key Risks, Evidence & Sources and Recommendation, each as a markdown heading followed by bullet points.";

const AGENT_TEMPLATE: &str = "agent";
const SUMMARY_TEMPLATE: &str = "summary";

const AGENT_SOURCE: &str = r"Question: {{ query }}

Evidence:
{% for s in sources -%}
[{{ s.id }}] {{ s.title }}{% if s.snippet %}: {{ s.snippet }}{% endif %}
{% endfor %}
Write a short analysis for your focus area.";

const SUMMARY_SOURCE: &str = r"Question: {{ query }}

Analyst notes:
{% for o in outputs -%}
### {{ o.agent }}
{{ o.content }}

{% endfor -%}
Evidence:
{% for s in sources -%}
[{{ s.id }}] {{ s.title }}{% if s.snippet %}: {{ s.snippet }}{% endif %}
{% endfor %}
Write the final answer.";

/// System prompt with the citation rules appended
pub fn system_prompt(role: &str) -> String {
    format!("{role}\n\n{CITATION_RULES}")
}

/// Compiled user prompt templates
#[derive(Debug, Clone)]
pub struct Prompts {
    env: Environment<'static>,
}

impl Prompts {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template(AGENT_TEMPLATE, AGENT_SOURCE)
            .map_err(template_error)?;
        env.add_template(SUMMARY_TEMPLATE, SUMMARY_SOURCE)
            .map_err(template_error)?;
        Ok(Self { env })
    }

    /// Question plus one `[id] title: snippet` line per source
    pub fn agent(&self, query: &str, sources: &[Source]) -> Result<String> {
        self.render(AGENT_TEMPLATE, json!({ "query": query, "sources": sources }))
    }

    /// Question, analyst notes and the evidence they were allowed to cite
    pub fn summary(&self, query: &str, outputs: &[AgentOutput], sources: &[Source]) -> Result<String> {
        self.render(
            SUMMARY_TEMPLATE,
            json!({ "query": query, "outputs": outputs, "sources": sources }),
        )
    }

    fn render(&self, name: &str, ctx: serde_json::Value) -> Result<String> {
        self.env
            .get_template(name)
            .and_then(|t| t.render(ctx))
            .map_err(template_error)
    }
}

fn template_error(e: minijinja::Error) -> FinanceError {
    FinanceError::Other(format!("prompt template error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_prompt_lists_evidence() {
        let prompts = Prompts::new().unwrap();
        let sources = vec![
            Source::live("AAPL", "price", "AAPL Current Price").with_snippet("Current Price: $189.50"),
            Source::document("d1", "Filing"),
        ];

        let text = prompts.agent("What is AAPL trading at?", &sources).unwrap();
        assert!(text.starts_with("Question: What is AAPL trading at?"));
        assert!(text.contains("[live:AAPL:price] AAPL Current Price: Current Price: $189.50\n"));
        assert!(text.contains("[doc:d1] Filing\n"));
    }

    #[test]
    fn test_summary_prompt_includes_notes() {
        let prompts = Prompts::new().unwrap();
        let outputs = vec![AgentOutput::new("Market Data Agent", "note text", Vec::new())];
        let text = prompts.summary("q", &outputs, &[]).unwrap();
        assert!(text.contains("### Market Data Agent\nnote text"));
        assert!(text.ends_with("Write the final answer."));
    }

    #[test]
    fn test_system_prompt_carries_rules() {
        let prompt = system_prompt(MARKET_DATA_SYSTEM);
        assert!(prompt.starts_with(MARKET_DATA_SYSTEM));
        assert!(prompt.contains("no verified source found"));
    }
}
