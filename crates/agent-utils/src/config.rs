//! Environment-backed settings

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Variable names read by [`Settings::from_env`]
pub mod vars {
    pub const ENABLE_RETRIEVAL: &str = "ENABLE_RETRIEVAL";
    pub const REQUIRE_SOURCES: &str = "REQUIRE_SOURCES";
    pub const RETRIEVAL_TOP_K: &str = "RETRIEVAL_TOP_K";
    pub const LLM_MODEL: &str = "LLM_MODEL";
    pub const LLM_TEMPERATURE: &str = "LLM_TEMPERATURE";
    pub const LLM_MAX_TOKENS: &str = "LLM_MAX_TOKENS";
}

/// A variable was set but could not be parsed
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid value for {name}: {value:?}")]
pub struct SettingsError {
    pub name: String,
    pub value: String,
}

/// Process-level switches for the analysis pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Run the retrieval layer at all
    pub enable_retrieval: bool,
    /// Refuse to answer with numbers when nothing was retrieved
    pub require_sources: bool,
    /// Result-size bound handed to the retriever
    pub top_k: usize,
    /// Model name passed to the generation provider
    pub llm_model: String,
    /// Sampling temperature for agents
    pub llm_temperature: f32,
    /// Output token bound for agents
    pub llm_max_tokens: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_retrieval: true,
            require_sources: true,
            top_k: 5,
            llm_model: "gpt-4o-mini".to_string(),
            llm_temperature: 0.2,
            llm_max_tokens: 800,
        }
    }
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary lookup; unset keys keep defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let defaults = Self::default();

        Ok(Self {
            enable_retrieval: parse_bool(&lookup, vars::ENABLE_RETRIEVAL)?
                .unwrap_or(defaults.enable_retrieval),
            require_sources: parse_bool(&lookup, vars::REQUIRE_SOURCES)?
                .unwrap_or(defaults.require_sources),
            top_k: parse_value(&lookup, vars::RETRIEVAL_TOP_K)?.unwrap_or(defaults.top_k),
            llm_model: lookup(vars::LLM_MODEL).unwrap_or(defaults.llm_model),
            llm_temperature: parse_value(&lookup, vars::LLM_TEMPERATURE)?
                .unwrap_or(defaults.llm_temperature),
            llm_max_tokens: parse_value(&lookup, vars::LLM_MAX_TOKENS)?
                .unwrap_or(defaults.llm_max_tokens),
        })
    }
}

fn parse_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<bool>, SettingsError> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(Some(true)),
        "false" | "0" | "no" | "off" => Ok(Some(false)),
        _ => Err(SettingsError {
            name: name.to_string(),
            value: raw,
        }),
    }
}

fn parse_value<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, SettingsError> {
    lookup(name)
        .map(|raw| {
            raw.trim().parse().map_err(|_| SettingsError {
                name: name.to_string(),
                value: raw.clone(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.enable_retrieval);
        assert!(settings.require_sources);
        assert_eq!(settings.top_k, 5);
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup_from(&[
            (vars::ENABLE_RETRIEVAL, "false"),
            (vars::REQUIRE_SOURCES, "No"),
            (vars::RETRIEVAL_TOP_K, " 3 "),
            (vars::LLM_MODEL, "local-model"),
        ]))
        .unwrap();

        assert!(!settings.enable_retrieval);
        assert!(!settings.require_sources);
        assert_eq!(settings.top_k, 3);
        assert_eq!(settings.llm_model, "local-model");
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = Settings::from_lookup(lookup_from(&[(vars::RETRIEVAL_TOP_K, "many")]))
            .unwrap_err();
        assert_eq!(err.name, vars::RETRIEVAL_TOP_K);

        let err = Settings::from_lookup(lookup_from(&[(vars::REQUIRE_SOURCES, "maybe")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid value for REQUIRE_SOURCES: \"maybe\"");
    }
}
