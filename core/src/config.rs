use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{QueryError, Result};

pub static ENV_VAR_MAX_QUERY_LENGTH: &str = "SEARCH_MAX_QUERY_LENGTH";
pub static ENV_VAR_PHRASE_SLOP: &str = "SEARCH_PHRASE_SLOP";
pub static ENV_VAR_PROFILE_CONTEXT: &str = "SEARCH_PROFILE_CONTEXT";

pub static DEFAULT_MAX_QUERY_LENGTH: usize = 300;
pub static DEFAULT_PHRASE_RESCORE_SLOP: u32 = 1;
pub static DEFAULT_PROFILE_CONTEXT: &str = "default";
pub static DEFAULT_NAMESPACE_FIELD: &str = "namespace";
pub static DEFAULT_ALL_FIELD: &str = "all";
pub static DEFAULT_TITLE_FIELD: &str = "title";

/// Settings shared by every query built against one wiki
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Longest query text, in characters, the full-text builder accepts
    pub max_full_text_query_length: usize,
    pub namespace_field: String,
    pub all_field: String,
    pub title_field: String,
    pub phrase_rescore_slop: u32,
    /// Name used to pick rescore and full-text profiles
    pub profile_context: String,
    pub profile_context_params: BTreeMap<String, String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_full_text_query_length: DEFAULT_MAX_QUERY_LENGTH,
            namespace_field: DEFAULT_NAMESPACE_FIELD.to_string(),
            all_field: DEFAULT_ALL_FIELD.to_string(),
            title_field: DEFAULT_TITLE_FIELD.to_string(),
            phrase_rescore_slop: DEFAULT_PHRASE_RESCORE_SLOP,
            profile_context: DEFAULT_PROFILE_CONTEXT.to_string(),
            profile_context_params: BTreeMap::new(),
        }
    }
}

impl SearchConfig {
    /// Defaults overlaid with the `SEARCH_*` environment variables
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns. Unparsable values
    /// keep the default.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let max_full_text_query_length = lookup(ENV_VAR_MAX_QUERY_LENGTH)
            .map(|v| v.parse::<usize>().unwrap_or(DEFAULT_MAX_QUERY_LENGTH))
            .unwrap_or(DEFAULT_MAX_QUERY_LENGTH);
        let phrase_rescore_slop = lookup(ENV_VAR_PHRASE_SLOP)
            .map(|v| v.parse::<u32>().unwrap_or(DEFAULT_PHRASE_RESCORE_SLOP))
            .unwrap_or(DEFAULT_PHRASE_RESCORE_SLOP);
        let profile_context = lookup(ENV_VAR_PROFILE_CONTEXT)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.profile_context.clone());

        Self {
            max_full_text_query_length,
            phrase_rescore_slop,
            profile_context,
            ..defaults
        }
    }

    /// Parse a JSON config document, missing keys take their defaults
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input)
            .map_err(|e| QueryError::MalformedParameter(format!("search config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.max_full_text_query_length, 300);
        assert_eq!(config.namespace_field, "namespace");
        assert_eq!(config.profile_context, "default");
    }

    #[test]
    fn test_from_vars_overrides() {
        let config = SearchConfig::from_vars(lookup_from(&[
            ("SEARCH_MAX_QUERY_LENGTH", "42"),
            ("SEARCH_PHRASE_SLOP", "3"),
            ("SEARCH_PROFILE_CONTEXT", "prefix"),
        ]));
        assert_eq!(config.max_full_text_query_length, 42);
        assert_eq!(config.phrase_rescore_slop, 3);
        assert_eq!(config.profile_context, "prefix");
        assert_eq!(config.all_field, "all");
    }

    #[test]
    fn test_from_vars_ignores_garbage() {
        let config = SearchConfig::from_vars(lookup_from(&[
            ("SEARCH_MAX_QUERY_LENGTH", "lots"),
            ("SEARCH_PROFILE_CONTEXT", "  "),
        ]));
        assert_eq!(config, SearchConfig::default());
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            SearchConfig::from_json(r#"{ "max_full_text_query_length": 10, "title_field": "t" }"#)
                .unwrap();
        assert_eq!(config.max_full_text_query_length, 10);
        assert_eq!(config.title_field, "t");
        assert_eq!(config.phrase_rescore_slop, 1);
    }

    #[test]
    fn test_from_json_rejects_bad_types() {
        let err = SearchConfig::from_json(r#"{ "phrase_rescore_slop": "one" }"#).unwrap_err();
        assert!(matches!(err, QueryError::MalformedParameter(_)));
    }
}
