use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use wikisearch_dsl::{QueryExpr, Rescore, RescoreQuery};

use crate::{search::SearchContext, search_log, QueryError, Result};

/// Produces the rescoring chain for a search context
pub trait RescoreBuilder {
    fn build(&self, context: &SearchContext) -> Vec<Rescore>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescoreStageKind {
    /// Rescore with the context's phrase rescore query
    Phrase,
    /// Rescore with the context's extra score functions
    FunctionScore,
}

fn default_score_mode() -> String {
    "total".to_string()
}

fn default_function_mode() -> String {
    "multiply".to_string()
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescoreStageConfig {
    pub kind: RescoreStageKind,
    pub window: u32,
    #[serde(default = "default_weight")]
    pub query_weight: f64,
    #[serde(default = "default_weight")]
    pub rescore_query_weight: f64,
    #[serde(default = "default_score_mode")]
    pub score_mode: String,
    /// `score_mode` and `boost_mode` of the generated `function_score`
    #[serde(default = "default_function_mode")]
    pub function_mode: String,
}

impl RescoreStageConfig {
    fn to_rescore(&self, rescore_query: QueryExpr) -> Rescore {
        Rescore {
            window_size: self.window,
            query: RescoreQuery {
                rescore_query,
                query_weight: self.query_weight,
                rescore_query_weight: self.rescore_query_weight,
                score_mode: self.score_mode.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RescoreProfile {
    pub stages: Vec<RescoreStageConfig>,
}

/// Builds the chain from named rescore profiles, picking the profile the
/// context resolves. Stages with nothing to rescore with are skipped.
#[derive(Debug, Clone, Default)]
pub struct ProfileRescoreBuilder {
    profiles: HashMap<String, RescoreProfile>,
}

impl ProfileRescoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load profiles from a JSON object of `name -> { "stages": [...] }`
    pub fn from_json(input: &str) -> Result<Self> {
        let profiles: HashMap<String, RescoreProfile> = serde_json::from_str(input)
            .map_err(|e| QueryError::MalformedParameter(format!("rescore profiles: {}", e)))?;
        Ok(Self { profiles })
    }

    pub fn with_profile<S: Into<String>>(mut self, name: S, profile: RescoreProfile) -> Self {
        self.profiles.insert(name.into(), profile);
        self
    }
}

impl RescoreBuilder for ProfileRescoreBuilder {
    fn build(&self, context: &SearchContext) -> Vec<Rescore> {
        let name = context.rescore_profile();
        let Some(profile) = self.profiles.get(&name) else {
            search_log!(
                warn,
                "ProfileRescoreBuilder",
                name,
                "unknown rescore profile, no rescoring applied"
            );
            return Vec::new();
        };

        profile
            .stages
            .iter()
            .filter_map(|stage| match stage.kind {
                RescoreStageKind::Phrase => context
                    .phrase_rescore_query()
                    .cloned()
                    .map(|query| stage.to_rescore(query)),
                RescoreStageKind::FunctionScore => {
                    let functions = context.extra_score_builders();
                    if functions.is_empty() {
                        return None;
                    }
                    Some(stage.to_rescore(QueryExpr::FunctionScore {
                        query: Box::new(QueryExpr::MatchAll),
                        functions: functions.to_vec(),
                        score_mode: stage.function_mode.clone(),
                        boost_mode: stage.function_mode.clone(),
                    }))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::SearchConfig;
    use crate::search::profile::StaticProfileService;
    use wikisearch_dsl::ScoreFunction;

    const PROFILES: &str = r#"{
        "classic": { "stages": [
            { "kind": "phrase", "window": 512, "rescore_query_weight": 10.0 },
            { "kind": "function_score", "window": 8192, "score_mode": "multiply" }
        ] },
        "empty": { "stages": [] }
    }"#;

    fn context(profile: &str) -> SearchContext {
        let mut context = SearchContext::new(
            Arc::new(SearchConfig::default()),
            Arc::new(StaticProfileService::new()),
        );
        context.set_rescore_profile(profile);
        context
    }

    #[test]
    fn test_stages_skip_without_input() {
        let builder = ProfileRescoreBuilder::from_json(PROFILES).unwrap();
        assert!(builder.build(&context("classic")).is_empty());
    }

    #[test]
    fn test_full_chain() {
        let builder = ProfileRescoreBuilder::from_json(PROFILES).unwrap();
        let mut context = context("classic");
        context.set_phrase_rescore_query(QueryExpr::phrase("all", "foo bar", 1));
        context.add_extra_score_builder(ScoreFunction::weighted(
            QueryExpr::term("namespace", 0),
            2.0,
        ));

        let chain = builder.build(&context);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].window_size, 512);
        assert_eq!(chain[0].query.rescore_query_weight, 10.0);
        assert_eq!(chain[0].query.score_mode, "total");
        assert_eq!(chain[1].window_size, 8192);
        assert_eq!(chain[1].query.score_mode, "multiply");
        assert!(matches!(
            chain[1].query.rescore_query,
            QueryExpr::FunctionScore { .. }
        ));
    }

    #[test]
    fn test_unknown_profile_is_empty() {
        let builder = ProfileRescoreBuilder::new();
        let mut context = context("missing");
        context.set_phrase_rescore_query(QueryExpr::MatchAll);
        assert!(builder.build(&context).is_empty());
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            ProfileRescoreBuilder::from_json(r#"{ "x": { "stages": [ { "window": 1 } ] } }"#),
            Err(QueryError::MalformedParameter(_))
        ));
    }
}
