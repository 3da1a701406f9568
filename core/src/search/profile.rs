use std::{collections::BTreeMap, collections::HashMap, fmt::Debug};

use serde::{Deserialize, Serialize};

use crate::search_log;

pub static DEFAULT_PROFILE_NAME: &str = "default";

/// Kinds of named profiles a search context selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    Rescore,
    FulltextQueryBuilder,
}

impl ProfileKind {
    /// Context parameter a caller can set to force a profile
    pub fn override_param(&self) -> &'static str {
        match self {
            ProfileKind::Rescore => "rescore_profile",
            ProfileKind::FulltextQueryBuilder => "fulltext_profile",
        }
    }
}

/// Resolves the profile name to use for a kind in a given profile context
pub trait ProfileService: Debug + Send + Sync {
    fn profile_name(
        &self,
        kind: ProfileKind,
        context: &str,
        params: &BTreeMap<String, String>,
    ) -> String;
}

/// Profile names from a fixed table, keyed by kind and context.
///
/// Lookup order: the kind's override parameter, the `(kind, context)`
/// entry, the kind's fallback, then [`DEFAULT_PROFILE_NAME`].
#[derive(Debug, Clone, Default)]
pub struct StaticProfileService {
    names: HashMap<(ProfileKind, String), String>,
    fallbacks: HashMap<ProfileKind, String>,
}

impl StaticProfileService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile<C: Into<String>, N: Into<String>>(
        mut self,
        kind: ProfileKind,
        context: C,
        name: N,
    ) -> Self {
        self.names.insert((kind, context.into()), name.into());
        self
    }

    pub fn with_fallback<N: Into<String>>(mut self, kind: ProfileKind, name: N) -> Self {
        self.fallbacks.insert(kind, name.into());
        self
    }
}

impl ProfileService for StaticProfileService {
    fn profile_name(
        &self,
        kind: ProfileKind,
        context: &str,
        params: &BTreeMap<String, String>,
    ) -> String {
        let name = params
            .get(kind.override_param())
            .or_else(|| self.names.get(&(kind, context.to_string())))
            .or_else(|| self.fallbacks.get(&kind))
            .cloned()
            .unwrap_or_else(|| DEFAULT_PROFILE_NAME.to_string());
        search_log!(
            debug,
            "StaticProfileService",
            context,
            "resolved {:?} profile to '{}'",
            kind,
            name
        );
        name
    }
}
