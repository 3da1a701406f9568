//! Contract between the query core and the pluggable keyword features
//! (`intitle:`, `incategory:`, `prefix:`, ...).
//!
//! A feature is shared by every query the parser produces. The core only
//! asks it three things about one occurrence: its canonical name, the
//! cross-wiki strategy it allows, and the filter it contributes.

use std::fmt::Debug;

use wikisearch_dsl::QueryExpr;

use crate::{ast::KeywordNode, config::SearchConfig};

pub mod strategy;

pub use strategy::CrossSearchStrategy;

pub trait KeywordFeature: Debug + Send + Sync {
    /// Keys the parser matches for this feature, without the delimiter
    fn keys(&self) -> Vec<String>;

    /// Canonical name for an occurrence matched with `key` and `delimiter`.
    /// The same key can name different features, `intitle:/regex/` is a
    /// regex search while `intitle:word` is not.
    fn feature_name(&self, key: &str, _delimiter: &str) -> String {
        key.to_string()
    }

    /// Execution modes this occurrence allows
    fn cross_search_strategy(&self, _node: &KeywordNode) -> CrossSearchStrategy {
        CrossSearchStrategy::all_wikis()
    }

    /// Filter restricting the result set to what the occurrence asks for.
    /// `None` when the keyword only affects scoring or presentation.
    fn filter(&self, _node: &KeywordNode, _config: &SearchConfig) -> Option<QueryExpr> {
        None
    }
}
