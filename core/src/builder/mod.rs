//! Turning a parsed query into search context state.

use crate::{query::ParsedQuery, search::SearchContext, Result};

pub mod fulltext;

pub use fulltext::AstQueryBuilder;

/// Builds the full-text part of a search into a context
pub trait FullTextQueryBuilder {
    /// Populate `context` from `query`. Implementations must reject input
    /// before touching the context, a failed build leaves it unchanged.
    fn build(&self, context: &mut SearchContext, query: &ParsedQuery) -> Result<()>;
}
