//! Query compilation core for wiki full-text search.
//!
//! A parsed search expression ([`query::ParsedQuery`]) is classified and
//! inspected for its cross-wiki capabilities on demand, then compiled into a
//! [`search::SearchContext`] which assembles the composite backend query,
//! the rescoring chain and the highlighting section.
#![forbid(unsafe_code)]

pub mod ast;
pub mod builder;
pub mod classify;
pub mod config;
pub mod keyword;
pub mod query;
pub mod search;

pub use wikisearch_dsl as dsl;

/// Describes an error raised while building or inspecting a query
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("No classifier registered for class '{0}'")]
    UnknownClassifier(String),
    #[error("Query text is {length} characters long, the maximum is {max}")]
    OversizeInput { length: usize, max: usize },
    #[error("Malformed parameter: {0}")]
    MalformedParameter(String),
}

pub type Result<T> = std::result::Result<T, QueryError>;

/// Emit a `tracing` event tagged with the emitting component and the scope
/// (query text, profile name, ...) it concerns.
#[macro_export]
macro_rules! search_log {
    ($level:ident, $module:expr, $scope:expr, $msg:literal $(, $args:expr)* $(,)?) => {
        ::tracing::$level!(
            module = $module,
            scope = %$scope,
            $msg $(, $args)*
        )
    };
}
