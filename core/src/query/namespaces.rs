use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{QueryError, Result};

pub static ALL_NAMESPACES: &str = "all";

/// Namespaces the query text itself asks to search.
///
/// Either every namespace (`all:` prefix) or an explicit set; an empty
/// explicit set means the query did not ask for anything in particular.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequiredNamespaces {
    All,
    Explicit(BTreeSet<i32>),
}

impl RequiredNamespaces {
    pub fn none() -> Self {
        RequiredNamespaces::Explicit(BTreeSet::new())
    }

    /// Accepts the `"all"` marker or an array of namespace ids
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(marker) if marker == ALL_NAMESPACES => Ok(RequiredNamespaces::All),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_i64()
                        .and_then(|id| i32::try_from(id).ok())
                        .ok_or_else(|| {
                            QueryError::MalformedParameter(format!(
                                "requiredNamespaces: {} is not a namespace id",
                                item
                            ))
                        })
                })
                .collect::<Result<BTreeSet<i32>>>()
                .map(RequiredNamespaces::Explicit),
            other => Err(QueryError::MalformedParameter(format!(
                "requiredNamespaces must be \"{}\" or a list of ids, got {}",
                ALL_NAMESPACES, other
            ))),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, RequiredNamespaces::All)
    }

    /// True for an explicit empty set
    pub fn is_empty(&self) -> bool {
        matches!(self, RequiredNamespaces::Explicit(ids) if ids.is_empty())
    }

    pub fn to_json(&self) -> Value {
        match self {
            RequiredNamespaces::All => json!(ALL_NAMESPACES),
            RequiredNamespaces::Explicit(ids) => json!(ids),
        }
    }
}

impl Default for RequiredNamespaces {
    fn default() -> Self {
        Self::none()
    }
}

/// Rewrites applied to the raw query text before parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCleanup {
    /// A leading `~` forcing a full-text search was stripped
    TildeHeader,
    /// Question marks were stripped or escaped
    CleanedQuestionMark,
    /// Full-width characters were replaced with their ASCII forms
    ReplacedFullWidthChars,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_value_all() {
        assert_eq!(
            RequiredNamespaces::from_value(&json!("all")).unwrap(),
            RequiredNamespaces::All
        );
    }

    #[test]
    fn test_from_value_ids() {
        let namespaces = RequiredNamespaces::from_value(&json!([14, 0, 14])).unwrap();
        assert_eq!(
            namespaces,
            RequiredNamespaces::Explicit(BTreeSet::from([0, 14]))
        );
        assert_eq!(namespaces.to_json(), json!([0, 14]));
    }

    #[test]
    fn test_from_value_rejects_other_markers() {
        for bad in [json!("some"), json!(null), json!(3), json!([1, "two"])] {
            assert!(
                matches!(
                    RequiredNamespaces::from_value(&bad),
                    Err(QueryError::MalformedParameter(_))
                ),
                "accepted {}",
                bad
            );
        }
    }

    #[test]
    fn test_empty_set_is_empty() {
        assert!(RequiredNamespaces::none().is_empty());
        assert!(!RequiredNamespaces::All.is_empty());
        assert!(RequiredNamespaces::All.is_all());
    }

    #[test]
    fn test_cleanup_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(QueryCleanup::TildeHeader).unwrap(),
            json!("tilde_header")
        );
    }
}
