use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::query::QueryExpr;

/// Highlighting section of a search request.
///
/// `config` is whatever the results type asked for (fields, fragmenters,
/// pre/post tags); `highlight_query` narrows what gets highlighted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlight {
    #[serde(flatten)]
    pub config: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_query: Option<QueryExpr>,
}

/// A named aggregation attached to the request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub name: String,
    pub body: Value,
}

impl Aggregation {
    pub fn new<S: Into<String>>(name: S, body: Value) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }
}

/// Serialize aggregations as the `aggs` object of a request
pub fn aggregations_to_json(aggregations: &[Aggregation]) -> Value {
    Value::Object(
        aggregations
            .iter()
            .map(|agg| (agg.name.clone(), agg.body.clone()))
            .collect(),
    )
}

/// One stage of the rescoring chain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rescore {
    pub window_size: u32,
    pub query: RescoreQuery,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RescoreQuery {
    pub rescore_query: QueryExpr,
    pub query_weight: f64,
    pub rescore_query_weight: f64,
    pub score_mode: String,
}
