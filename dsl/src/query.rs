use std::fmt::Display;

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

/// Operator used by `match` queries to combine the analyzed terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
}

impl Operator {
    fn as_str(&self) -> &'static str {
        match self {
            Operator::And => "and",
            Operator::Or => "or",
        }
    }
}

/// Query expression sent to the search backend.
///
/// Expressions are plain values: cloning one produces an independent tree and
/// nothing is ever mutated behind a shared reference. This is the query side
/// of the request, the filter side reuses the same type inside [`BoolQuery::filter`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpr {
    /// Matches every document
    MatchAll,
    /// Matches no document
    MatchNone,
    /// Analyzed full-text match on a single field
    Match {
        field: String,
        text: String,
        operator: Operator,
    },
    /// Analyzed phrase match
    MatchPhrase {
        field: String,
        text: String,
        slop: u32,
    },
    /// Phrase match where the last term is a prefix
    MatchPhrasePrefix { field: String, text: String },
    /// Unanalyzed prefix match
    Prefix { field: String, value: String },
    /// Fuzzy term match, `None` lets the backend pick the edit distance
    Fuzzy {
        field: String,
        value: String,
        fuzziness: Option<u8>,
    },
    /// Wildcard (`?`, `*`) term match
    Wildcard { field: String, value: String },
    /// Exact term match
    Term { field: String, value: Value },
    /// Exact match against any of the values
    Terms { field: String, values: Vec<Value> },
    /// Boolean combination of other expressions
    Bool(BoolQuery),
    /// Wraps a query and rescales its score with a list of functions
    FunctionScore {
        query: Box<QueryExpr>,
        functions: Vec<ScoreFunction>,
        score_mode: String,
        boost_mode: String,
    },
}

impl QueryExpr {
    /// Create a `match` expression using the AND operator
    pub fn matches<F: Into<String>, S: Into<String>>(field: F, text: S) -> Self {
        QueryExpr::Match {
            field: field.into(),
            text: text.into(),
            operator: Operator::And,
        }
    }

    /// Create a `match_phrase` expression
    pub fn phrase<F: Into<String>, S: Into<String>>(field: F, text: S, slop: u32) -> Self {
        QueryExpr::MatchPhrase {
            field: field.into(),
            text: text.into(),
            slop,
        }
    }

    /// Create a `term` expression
    pub fn term<F: Into<String>, V: Into<Value>>(field: F, value: V) -> Self {
        QueryExpr::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a `terms` expression
    pub fn terms<F, I, V>(field: F, values: I) -> Self
    where
        F: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        QueryExpr::Terms {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Negate the expression
    pub fn not(self) -> Self {
        QueryExpr::Bool(BoolQuery::new().must_not(self))
    }

    /// Create an AND expression with another expression
    pub fn and(self, other: QueryExpr) -> Self {
        QueryExpr::Bool(BoolQuery::new().must(self).must(other))
    }

    /// Create an OR expression with another expression
    pub fn or(self, other: QueryExpr) -> Self {
        QueryExpr::Bool(BoolQuery::new().should(self).should(other))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, QueryExpr::Bool(_))
    }

    /// Convert the expression to the backend's JSON query format
    pub fn to_json(&self) -> Value {
        match self {
            QueryExpr::MatchAll => json!({ "match_all": {} }),
            QueryExpr::MatchNone => json!({ "match_none": {} }),
            QueryExpr::Match {
                field,
                text,
                operator,
            } => json!({
                "match": { field.as_str(): { "query": text, "operator": operator.as_str() } }
            }),
            QueryExpr::MatchPhrase { field, text, slop } => json!({
                "match_phrase": { field.as_str(): { "query": text, "slop": slop } }
            }),
            QueryExpr::MatchPhrasePrefix { field, text } => json!({
                "match_phrase_prefix": { field.as_str(): { "query": text } }
            }),
            QueryExpr::Prefix { field, value } => json!({ "prefix": { field.as_str(): value } }),
            QueryExpr::Fuzzy {
                field,
                value,
                fuzziness,
            } => {
                let fuzziness = match fuzziness {
                    Some(distance) => json!(distance),
                    None => json!("AUTO"),
                };
                json!({ "fuzzy": { field.as_str(): { "value": value, "fuzziness": fuzziness } } })
            }
            QueryExpr::Wildcard { field, value } => {
                json!({ "wildcard": { field.as_str(): value } })
            }
            QueryExpr::Term { field, value } => json!({ "term": { field.as_str(): value } }),
            QueryExpr::Terms { field, values } => json!({ "terms": { field.as_str(): values } }),
            QueryExpr::Bool(bool_query) => json!({ "bool": bool_query.to_json() }),
            QueryExpr::FunctionScore {
                query,
                functions,
                score_mode,
                boost_mode,
            } => json!({
                "function_score": {
                    "query": query.to_json(),
                    "functions": functions.iter().map(ScoreFunction::to_json).collect::<Vec<_>>(),
                    "score_mode": score_mode,
                    "boost_mode": boost_mode,
                }
            }),
        }
    }
}

impl Display for QueryExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl Serialize for QueryExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Boolean query with the four clause groups the backend understands.
///
/// Clause order inside each group is insertion order, so the JSON output is
/// deterministic for a given sequence of calls.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoolQuery {
    pub must: Vec<QueryExpr>,
    pub should: Vec<QueryExpr>,
    pub must_not: Vec<QueryExpr>,
    pub filter: Vec<QueryExpr>,
}

impl BoolQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn must(mut self, expr: QueryExpr) -> Self {
        self.must.push(expr);
        self
    }

    pub fn should(mut self, expr: QueryExpr) -> Self {
        self.should.push(expr);
        self
    }

    pub fn must_not(mut self, expr: QueryExpr) -> Self {
        self.must_not.push(expr);
        self
    }

    pub fn filter(mut self, expr: QueryExpr) -> Self {
        self.filter.push(expr);
        self
    }

    pub fn add_must(&mut self, expr: QueryExpr) {
        self.must.push(expr);
    }

    pub fn add_should(&mut self, expr: QueryExpr) {
        self.should.push(expr);
    }

    pub fn add_must_not(&mut self, expr: QueryExpr) {
        self.must_not.push(expr);
    }

    pub fn add_filter(&mut self, expr: QueryExpr) {
        self.filter.push(expr);
    }

    /// True when no clause has been added to any group
    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
            && self.should.is_empty()
            && self.must_not.is_empty()
            && self.filter.is_empty()
    }

    /// Build the final query expression
    pub fn build(self) -> QueryExpr {
        QueryExpr::Bool(self)
    }

    fn to_json(&self) -> Value {
        let mut body = Map::new();
        for (name, clauses) in [
            ("must", &self.must),
            ("should", &self.should),
            ("must_not", &self.must_not),
            ("filter", &self.filter),
        ] {
            if !clauses.is_empty() {
                body.insert(
                    name.to_string(),
                    Value::Array(clauses.iter().map(QueryExpr::to_json).collect()),
                );
            }
        }
        Value::Object(body)
    }
}

impl From<BoolQuery> for QueryExpr {
    fn from(bool_query: BoolQuery) -> Self {
        QueryExpr::Bool(bool_query)
    }
}

/// A single scoring function inside a `function_score` query.
///
/// `function` holds the function body (for example
/// `{"field_value_factor": {...}}`); its keys are merged into the output
/// next to `filter` and `weight`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreFunction {
    pub filter: Option<QueryExpr>,
    pub weight: f64,
    pub function: Option<Map<String, Value>>,
}

impl ScoreFunction {
    /// A constant weight applied to documents matching `filter`
    pub fn weighted(filter: QueryExpr, weight: f64) -> Self {
        Self {
            filter: Some(filter),
            weight,
            function: None,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut body = self.function.clone().unwrap_or_default();
        if let Some(filter) = &self.filter {
            body.insert("filter".to_string(), filter.to_json());
        }
        body.insert("weight".to_string(), json!(self.weight));
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_all() {
        assert_eq!(QueryExpr::MatchAll.to_json(), json!({ "match_all": {} }));
    }

    #[test]
    fn test_match() {
        let expr = QueryExpr::matches("all", "hello world");
        assert_eq!(
            expr.to_json(),
            json!({ "match": { "all": { "query": "hello world", "operator": "and" } } })
        );
    }

    #[test]
    fn test_not() {
        let expr = QueryExpr::term("namespace", 0).not();
        assert_eq!(
            expr.to_json(),
            json!({ "bool": { "must_not": [ { "term": { "namespace": 0 } } ] } })
        );
    }

    #[test]
    fn test_and_or() {
        let expr = QueryExpr::matches("all", "a")
            .and(QueryExpr::matches("all", "b"))
            .or(QueryExpr::MatchNone);
        let QueryExpr::Bool(outer) = &expr else {
            panic!("expected bool, got {}", expr);
        };
        assert_eq!(outer.should.len(), 2);
        assert!(outer.should[0].is_bool());
        assert_eq!(outer.should[1], QueryExpr::MatchNone);
    }

    #[test]
    fn test_bool_omits_empty_groups() {
        let expr = BoolQuery::new()
            .must(QueryExpr::MatchAll)
            .filter(QueryExpr::terms("namespace", [0, 14]))
            .build();
        assert_eq!(
            expr.to_json(),
            json!({
                "bool": {
                    "must": [ { "match_all": {} } ],
                    "filter": [ { "terms": { "namespace": [0, 14] } } ]
                }
            })
        );
    }

    #[test]
    fn test_bool_preserves_insertion_order() {
        let mut bool_query = BoolQuery::new();
        bool_query.add_must_not(QueryExpr::term("a", 1));
        bool_query.add_must_not(QueryExpr::term("b", 2));
        assert_eq!(
            bool_query.must_not,
            vec![QueryExpr::term("a", 1), QueryExpr::term("b", 2)]
        );
        assert!(!bool_query.is_empty());
        assert!(BoolQuery::new().is_empty());
    }

    #[test]
    fn test_fuzzy_defaults_to_auto() {
        let expr = QueryExpr::Fuzzy {
            field: "all".into(),
            value: "helo".into(),
            fuzziness: None,
        };
        assert_eq!(
            expr.to_json(),
            json!({ "fuzzy": { "all": { "value": "helo", "fuzziness": "AUTO" } } })
        );
    }

    #[test]
    fn test_function_score() {
        let mut function = Map::new();
        function.insert(
            "field_value_factor".to_string(),
            json!({ "field": "incoming_links", "modifier": "log2p" }),
        );
        let expr = QueryExpr::FunctionScore {
            query: Box::new(QueryExpr::MatchAll),
            functions: vec![
                ScoreFunction::weighted(QueryExpr::term("namespace", 0), 2.0),
                ScoreFunction {
                    filter: None,
                    weight: 1.0,
                    function: Some(function),
                },
            ],
            score_mode: "multiply".into(),
            boost_mode: "multiply".into(),
        };
        let json = expr.to_json();
        assert_eq!(
            json["function_score"]["functions"][0],
            json!({ "filter": { "term": { "namespace": 0 } }, "weight": 2.0 })
        );
        assert_eq!(
            json["function_score"]["functions"][1]["field_value_factor"]["field"],
            "incoming_links"
        );
    }

    #[test]
    fn test_display_trait() {
        let expr = QueryExpr::Prefix {
            field: "title".into(),
            value: "Foo".into(),
        };
        assert_eq!(format!("{}", expr), r#"{"prefix":{"title":"Foo"}}"#);
    }

    #[test]
    fn test_serialize_matches_to_json() {
        let expr = QueryExpr::phrase("all", "hello world", 1);
        assert_eq!(serde_json::to_value(&expr).unwrap(), expr.to_json());
    }
}
