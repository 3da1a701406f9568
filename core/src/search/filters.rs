use wikisearch_dsl::{BoolQuery, QueryExpr};

/// Combine required and excluded filters into one filter expression.
///
/// Nothing to combine yields `None` (no restriction). A lone required filter
/// is returned as is. Anything else becomes a `bool` filter with the required
/// filters as `must` and the excluded ones as `must_not`, each group in the
/// order given.
pub fn unify(must: &[QueryExpr], must_not: &[QueryExpr]) -> Option<QueryExpr> {
    match (must, must_not) {
        ([], []) => None,
        ([only], []) => Some(only.clone()),
        _ => {
            let mut bool_query = BoolQuery::new();
            must.iter().cloned().for_each(|f| bool_query.add_must(f));
            must_not.iter().cloned().for_each(|f| bool_query.add_must_not(f));
            Some(bool_query.build())
        }
    }
}
