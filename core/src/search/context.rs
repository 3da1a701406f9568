use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use once_cell::sync::OnceCell;
use serde_json::{json, Map, Value};
use wikisearch_dsl::{
    aggregations_to_json, Aggregation, BoolQuery, Highlight, QueryExpr, Rescore, ScoreFunction,
};

use crate::{
    ast::ParseWarning,
    config::SearchConfig,
    search::{
        filters,
        profile::{ProfileKind, ProfileService},
        rescore::RescoreBuilder,
        results::ResultsType,
    },
    search_log,
};

/// Search type reported when no special syntax was recorded
pub static FULL_TEXT_SEARCH_TYPE: &str = "full_text";

/// Weight [`SearchContext::add_syntax_used`] callers use for ordinary syntax
pub const DEFAULT_SYNTAX_WEIGHT: u64 = 10;

///
/// SearchContext accumulates everything one search request needs while its
/// query is being built, then assembles it:
/// 1. [`SearchContext::query`] combines the main query, non-text queries,
///    namespace restriction and filters into one composite query
/// 2. [`SearchContext::rescore`] asks a rescore builder for the rescoring chain
/// 3. [`SearchContext::highlight`] asks the results type for highlighting
///
/// The context is owned by the single caller building one request. Every
/// mutation that can change the retrieved result set marks it dirty.
///
#[derive(Debug, Clone)]
pub struct SearchContext {
    config: Arc<SearchConfig>,
    profiles: Arc<dyn ProfileService>,
    main_query: Option<QueryExpr>,
    non_text_queries: Vec<QueryExpr>,
    filters: Vec<QueryExpr>,
    not_filters: Vec<QueryExpr>,
    /// `None` searches every namespace
    namespaces: Option<BTreeSet<i32>>,
    highlight_query: Option<QueryExpr>,
    non_text_highlight_queries: Vec<QueryExpr>,
    extra_highlight_fields: BTreeMap<String, Value>,
    phrase_rescore_query: Option<QueryExpr>,
    extra_score_builders: Vec<ScoreFunction>,
    suggest: Option<Value>,
    suggest_prefixes: Vec<String>,
    suggest_suffixes: Vec<String>,
    aggregations: Vec<Aggregation>,
    /// Insertion ordered, re-adding a feature replaces its weight in place
    syntax_used: Vec<(String, u64)>,
    /// Seconds, 0 disables caching
    cache_ttl: u64,
    results_possible: bool,
    limit_search_to_local_wiki: bool,
    search_text: Option<String>,
    original_search_term: Option<String>,
    warnings: Vec<ParseWarning>,
    rescore_profile: OnceCell<String>,
    fulltext_profile: OnceCell<String>,
    dirty: bool,
}

impl SearchContext {
    pub fn new(config: Arc<SearchConfig>, profiles: Arc<dyn ProfileService>) -> Self {
        SearchContext {
            config,
            profiles,
            main_query: None,
            non_text_queries: Vec::new(),
            filters: Vec::new(),
            not_filters: Vec::new(),
            namespaces: None,
            highlight_query: None,
            non_text_highlight_queries: Vec::new(),
            extra_highlight_fields: BTreeMap::new(),
            phrase_rescore_query: None,
            extra_score_builders: Vec::new(),
            suggest: None,
            suggest_prefixes: Vec::new(),
            suggest_suffixes: Vec::new(),
            aggregations: Vec::new(),
            syntax_used: Vec::new(),
            cache_ttl: 0,
            results_possible: true,
            limit_search_to_local_wiki: false,
            search_text: None,
            original_search_term: None,
            warnings: Vec::new(),
            rescore_profile: OnceCell::new(),
            fulltext_profile: OnceCell::new(),
            dirty: false,
        }
    }

    /// Same context bound to another configuration. Query expressions are
    /// values, so the copy shares nothing mutable with `self`.
    pub fn with_config(&self, config: Arc<SearchConfig>) -> SearchContext {
        SearchContext {
            config,
            ..self.clone()
        }
    }

    pub fn config(&self) -> &Arc<SearchConfig> {
        &self.config
    }

    /// True once anything affecting the result set was changed
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn add_filter(&mut self, filter: QueryExpr) {
        self.dirty = true;
        self.filters.push(filter);
    }

    pub fn add_not_filter(&mut self, filter: QueryExpr) {
        self.dirty = true;
        self.not_filters.push(filter);
    }

    pub fn filters(&self) -> &[QueryExpr] {
        &self.filters
    }

    pub fn not_filters(&self) -> &[QueryExpr] {
        &self.not_filters
    }

    pub fn set_main_query(&mut self, query: QueryExpr) {
        self.dirty = true;
        self.main_query = Some(query);
    }

    pub fn main_query(&self) -> Option<&QueryExpr> {
        self.main_query.as_ref()
    }

    /// Add a query that does not go through the full-text machinery, such
    /// as a phrase prefix match. It is ANDed with the main query.
    pub fn add_non_text_query(&mut self, query: QueryExpr) {
        self.dirty = true;
        self.non_text_queries.push(query);
    }

    /// Restrict the search to `namespaces`, `None` or an empty set searches
    /// every namespace
    pub fn set_namespaces(&mut self, namespaces: Option<BTreeSet<i32>>) {
        self.dirty = true;
        self.namespaces = namespaces.filter(|namespaces| !namespaces.is_empty());
    }

    pub fn namespaces(&self) -> Option<&BTreeSet<i32>> {
        self.namespaces.as_ref()
    }

    pub fn set_highlight_query(&mut self, query: QueryExpr) {
        self.dirty = true;
        self.highlight_query = Some(query);
    }

    pub fn add_non_text_highlight_query(&mut self, query: QueryExpr) {
        self.dirty = true;
        self.non_text_highlight_queries.push(query);
    }

    /// Extra per-field highlight options handed to the results type
    pub fn add_highlight_field<S: Into<String>>(&mut self, field: S, options: Value) {
        self.dirty = true;
        self.extra_highlight_fields.insert(field.into(), options);
    }

    pub fn set_phrase_rescore_query(&mut self, query: QueryExpr) {
        self.dirty = true;
        self.phrase_rescore_query = Some(query);
    }

    pub fn phrase_rescore_query(&self) -> Option<&QueryExpr> {
        self.phrase_rescore_query.as_ref()
    }

    pub fn add_extra_score_builder(&mut self, function: ScoreFunction) {
        self.dirty = true;
        self.extra_score_builders.push(function);
    }

    pub fn extra_score_builders(&self) -> &[ScoreFunction] {
        &self.extra_score_builders
    }

    pub fn set_suggest(&mut self, suggest: Value) {
        self.dirty = true;
        self.suggest = Some(suggest);
    }

    /// Does not mark the context dirty
    pub fn add_suggest_prefix<S: Into<String>>(&mut self, prefix: S) {
        self.suggest_prefixes.push(prefix.into());
    }

    pub fn add_suggest_suffix<S: Into<String>>(&mut self, suffix: S) {
        self.dirty = true;
        self.suggest_suffixes.push(suffix.into());
    }

    pub fn suggest_prefixes(&self) -> &[String] {
        &self.suggest_prefixes
    }

    pub fn suggest_suffixes(&self) -> &[String] {
        &self.suggest_suffixes
    }

    pub fn add_aggregation(&mut self, aggregation: Aggregation) {
        self.dirty = true;
        self.aggregations.push(aggregation);
    }

    pub fn aggregations(&self) -> &[Aggregation] {
        &self.aggregations
    }

    /// Record that the query used `feature`, heavier syntax decides the
    /// reported search type
    pub fn add_syntax_used<S: Into<String>>(&mut self, feature: S, weight: u64) {
        self.dirty = true;
        let feature = feature.into();
        match self.syntax_used.iter_mut().find(|(name, _)| *name == feature) {
            Some(entry) => entry.1 = weight,
            None => self.syntax_used.push((feature, weight)),
        }
    }

    pub fn is_syntax_used(&self, feature: &str) -> bool {
        self.syntax_used.iter().any(|(name, _)| name == feature)
    }

    pub fn syntax_used(&self) -> impl Iterator<Item = &str> {
        self.syntax_used.iter().map(|(name, _)| name.as_str())
    }

    /// The heaviest syntax recorded, the earliest recorded wins a tie
    pub fn search_type(&self) -> &str {
        let mut heaviest: Option<&(String, u64)> = None;
        for entry in &self.syntax_used {
            if heaviest.map_or(true, |(_, weight)| entry.1 > *weight) {
                heaviest = Some(entry);
            }
        }
        heaviest
            .map(|(name, _)| name.as_str())
            .unwrap_or(FULL_TEXT_SEARCH_TYPE)
    }

    pub fn set_cache_ttl(&mut self, seconds: u64) {
        self.dirty = true;
        self.cache_ttl = seconds;
    }

    pub fn cache_ttl(&self) -> u64 {
        self.cache_ttl
    }

    pub fn set_results_possible(&mut self, possible: bool) {
        self.dirty = true;
        self.results_possible = possible;
    }

    pub fn are_results_possible(&self) -> bool {
        self.results_possible
    }

    pub fn set_limit_search_to_local_wiki(&mut self, limit: bool) {
        self.dirty = true;
        self.limit_search_to_local_wiki = limit;
    }

    pub fn limit_search_to_local_wiki(&self) -> bool {
        self.limit_search_to_local_wiki
    }

    pub fn set_search_text<S: Into<String>>(&mut self, text: S) {
        self.dirty = true;
        self.search_text = Some(text.into());
    }

    pub fn search_text(&self) -> Option<&str> {
        self.search_text.as_deref()
    }

    /// Does not mark the context dirty
    pub fn set_original_search_term<S: Into<String>>(&mut self, term: S) {
        self.original_search_term = Some(term.into());
    }

    pub fn original_search_term(&self) -> Option<&str> {
        self.original_search_term.as_deref()
    }

    /// Warnings are reported to the user and do not mark the context dirty
    pub fn add_warning(&mut self, warning: ParseWarning) {
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    fn resolve_profile(&self, kind: ProfileKind) -> String {
        let name = self.profiles.profile_name(
            kind,
            &self.config.profile_context,
            &self.config.profile_context_params,
        );
        search_log!(
            debug,
            "SearchContext",
            self.config.profile_context,
            "{:?} profile resolved to '{}'",
            kind,
            name
        );
        name
    }

    /// Rescore profile name, resolved from the profile service on first use
    pub fn rescore_profile(&self) -> String {
        self.rescore_profile
            .get_or_init(|| self.resolve_profile(ProfileKind::Rescore))
            .clone()
    }

    pub fn set_rescore_profile<S: Into<String>>(&mut self, profile: S) {
        self.dirty = true;
        self.rescore_profile = OnceCell::with_value(profile.into());
    }

    /// Full-text query builder profile name, resolved on first use
    pub fn fulltext_query_builder_profile(&self) -> String {
        self.fulltext_profile
            .get_or_init(|| self.resolve_profile(ProfileKind::FulltextQueryBuilder))
            .clone()
    }

    pub fn set_fulltext_query_builder_profile<S: Into<String>>(&mut self, profile: S) {
        self.dirty = true;
        self.fulltext_profile = OnceCell::with_value(profile.into());
    }

    /// Assemble the composite query from the current state. Recomputed on
    /// every call, filters may still be added after a first read.
    pub fn query(&self) -> QueryExpr {
        let base = if self.non_text_queries.is_empty() {
            self.main_query.clone().unwrap_or(QueryExpr::MatchAll)
        } else {
            let mut bool_query = BoolQuery::new();
            if let Some(main) = &self.main_query {
                bool_query.add_must(main.clone());
            }
            for query in &self.non_text_queries {
                bool_query.add_must(query.clone());
            }
            bool_query.build()
        };

        let mut filters = self.filters.clone();
        if let Some(namespaces) = &self.namespaces {
            filters.push(QueryExpr::terms(
                self.config.namespace_field.clone(),
                namespaces.iter().copied(),
            ));
        }

        let Some(unified) = filters::unify(&filters, &self.not_filters) else {
            return base;
        };
        let mut bool_query = match base {
            // Next to a filter, should clauses without a must stop being
            // required, so an OR main query keeps its own bool.
            QueryExpr::Bool(bool_query)
                if bool_query.should.is_empty()
                    || !bool_query.must.is_empty()
                    || !bool_query.filter.is_empty() =>
            {
                bool_query
            }
            other => BoolQuery::new().must(other),
        };
        bool_query.add_filter(unified);
        let query = bool_query.build();
        search_log!(trace, "SearchContext", query, "assembled composite query");
        query
    }

    /// Query narrowing what gets highlighted: the highlight query alone, or
    /// a `should` over it and every non-text highlight query
    fn highlight_query(&self) -> Option<QueryExpr> {
        if self.non_text_highlight_queries.is_empty() {
            return self.highlight_query.clone();
        }
        let mut bool_query = BoolQuery::new();
        if let Some(query) = &self.highlight_query {
            bool_query.add_should(query.clone());
        }
        for query in &self.non_text_highlight_queries {
            bool_query.add_should(query.clone());
        }
        Some(bool_query.build())
    }

    /// Highlighting section for `results_type`, `None` when it needs none
    pub fn highlight(&self, results_type: &dyn ResultsType) -> Option<Highlight> {
        let config = results_type.highlighting_configuration(&self.extra_highlight_fields)?;
        if config.is_empty() {
            return None;
        }
        Some(Highlight {
            config,
            highlight_query: self.highlight_query(),
        })
    }

    /// Rescoring chain, in the order the stages apply
    pub fn rescore(&self, builder: &dyn RescoreBuilder) -> Vec<Rescore> {
        builder.build(self)
    }

    /// Suggestion section: the configured suggester run against the search
    /// text wrapped in the suggest prefixes and suffixes
    pub fn suggest_section(&self) -> Option<Value> {
        let suggest = self.suggest.as_ref()?;
        let text = format!(
            "{}{}{}",
            self.suggest_prefixes.concat(),
            self.search_text.as_deref().unwrap_or_default(),
            self.suggest_suffixes.concat()
        );
        Some(json!({ "text": text, "suggest": suggest }))
    }

    /// The whole request body handed to the search client
    pub fn to_request(
        &self,
        results_type: &dyn ResultsType,
        rescore_builder: &dyn RescoreBuilder,
    ) -> Value {
        let mut request = Map::new();
        request.insert("query".into(), self.query().to_json());
        let rescore = self.rescore(rescore_builder);
        if !rescore.is_empty() {
            request.insert("rescore".into(), json!(rescore));
        }
        if let Some(highlight) = self.highlight(results_type) {
            request.insert("highlight".into(), json!(highlight));
        }
        if !self.aggregations.is_empty() {
            request.insert("aggs".into(), aggregations_to_json(&self.aggregations));
        }
        if let Some(suggest) = self.suggest_section() {
            request.insert("suggest".into(), suggest);
        }
        Value::Object(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::profile::StaticProfileService;
    use crate::search::results::{FieldsResultsType, NoHighlightResultsType};

    fn context() -> SearchContext {
        SearchContext::new(
            Arc::new(SearchConfig::default()),
            Arc::new(
                StaticProfileService::new()
                    .with_fallback(ProfileKind::Rescore, "classic")
                    .with_profile(ProfileKind::FulltextQueryBuilder, "default", "perfield"),
            ),
        )
    }

    fn term(n: i64) -> QueryExpr {
        QueryExpr::term("f", n)
    }

    #[test]
    fn test_fresh_context_is_clean() {
        assert!(!context().is_dirty());
    }

    #[test]
    fn test_dirtying_mutations() {
        let mutations: Vec<(&str, Box<dyn Fn(&mut SearchContext)>)> = vec![
            ("add_filter", Box::new(|c: &mut SearchContext| c.add_filter(term(1)))),
            ("set_main_query", Box::new(|c: &mut SearchContext| c.set_main_query(term(1)))),
            ("add_syntax_used", Box::new(|c: &mut SearchContext| c.add_syntax_used("regex", 1))),
            ("set_cache_ttl", Box::new(|c: &mut SearchContext| c.set_cache_ttl(60))),
            ("set_namespaces", Box::new(|c: &mut SearchContext| c.set_namespaces(Some([0].into())))),
            (
                "add_aggregation",
                Box::new(|c: &mut SearchContext| c.add_aggregation(Aggregation::new("a", json!({})))),
            ),
            ("add_not_filter", Box::new(|c: &mut SearchContext| c.add_not_filter(term(1)))),
            ("add_suggest_suffix", Box::new(|c: &mut SearchContext| c.add_suggest_suffix("s"))),
            ("set_rescore_profile", Box::new(|c: &mut SearchContext| c.set_rescore_profile("p"))),
        ];
        for (name, mutate) in mutations {
            let mut context = context();
            mutate(&mut context);
            assert!(context.is_dirty(), "{} did not mark the context dirty", name);
        }
    }

    #[test]
    fn test_exempt_mutations() {
        let mut context = context();
        context.add_suggest_prefix("prefix");
        context.set_original_search_term("Foo");
        context.add_warning(ParseWarning::new("w", vec![]));
        assert!(!context.is_dirty());
        assert_eq!(context.suggest_prefixes(), ["prefix"]);
        assert_eq!(context.original_search_term(), Some("Foo"));
    }

    #[test]
    fn test_empty_query_matches_all() {
        assert_eq!(context().query(), QueryExpr::MatchAll);
    }

    #[test]
    fn test_single_filter_without_main_query() {
        let mut context = context();
        context.add_filter(term(1));
        assert_eq!(
            context.query(),
            BoolQuery::new()
                .must(QueryExpr::MatchAll)
                .filter(term(1))
                .build()
        );
    }

    #[test]
    fn test_main_query_without_filters_is_unwrapped() {
        let mut context = context();
        context.set_main_query(QueryExpr::matches("all", "foo"));
        assert_eq!(context.query(), QueryExpr::matches("all", "foo"));
    }

    #[test]
    fn test_non_text_queries_are_anded() {
        let mut context = context();
        context.set_main_query(term(1));
        context.add_non_text_query(term(2));
        context.add_non_text_query(term(3));
        assert_eq!(
            context.query(),
            BoolQuery::new()
                .must(term(1))
                .must(term(2))
                .must(term(3))
                .build()
        );
    }

    #[test]
    fn test_bool_main_query_receives_filter_directly() {
        let mut context = context();
        context.set_main_query(BoolQuery::new().must(term(1)).should(term(2)).build());
        context.add_not_filter(term(9));
        assert_eq!(
            context.query(),
            BoolQuery::new()
                .must(term(1))
                .should(term(2))
                .filter(BoolQuery::new().must_not(term(9)).build())
                .build()
        );
    }

    #[test]
    fn test_should_only_main_query_stays_required_under_filter() {
        let mut context = context();
        let either = BoolQuery::new().should(term(1)).should(term(2)).build();
        context.set_main_query(either.clone());
        context.add_filter(term(9));
        assert_eq!(
            context.query(),
            BoolQuery::new().must(either).filter(term(9)).build()
        );
    }

    #[test]
    fn test_empty_namespace_set_is_unrestricted() {
        let mut context = context();
        context.set_namespaces(Some(BTreeSet::new()));
        assert!(context.is_dirty());
        assert_eq!(context.namespaces(), None);
        assert_eq!(context.query(), QueryExpr::MatchAll);
    }

    #[test]
    fn test_namespaces_join_filters() {
        let mut context = context();
        context.add_filter(term(1));
        context.set_namespaces(Some([0, 14].into()));
        context.add_not_filter(term(2));
        let QueryExpr::Bool(outer) = context.query() else {
            panic!("expected bool");
        };
        assert_eq!(outer.must, vec![QueryExpr::MatchAll]);
        assert_eq!(
            outer.filter,
            vec![BoolQuery::new()
                .must(term(1))
                .must(QueryExpr::terms("namespace", [0, 14]))
                .must_not(term(2))
                .build()]
        );
    }

    #[test]
    fn test_query_is_recomputed() {
        let mut context = context();
        assert_eq!(context.query(), QueryExpr::MatchAll);
        context.add_filter(term(1));
        assert!(context.query().is_bool());
    }

    #[test]
    fn test_search_type() {
        let mut context = context();
        assert_eq!(context.search_type(), "full_text");
        context.add_syntax_used("full_text", DEFAULT_SYNTAX_WEIGHT);
        context.add_syntax_used("regex", u64::MAX);
        assert_eq!(context.search_type(), "regex");
    }

    #[test]
    fn test_search_type_ties_keep_first() {
        let mut context = context();
        context.add_syntax_used("intitle", 10);
        context.add_syntax_used("incategory", 10);
        assert_eq!(context.search_type(), "intitle");
        context.add_syntax_used("intitle", 5);
        assert_eq!(context.search_type(), "incategory");
        assert_eq!(
            context.syntax_used().collect::<Vec<_>>(),
            vec!["intitle", "incategory"]
        );
        assert!(context.is_syntax_used("intitle"));
    }

    #[test]
    fn test_profiles_resolve_lazily_and_can_be_overridden() {
        let mut context = context();
        assert_eq!(context.rescore_profile(), "classic");
        assert_eq!(context.fulltext_query_builder_profile(), "perfield");
        assert!(!context.is_dirty());
        context.set_rescore_profile("empty");
        assert_eq!(context.rescore_profile(), "empty");
        assert!(context.is_dirty());
    }

    #[test]
    fn test_highlight() {
        let mut context = context();
        assert!(context.highlight(&NoHighlightResultsType).is_none());

        let results = FieldsResultsType::new(["title"]);
        let highlight = context.highlight(&results).unwrap();
        assert_eq!(highlight.highlight_query, None);

        context.set_highlight_query(term(1));
        assert_eq!(context.highlight(&results).unwrap().highlight_query, Some(term(1)));

        context.add_non_text_highlight_query(term(2));
        assert_eq!(
            context.highlight(&results).unwrap().highlight_query,
            Some(BoolQuery::new().should(term(1)).should(term(2)).build())
        );
    }

    #[test]
    fn test_highlight_fields_reach_results_type() {
        let mut context = context();
        context.add_highlight_field("heading", json!({ "number_of_fragments": 2 }));
        let highlight = context.highlight(&FieldsResultsType::new(["title"])).unwrap();
        assert_eq!(highlight.config["fields"]["heading"]["number_of_fragments"], 2);
    }

    #[test]
    fn test_with_config_copies_state() {
        let mut context = context();
        context.set_main_query(term(1));
        context.add_filter(term(2));
        let other = context.with_config(Arc::new(SearchConfig {
            namespace_field: "ns".into(),
            ..SearchConfig::default()
        }));
        context.set_main_query(term(3));

        assert_eq!(other.main_query(), Some(&term(1)));
        assert_eq!(other.filters(), [term(2)]);
        assert_eq!(other.config().namespace_field, "ns");
        assert!(other.is_dirty());
    }

    #[test]
    fn test_suggest_section() {
        let mut context = context();
        assert!(context.suggest_section().is_none());
        context.set_search_text("foo");
        context.add_suggest_prefix("intitle:");
        context.add_suggest_suffix("~");
        context.set_suggest(json!({ "phrase": { "field": "suggest" } }));
        let section = context.suggest_section().unwrap();
        assert_eq!(section["text"], "intitle:foo~");
        assert_eq!(section["suggest"]["phrase"]["field"], "suggest");
    }
}
