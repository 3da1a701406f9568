use std::sync::Arc;

use wikisearch_dsl::{BoolQuery, QueryExpr};

use crate::{
    ast::{KeywordNode, Node, Occur},
    builder::FullTextQueryBuilder,
    config::SearchConfig,
    query::{ParsedQuery, RequiredNamespaces},
    search::{SearchContext, DEFAULT_SYNTAX_WEIGHT, FULL_TEXT_SEARCH_TYPE},
    search_log, QueryError, Result,
};

pub static PHRASE_SYNTAX: &str = "phrase";
pub static PHRASE_PREFIX_SYNTAX: &str = "phrase_prefix";
pub static PREFIX_SYNTAX: &str = "prefix";
pub static FUZZY_SYNTAX: &str = "fuzzy";
pub static WILDCARD_SYNTAX: &str = "wildcard";

///
/// AstQueryBuilder compiles the parsed query tree into a search context:
/// 1. Rejects query text longer than the configured maximum
/// 2. Walks the tree, turning text nodes into query expressions and keyword
///    nodes into filters (or exclusions when negated)
/// 3. Sets the main and highlight queries, the phrase rescore query built
///    from the plain words, and the syntax used
///
/// Keywords always filter the whole result set, whatever boolean clause
/// they appear in.
///
#[derive(Debug, Default, Clone, Copy)]
pub struct AstQueryBuilder;

/// State of one compilation pass
struct Compilation<'c> {
    config: Arc<SearchConfig>,
    context: &'c mut SearchContext,
    words: Vec<String>,
}

impl<'c> Compilation<'c> {
    /// Compile `node` into a query expression. `negated` is true under an odd
    /// number of negations, `top_level` while every enclosing clause is a
    /// required clause of the root.
    fn compile(&mut self, node: &Node, negated: bool, top_level: bool) -> Option<QueryExpr> {
        let config = self.config.clone();
        match node {
            Node::Boolean(node) => {
                let mut bool_query = BoolQuery::new();
                for clause in &node.clauses {
                    let must_not = clause.occur == Occur::MustNot;
                    let top_level = top_level && clause.occur == Occur::Must;
                    let Some(expr) = self.compile(&clause.node, negated ^ must_not, top_level)
                    else {
                        continue;
                    };
                    match clause.occur {
                        Occur::Must => bool_query.add_must(expr),
                        Occur::Should => bool_query.add_should(expr),
                        Occur::MustNot => bool_query.add_must_not(expr),
                    }
                }
                if bool_query.is_empty() {
                    return None;
                }
                // A lone required clause needs no wrapper
                if bool_query.must.len() == 1
                    && bool_query.should.is_empty()
                    && bool_query.must_not.is_empty()
                {
                    return bool_query.must.pop();
                }
                Some(bool_query.build())
            }
            Node::Negated(node) => self
                .compile(&node.child, !negated, false)
                .map(QueryExpr::not),
            Node::Words(node) => {
                self.context
                    .add_syntax_used(FULL_TEXT_SEARCH_TYPE, DEFAULT_SYNTAX_WEIGHT);
                if !negated {
                    self.words
                        .extend(node.words.split_whitespace().map(str::to_string));
                }
                Some(QueryExpr::matches(config.all_field.clone(), node.words.clone()))
            }
            Node::Phrase(node) => {
                self.context
                    .add_syntax_used(PHRASE_SYNTAX, DEFAULT_SYNTAX_WEIGHT);
                // Unstemmed phrases search the plain subfield
                let field = if node.stem {
                    config.all_field.clone()
                } else {
                    format!("{}.plain", config.all_field)
                };
                Some(QueryExpr::phrase(field, node.phrase.clone(), node.slop.unwrap_or(0)))
            }
            Node::PhrasePrefix(node) => {
                self.context
                    .add_syntax_used(PHRASE_PREFIX_SYNTAX, DEFAULT_SYNTAX_WEIGHT);
                let expr = QueryExpr::MatchPhrasePrefix {
                    field: config.title_field.clone(),
                    text: node.phrase.clone(),
                };
                if top_level && !negated {
                    self.context.add_non_text_query(expr.clone());
                    self.context.add_non_text_highlight_query(expr);
                    None
                } else {
                    Some(expr)
                }
            }
            Node::Prefix(node) => {
                self.context
                    .add_syntax_used(PREFIX_SYNTAX, DEFAULT_SYNTAX_WEIGHT);
                Some(QueryExpr::Prefix {
                    field: config.all_field.clone(),
                    value: node.prefix.clone(),
                })
            }
            Node::Fuzzy(node) => {
                self.context
                    .add_syntax_used(FUZZY_SYNTAX, DEFAULT_SYNTAX_WEIGHT);
                Some(QueryExpr::Fuzzy {
                    field: config.all_field.clone(),
                    value: node.word.clone(),
                    fuzziness: node.fuzziness,
                })
            }
            Node::Wildcard(node) => {
                self.context
                    .add_syntax_used(WILDCARD_SYNTAX, DEFAULT_SYNTAX_WEIGHT);
                Some(QueryExpr::Wildcard {
                    field: config.all_field.clone(),
                    value: node.wildcard.clone(),
                })
            }
            Node::Keyword(node) => {
                self.apply_keyword(node, negated);
                None
            }
            Node::Empty(_) => None,
        }
    }

    fn apply_keyword(&mut self, node: &KeywordNode, negated: bool) {
        self.context
            .add_syntax_used(node.feature_name(), DEFAULT_SYNTAX_WEIGHT);
        if let Some(filter) = node.feature.filter(node, &self.config) {
            if negated {
                self.context.add_not_filter(filter);
            } else {
                self.context.add_filter(filter);
            }
        }
    }
}

impl FullTextQueryBuilder for AstQueryBuilder {
    fn build(&self, context: &mut SearchContext, query: &ParsedQuery) -> Result<()> {
        let config = context.config().clone();
        let length = query.raw_query().chars().count();
        if length > config.max_full_text_query_length {
            search_log!(
                warn,
                "AstQueryBuilder",
                query.raw_query(),
                "rejecting query of {} chars, max is {}",
                length,
                config.max_full_text_query_length
            );
            return Err(QueryError::OversizeInput {
                length,
                max: config.max_full_text_query_length,
            });
        }
        search_log!(
            debug,
            "AstQueryBuilder",
            query.query(),
            "building with full-text profile '{}'",
            context.fulltext_query_builder_profile()
        );

        context.set_original_search_term(query.raw_query());
        context.set_search_text(query.query());
        match query.required_namespaces() {
            RequiredNamespaces::All => context.set_namespaces(None),
            RequiredNamespaces::Explicit(ids) if !ids.is_empty() => {
                context.set_namespaces(Some(ids.clone()))
            }
            RequiredNamespaces::Explicit(_) => {}
        }
        for warning in query.parse_warnings() {
            context.add_warning(warning.clone());
        }
        if matches!(query.root(), Node::Empty(_)) {
            context.set_results_possible(false);
            return Ok(());
        }

        let mut compilation = Compilation {
            config: config.clone(),
            context: &mut *context,
            words: Vec::new(),
        };
        let main = compilation.compile(query.root(), false, true);
        let words = compilation.words;

        if let Some(main) = main {
            context.set_highlight_query(main.clone());
            context.set_main_query(main);
        }
        if words.len() > 1 {
            context.set_phrase_rescore_query(QueryExpr::phrase(
                config.all_field.clone(),
                words.join(" "),
                config.phrase_rescore_slop,
            ));
        }
        Ok(())
    }
}
