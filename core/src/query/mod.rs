//! The result of parsing one search expression.
//!
//! [`ParsedQuery`] is immutable once built. Three derived views are computed
//! on first use and cached for the life of the query: class membership,
//! the cross-search strategy and the set of keyword features used. The tree
//! never changes, so each view is computed at most once per label/query and
//! the caches are safe to share between threads.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde_json::{json, Map, Value};

use crate::{
    ast::{KeywordNode, Node, ParseWarning, Visitor},
    classify::ClassifierRepository,
    keyword::CrossSearchStrategy,
    search_log, QueryError, Result,
};

pub mod namespaces;

pub use namespaces::{QueryCleanup, RequiredNamespaces};

#[derive(Debug)]
pub struct ParsedQuery {
    root: Node,
    /// Query text after cleanups, the text the tree's offsets refer to
    query: String,
    raw_query: String,
    cleanups: BTreeSet<QueryCleanup>,
    warnings: Vec<ParseWarning>,
    required_namespaces: RequiredNamespaces,
    repository: Arc<ClassifierRepository>,
    classes: RwLock<HashMap<String, bool>>,
    /// Asserted labels per classifier, by repository position
    runs: Vec<OnceCell<Vec<String>>>,
    strategy: OnceCell<CrossSearchStrategy>,
    features: OnceCell<BTreeSet<String>>,
}

/// Assembles a [`ParsedQuery`]; used by the query parser
pub struct ParsedQueryBuilder {
    root: Node,
    raw_query: String,
    query: Option<String>,
    cleanups: BTreeSet<QueryCleanup>,
    warnings: Vec<ParseWarning>,
    required_namespaces: RequiredNamespaces,
    repository: Option<Arc<ClassifierRepository>>,
}

impl ParsedQueryBuilder {
    /// Cleaned query text, defaults to the raw text
    pub fn query<S: Into<String>>(mut self, query: S) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn cleanup(mut self, cleanup: QueryCleanup) -> Self {
        self.cleanups.insert(cleanup);
        self
    }

    pub fn warnings(mut self, warnings: Vec<ParseWarning>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn required_namespaces(mut self, namespaces: RequiredNamespaces) -> Self {
        self.required_namespaces = namespaces;
        self
    }

    pub fn repository(mut self, repository: Arc<ClassifierRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn build(self) -> Result<ParsedQuery> {
        let query = self.query.unwrap_or_else(|| self.raw_query.clone());
        if !self.cleanups.is_empty() && query == self.raw_query {
            return Err(QueryError::MalformedParameter(format!(
                "query cleanups {:?} reported but the query text is unchanged",
                self.cleanups
            )));
        }
        let repository = self
            .repository
            .unwrap_or_else(|| Arc::new(ClassifierRepository::with_defaults()));
        let runs = repository
            .classifiers()
            .iter()
            .map(|_| OnceCell::new())
            .collect();
        Ok(ParsedQuery {
            root: self.root,
            query,
            raw_query: self.raw_query,
            cleanups: self.cleanups,
            warnings: self.warnings,
            required_namespaces: self.required_namespaces,
            repository,
            classes: RwLock::new(HashMap::new()),
            runs,
            strategy: OnceCell::new(),
            features: OnceCell::new(),
        })
    }
}

struct StrategyCollector {
    strategy: CrossSearchStrategy,
}

impl Visitor for StrategyCollector {
    fn visit_keyword(&mut self, node: &KeywordNode) {
        self.strategy = self
            .strategy
            .intersect(&node.feature.cross_search_strategy(node));
    }
}

#[derive(Default)]
struct FeatureCollector {
    features: BTreeSet<String>,
}

impl Visitor for FeatureCollector {
    fn visit_keyword(&mut self, node: &KeywordNode) {
        self.features.insert(node.feature_name());
    }
}

impl ParsedQuery {
    pub fn builder<S: Into<String>>(root: Node, raw_query: S) -> ParsedQueryBuilder {
        ParsedQueryBuilder {
            root,
            raw_query: raw_query.into(),
            query: None,
            cleanups: BTreeSet::new(),
            warnings: Vec::new(),
            required_namespaces: RequiredNamespaces::none(),
            repository: None,
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn raw_query(&self) -> &str {
        &self.raw_query
    }

    pub fn cleanups(&self) -> &BTreeSet<QueryCleanup> {
        &self.cleanups
    }

    pub fn has_cleanup(&self, cleanup: QueryCleanup) -> bool {
        self.cleanups.contains(&cleanup)
    }

    pub fn parse_warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    pub fn required_namespaces(&self) -> &RequiredNamespaces {
        &self.required_namespaces
    }

    /// Whether the query belongs to `class`. The owning classifier runs at
    /// most once and its answer for every label it owns is cached.
    pub fn is_query_of_class(&self, class: &str) -> Result<bool> {
        if let Some(member) = self.classes.read().get(class) {
            return Ok(*member);
        }
        self.load_query_class(class)?;
        self.classes
            .read()
            .get(class)
            .copied()
            .ok_or_else(|| QueryError::UnknownClassifier(class.to_string()))
    }

    fn load_query_class(&self, class: &str) -> Result<()> {
        let index = self.repository.owner_index(class)?;
        let classifier = &self.repository.classifiers()[index];
        let owned = classifier.classes();
        // Racing callers wait on the cell, the classifier runs once. The cache
        // lock is not held, so it may ask this query about other classes.
        let asserted = self.runs[index].get_or_init(|| {
            let asserted = classifier.classify(self);
            search_log!(
                debug,
                "ParsedQuery",
                self.query,
                "classifier for '{}' asserted {:?}",
                class,
                asserted
            );
            if let Some(stray) = asserted.iter().find(|c| !owned.contains(*c)) {
                search_log!(
                    warn,
                    "ParsedQuery",
                    self.query,
                    "classifier asserted class '{}' it does not own, ignoring",
                    stray
                );
            }
            asserted
        });

        let mut classes = self.classes.write();
        for label in owned {
            let member = asserted.contains(&label);
            classes.entry(label).or_insert(member);
        }
        Ok(())
    }

    /// Run every registered classifier that has not run yet
    pub fn preload_query_classes(&self) -> Result<()> {
        for classifier in self.repository.classifiers() {
            if let Some(first) = classifier.classes().first() {
                self.is_query_of_class(first)?;
            }
        }
        Ok(())
    }

    /// The narrowest strategy any keyword in the query allows, or
    /// [`CrossSearchStrategy::all_wikis`] when there are no keywords.
    pub fn cross_search_strategy(&self) -> CrossSearchStrategy {
        *self.strategy.get_or_init(|| {
            let mut collector = StrategyCollector {
                strategy: CrossSearchStrategy::all_wikis(),
            };
            self.root.accept(&mut collector);
            search_log!(
                debug,
                "ParsedQuery",
                self.query,
                "cross search strategy: {}",
                collector.strategy
            );
            collector.strategy
        })
    }

    /// Canonical names of the keyword features used, deduplicated
    pub fn features_used(&self) -> &BTreeSet<String> {
        self.features.get_or_init(|| {
            let mut collector = FeatureCollector::default();
            self.root.accept(&mut collector);
            collector.features
        })
    }

    /// Debug form used in diagnostics and snapshot tests. Class membership
    /// only lists the classes computed so far, call
    /// [`ParsedQuery::preload_query_classes`] first for the full picture.
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert("query".into(), json!(self.query));
        out.insert("rawQuery".into(), json!(self.raw_query));
        if !self.required_namespaces.is_empty() {
            out.insert(
                "requiredNamespaces".into(),
                self.required_namespaces.to_json(),
            );
        }
        if !self.cleanups.is_empty() {
            out.insert("queryCleanups".into(), json!(self.cleanups));
        }
        let classes: BTreeMap<String, bool> = self
            .classes
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        if !classes.is_empty() {
            out.insert("queryClasses".into(), json!(classes));
        }
        if !self.warnings.is_empty() {
            out.insert("warnings".into(), json!(self.warnings));
        }
        let features = self.features_used();
        if !features.is_empty() {
            out.insert("featuresUsed".into(), json!(features));
        }
        out.insert("root".into(), self.root.to_json());
        Value::Object(out)
    }
}
