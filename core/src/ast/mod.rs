//! The parsed query tree.
//!
//! Nodes are produced once by the query parser and never mutated afterwards.
//! Every node knows the character span of the query text it was parsed from.
//! Composite nodes ([`Node::Boolean`], [`Node::Negated`]) own their children,
//! [`Node::Keyword`] wraps a recognized keyword occurrence and is always a leaf.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::keyword::KeywordFeature;

pub mod visitor;

pub use visitor::Visitor;

/// Character offsets `[start, end)` of a node in the cleaned query text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }
}

/// How a clause takes part in its parent boolean node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Occur {
    Must,
    Should,
    MustNot,
}

/// Describes a node in the parsed query tree
#[derive(Debug, Clone)]
pub enum Node {
    Boolean(BooleanNode),
    Words(WordsNode),
    Phrase(PhraseNode),
    PhrasePrefix(PhrasePrefixNode),
    Prefix(PrefixNode),
    Fuzzy(FuzzyNode),
    Wildcard(WildcardNode),
    Negated(NegatedNode),
    Empty(EmptyNode),
    Keyword(KeywordNode),
}

#[derive(Debug, Clone)]
pub struct BooleanNode {
    pub span: Span,
    pub clauses: Vec<BooleanClause>,
}

#[derive(Debug, Clone)]
pub struct BooleanClause {
    pub occur: Occur,
    /// True when the user typed the operator (`AND`, `OR`, `-`, `!`)
    pub explicit: bool,
    pub node: Node,
}

/// One or more plain words
#[derive(Debug, Clone)]
pub struct WordsNode {
    pub span: Span,
    pub words: String,
}

/// A quoted phrase, optionally with a slop (`"foo bar"~2`) and stemming (`"foo"~`)
#[derive(Debug, Clone)]
pub struct PhraseNode {
    pub span: Span,
    pub phrase: String,
    pub slop: Option<u32>,
    pub stem: bool,
}

/// A quoted phrase ending with a wildcard: `"foo ba*"`
#[derive(Debug, Clone)]
pub struct PhrasePrefixNode {
    pub span: Span,
    pub phrase: String,
}

/// A word ending with a wildcard: `foo*`
#[derive(Debug, Clone)]
pub struct PrefixNode {
    pub span: Span,
    pub prefix: String,
}

/// A fuzzy word: `foo~` or `foo~1`
#[derive(Debug, Clone)]
pub struct FuzzyNode {
    pub span: Span,
    pub word: String,
    pub fuzziness: Option<u8>,
}

/// A word with inner wildcards: `f?o*bar`
#[derive(Debug, Clone)]
pub struct WildcardNode {
    pub span: Span,
    pub wildcard: String,
}

/// A negated child, `negation` is the operator used (`-`, `!`, `NOT`)
#[derive(Debug, Clone)]
pub struct NegatedNode {
    pub span: Span,
    pub child: Box<Node>,
    pub negation: String,
}

/// Nothing searchable was left after parsing
#[derive(Debug, Clone)]
pub struct EmptyNode {
    pub span: Span,
}

/// A recognized keyword occurrence such as `intitle:foo`.
///
/// The node references the feature that recognized it; features are shared
/// by every query the parser produces.
#[derive(Clone)]
pub struct KeywordNode {
    pub span: Span,
    pub key: String,
    pub delimiter: String,
    pub value: String,
    /// The value as typed, including quotes, when it was quoted
    pub quoted_value: Option<String>,
    pub feature: Arc<dyn KeywordFeature>,
}

impl KeywordNode {
    /// Canonical name of the feature used by this occurrence
    pub fn feature_name(&self) -> String {
        self.feature.feature_name(&self.key, &self.delimiter)
    }
}

impl fmt::Debug for KeywordNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeywordNode")
            .field("span", &self.span)
            .field("key", &self.key)
            .field("delimiter", &self.delimiter)
            .field("value", &self.value)
            .field("quoted_value", &self.quoted_value)
            .field("feature", &self.feature)
            .finish()
    }
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Boolean(node) => node.span,
            Node::Words(node) => node.span,
            Node::Phrase(node) => node.span,
            Node::PhrasePrefix(node) => node.span,
            Node::Prefix(node) => node.span,
            Node::Fuzzy(node) => node.span,
            Node::Wildcard(node) => node.span,
            Node::Negated(node) => node.span,
            Node::Empty(node) => node.span,
            Node::Keyword(node) => node.span,
        }
    }

    /// Type name used in the structural dump
    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Boolean(_) => "bool",
            Node::Words(_) => "word",
            Node::Phrase(_) => "phrase",
            Node::PhrasePrefix(_) => "phrase_prefix",
            Node::Prefix(_) => "prefix",
            Node::Fuzzy(_) => "fuzzy",
            Node::Wildcard(_) => "wildcard",
            Node::Negated(_) => "not",
            Node::Empty(_) => "empty",
            Node::Keyword(_) => "keyword",
        }
    }

    /// Walk the tree in pre-order: the node's own hook runs first, then its
    /// children in source order.
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            Node::Boolean(node) => {
                visitor.visit_boolean(node);
                for clause in &node.clauses {
                    visitor.visit_clause(clause);
                    clause.node.accept(visitor);
                }
            }
            Node::Negated(node) => {
                visitor.visit_negated(node);
                node.child.accept(visitor);
            }
            Node::Words(node) => visitor.visit_words(node),
            Node::Phrase(node) => visitor.visit_phrase(node),
            Node::PhrasePrefix(node) => visitor.visit_phrase_prefix(node),
            Node::Prefix(node) => visitor.visit_prefix(node),
            Node::Fuzzy(node) => visitor.visit_fuzzy(node),
            Node::Wildcard(node) => visitor.visit_wildcard(node),
            Node::Empty(node) => visitor.visit_empty(node),
            Node::Keyword(node) => visitor.visit_keyword(node),
        }
    }

    /// Structural dump: `{ "<type>": { "startOffset": .., "endOffset": .., ... } }`
    pub fn to_json(&self) -> Value {
        let span = self.span();
        let mut body = json!({
            "startOffset": span.start,
            "endOffset": span.end,
        });
        let extra = match self {
            Node::Boolean(node) => json!({
                "clauses": node.clauses.iter().map(|clause| json!({
                    "occur": clause.occur,
                    "explicit": clause.explicit,
                    "node": clause.node.to_json(),
                })).collect::<Vec<_>>(),
            }),
            Node::Words(node) => json!({ "word": node.words }),
            Node::Phrase(node) => json!({
                "phrase": node.phrase,
                "slop": node.slop,
                "stem": node.stem,
            }),
            Node::PhrasePrefix(node) => json!({ "phrase": node.phrase }),
            Node::Prefix(node) => json!({ "prefix": node.prefix }),
            Node::Fuzzy(node) => json!({ "word": node.word, "fuzziness": node.fuzziness }),
            Node::Wildcard(node) => json!({ "wildcard": node.wildcard }),
            Node::Negated(node) => json!({
                "child": node.child.to_json(),
                "negation_type": node.negation,
            }),
            Node::Empty(_) => json!({}),
            Node::Keyword(node) => json!({
                "feature": node.feature_name(),
                "key": node.key,
                "delimiter": node.delimiter,
                "value": node.value,
                "quotedValue": node.quoted_value,
            }),
        };
        if let (Some(body), Value::Object(extra)) = (body.as_object_mut(), extra) {
            body.extend(extra);
        }
        json!({ self.type_name(): body })
    }
}

/// A non-fatal problem found while parsing, reported back to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    /// Message key understood by the presentation layer
    pub message: String,
    pub params: Vec<String>,
}

impl ParseWarning {
    pub fn new<S: Into<String>>(message: S, params: Vec<String>) -> Self {
        ParseWarning {
            message: message.into(),
            params,
        }
    }
}
