use crate::{
    ast::{
        BooleanClause, FuzzyNode, KeywordNode, NegatedNode, Occur, PhraseNode, PhrasePrefixNode,
        PrefixNode, Visitor, WildcardNode, WordsNode,
    },
    classify::Classifier,
    query::ParsedQuery,
};

/// Only plain words, combined without explicit operators
pub const SIMPLE_BAG_OF_WORDS: &str = "simple_bag_of_words";
/// A single quoted phrase and nothing else
pub const SIMPLE_PHRASE: &str = "simple_phrase";
/// Plain words and quoted phrases, combined without explicit operators
pub const BAG_OF_WORDS_WITH_PHRASE: &str = "bag_of_words_with_phrase";
/// Anything using operators, negation, wildcards or keywords
pub const COMPLEX_QUERY: &str = "complex_query";
/// The parser had to recover from errors
pub const BOGUS_QUERY: &str = "bogus_query";

pub const CLASSES: [&str; 5] = [
    SIMPLE_BAG_OF_WORDS,
    SIMPLE_PHRASE,
    BAG_OF_WORDS_WITH_PHRASE,
    COMPLEX_QUERY,
    BOGUS_QUERY,
];

/// Sorts a query into one of the mutually exclusive shape classes above.
/// An empty query gets no class at all.
#[derive(Debug, Default)]
pub struct BasicQueryClassifier;

#[derive(Default)]
struct ShapeCollector {
    words: usize,
    phrases: usize,
    complex: bool,
}

impl Visitor for ShapeCollector {
    fn visit_clause(&mut self, clause: &BooleanClause) {
        if clause.explicit || clause.occur == Occur::MustNot {
            self.complex = true;
        }
    }

    fn visit_words(&mut self, _node: &WordsNode) {
        self.words += 1;
    }

    fn visit_phrase(&mut self, node: &PhraseNode) {
        if node.slop.is_some() || node.stem {
            self.complex = true;
        }
        self.phrases += 1;
    }

    fn visit_phrase_prefix(&mut self, _node: &PhrasePrefixNode) {
        self.complex = true;
    }

    fn visit_prefix(&mut self, _node: &PrefixNode) {
        self.complex = true;
    }

    fn visit_fuzzy(&mut self, _node: &FuzzyNode) {
        self.complex = true;
    }

    fn visit_wildcard(&mut self, _node: &WildcardNode) {
        self.complex = true;
    }

    fn visit_negated(&mut self, _node: &NegatedNode) {
        self.complex = true;
    }

    fn visit_keyword(&mut self, _node: &KeywordNode) {
        self.complex = true;
    }
}

impl Classifier for BasicQueryClassifier {
    fn classes(&self) -> Vec<String> {
        CLASSES.iter().map(|c| c.to_string()).collect()
    }

    fn classify(&self, query: &ParsedQuery) -> Vec<String> {
        if !query.parse_warnings().is_empty() {
            return vec![BOGUS_QUERY.to_string()];
        }
        let mut shape = ShapeCollector::default();
        query.root().accept(&mut shape);

        let class = if shape.complex {
            Some(COMPLEX_QUERY)
        } else if shape.words > 0 && shape.phrases > 0 {
            Some(BAG_OF_WORDS_WITH_PHRASE)
        } else if shape.words > 0 {
            Some(SIMPLE_BAG_OF_WORDS)
        } else if shape.phrases == 1 {
            Some(SIMPLE_PHRASE)
        } else if shape.phrases > 1 {
            Some(BAG_OF_WORDS_WITH_PHRASE)
        } else {
            None
        };
        class.into_iter().map(str::to_string).collect()
    }
}
