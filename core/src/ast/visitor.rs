use crate::ast::{
    BooleanClause, BooleanNode, EmptyNode, FuzzyNode, KeywordNode, NegatedNode, PhraseNode,
    PhrasePrefixNode, PrefixNode, WildcardNode, WordsNode,
};

/// Hooks invoked by [`crate::ast::Node::accept`], one per node kind.
///
/// Every hook defaults to doing nothing, so an implementation only overrides
/// the kinds it folds over. Recursion into children is driven by `accept`,
/// not by the hooks. Accumulator state lives on the visitor and belongs to a
/// single walk.
pub trait Visitor {
    fn visit_boolean(&mut self, _node: &BooleanNode) {}
    fn visit_clause(&mut self, _clause: &BooleanClause) {}
    fn visit_words(&mut self, _node: &WordsNode) {}
    fn visit_phrase(&mut self, _node: &PhraseNode) {}
    fn visit_phrase_prefix(&mut self, _node: &PhrasePrefixNode) {}
    fn visit_prefix(&mut self, _node: &PrefixNode) {}
    fn visit_fuzzy(&mut self, _node: &FuzzyNode) {}
    fn visit_wildcard(&mut self, _node: &WildcardNode) {}
    fn visit_negated(&mut self, _node: &NegatedNode) {}
    fn visit_empty(&mut self, _node: &EmptyNode) {}
    fn visit_keyword(&mut self, _node: &KeywordNode) {}
}
