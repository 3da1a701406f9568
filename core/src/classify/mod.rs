//! Query classification: named class labels computed by pluggable classifiers.
//!
//! A classifier owns a fixed set of labels and, given a parsed query, returns
//! the subset that applies. The repository maps every label to its single
//! owner so [`crate::query::ParsedQuery`] can resolve and cache them lazily.

use std::{collections::HashMap, fmt::Debug, sync::Arc};

use crate::{query::ParsedQuery, search_log, QueryError, Result};

pub mod basic;

pub use basic::BasicQueryClassifier;

pub trait Classifier: Debug + Send + Sync {
    /// Every label this classifier can assert
    fn classes(&self) -> Vec<String>;

    /// The labels from [`Classifier::classes`] that apply to `query`.
    /// May ask `query` about labels of other classifiers, never its own.
    fn classify(&self, query: &ParsedQuery) -> Vec<String>;
}

/// Maps class labels to the classifier that owns them
#[derive(Debug, Default)]
pub struct ClassifierRepository {
    /// Label to the owner's position in `classifiers`
    owners: HashMap<String, usize>,
    classifiers: Vec<Arc<dyn Classifier>>,
}

impl ClassifierRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository holding the built-in classifiers
    pub fn with_defaults() -> Self {
        let mut repository = Self::new();
        // Cannot collide on an empty repository.
        let _ = repository.register(Arc::new(BasicQueryClassifier));
        repository
    }

    /// Register a classifier for all of its labels. Fails without changing
    /// the repository if any label already has an owner.
    pub fn register(&mut self, classifier: Arc<dyn Classifier>) -> Result<()> {
        let classes = classifier.classes();
        if let Some(taken) = classes.iter().find(|c| self.owners.contains_key(*c)) {
            return Err(QueryError::MalformedParameter(format!(
                "class '{}' is already owned by another classifier",
                taken
            )));
        }
        search_log!(
            debug,
            "ClassifierRepository",
            classes.join(","),
            "registered classifier {:?}",
            classifier
        );
        let index = self.classifiers.len();
        for class in classes {
            self.owners.insert(class, index);
        }
        self.classifiers.push(classifier);
        Ok(())
    }

    /// The classifier owning `class`
    pub fn get(&self, class: &str) -> Result<Arc<dyn Classifier>> {
        let index = self.owner_index(class)?;
        Ok(self.classifiers[index].clone())
    }

    /// Position of the classifier owning `class` in [`ClassifierRepository::classifiers`]
    pub fn owner_index(&self, class: &str) -> Result<usize> {
        self.owners
            .get(class)
            .copied()
            .ok_or_else(|| QueryError::UnknownClassifier(class.to_string()))
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.owners.contains_key(class)
    }

    /// Registered classifiers, in registration order
    pub fn classifiers(&self) -> &[Arc<dyn Classifier>] {
        &self.classifiers
    }

    /// Every known label, sorted
    pub fn classes(&self) -> Vec<String> {
        let mut classes: Vec<String> = self.owners.keys().cloned().collect();
        classes.sort();
        classes
    }
}
