use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Which cross-wiki execution modes a query supports.
///
/// Searching the host wiki is always supported. The three flags add the
/// secondary modes: sister projects, other-language wikis, and extra indices
/// configured next to the host index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrossSearchStrategy {
    pub cross_project: bool,
    pub cross_language: bool,
    pub extra_indices: bool,
}

impl CrossSearchStrategy {
    pub const fn new(cross_project: bool, cross_language: bool, extra_indices: bool) -> Self {
        CrossSearchStrategy {
            cross_project,
            cross_language,
            extra_indices,
        }
    }

    /// Supports every mode, the identity of [`CrossSearchStrategy::intersect`]
    pub const fn all_wikis() -> Self {
        Self::new(true, true, true)
    }

    /// Supports nothing beyond the host wiki
    pub const fn host_wiki_only() -> Self {
        Self::new(false, false, false)
    }

    /// Keep only the modes both strategies support
    pub fn intersect(&self, other: &CrossSearchStrategy) -> CrossSearchStrategy {
        CrossSearchStrategy {
            cross_project: self.cross_project && other.cross_project,
            cross_language: self.cross_language && other.cross_language,
            extra_indices: self.extra_indices && other.extra_indices,
        }
    }

    pub fn is_host_wiki_only(&self) -> bool {
        *self == Self::host_wiki_only()
    }

    /// True if every mode of `other` is also supported here
    pub fn covers(&self, other: &CrossSearchStrategy) -> bool {
        self.intersect(other) == *other
    }
}

impl Default for CrossSearchStrategy {
    fn default() -> Self {
        Self::all_wikis()
    }
}

impl Display for CrossSearchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cross_project={}, cross_language={}, extra_indices={}",
            self.cross_project, self.cross_language, self.extra_indices
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_strategy() -> impl Strategy<Value = CrossSearchStrategy> {
        (any::<bool>(), any::<bool>(), any::<bool>())
            .prop_map(|(p, l, e)| CrossSearchStrategy::new(p, l, e))
    }

    #[test]
    fn test_all_wikis_is_identity() {
        let strategy = CrossSearchStrategy::new(true, false, true);
        assert_eq!(CrossSearchStrategy::all_wikis().intersect(&strategy), strategy);
        assert_eq!(CrossSearchStrategy::default(), CrossSearchStrategy::all_wikis());
    }

    #[test]
    fn test_host_wiki_only_absorbs() {
        let strategy = CrossSearchStrategy::all_wikis();
        assert!(strategy
            .intersect(&CrossSearchStrategy::host_wiki_only())
            .is_host_wiki_only());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            CrossSearchStrategy::new(true, false, false).to_string(),
            "cross_project=true, cross_language=false, extra_indices=false"
        );
    }

    proptest! {
        #[test]
        fn prop_intersect_never_widens(a in any_strategy(), b in any_strategy()) {
            let narrowed = a.intersect(&b);
            prop_assert!(a.covers(&narrowed));
            prop_assert!(b.covers(&narrowed));
        }

        #[test]
        fn prop_intersect_commutative_associative(
            a in any_strategy(),
            b in any_strategy(),
            c in any_strategy(),
        ) {
            prop_assert_eq!(a.intersect(&b), b.intersect(&a));
            prop_assert_eq!(a.intersect(&b).intersect(&c), a.intersect(&b.intersect(&c)));
        }
    }
}
