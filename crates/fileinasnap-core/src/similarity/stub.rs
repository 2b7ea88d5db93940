use super::{Excerpt, SimilarityOracle};
use crate::error::Error;
use ahash::{AHashMap, AHashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Deterministic collaborator keyed on unordered file-name pairs.
pub struct StubOracle {
    scores: AHashMap<(String, String), f64>,
    failures: AHashSet<(String, String)>,
    default_score: f64,
    calls: AtomicUsize,
}

impl StubOracle {
    pub fn new(default_score: f64) -> Self {
        Self {
            scores: AHashMap::new(),
            failures: AHashSet::new(),
            default_score,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_score(mut self, a: &str, b: &str, score: f64) -> Self {
        self.scores.insert(pair_key(a, b), score);
        self
    }

    pub fn with_failure(mut self, a: &str, b: &str) -> Self {
        self.failures.insert(pair_key(a, b));
        self
    }

    /// Number of comparisons requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl SimilarityOracle for StubOracle {
    fn name(&self) -> &str {
        "stub"
    }

    fn compare(&self, a: &Excerpt<'_>, b: &Excerpt<'_>) -> Result<f64, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let key = pair_key(a.name, b.name);
        if self.failures.contains(&key) {
            return Err(Error::Collaborator(format!(
                "stubbed failure for '{}' and '{}'",
                a.name, b.name
            )));
        }
        Ok(self.scores.get(&key).copied().unwrap_or(self.default_score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn excerpt(name: &str) -> Excerpt<'_> {
        Excerpt { name, text: "" }
    }

    #[test]
    fn test_stub_scores_are_unordered() {
        let oracle = StubOracle::new(0.1).with_score("b.txt", "a.txt", 0.95);
        assert_eq!(oracle.compare(&excerpt("a.txt"), &excerpt("b.txt")).unwrap(), 0.95);
        assert_eq!(oracle.compare(&excerpt("b.txt"), &excerpt("a.txt")).unwrap(), 0.95);
        assert_eq!(oracle.compare(&excerpt("a.txt"), &excerpt("c.txt")).unwrap(), 0.1);
        assert_eq!(oracle.calls(), 3);
    }

    #[test]
    fn test_stub_failure() {
        let oracle = StubOracle::new(1.0).with_failure("a", "b");
        assert!(matches!(
            oracle.compare(&excerpt("b"), &excerpt("a")),
            Err(Error::Collaborator(_))
        ));
    }
}
