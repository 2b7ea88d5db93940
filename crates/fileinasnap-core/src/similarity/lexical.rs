use super::{CandidateSession, Excerpt, SimilarityOracle};
use crate::error::Error;
use ahash::AHashSet;
use rayon::prelude::*;

/// Offline collaborator: Jaccard index over lower-cased word tokens.
///
/// Falls back to comparing file-name tokens when neither excerpt carries any text.
#[derive(Debug, Default)]
pub struct LexicalOracle;

impl LexicalOracle {
    pub fn new() -> Self {
        Self
    }
}

impl SimilarityOracle for LexicalOracle {
    fn name(&self) -> &str {
        "lexical"
    }

    fn compare(&self, a: &Excerpt<'_>, b: &Excerpt<'_>) -> Result<f64, Error> {
        Ok(TokenSets::of(a).score(&TokenSets::of(b)))
    }

    /// Tokenizes every candidate once, so a scan costs one pass per file plus the set
    /// comparisons.
    fn session<'a>(&'a self, excerpts: Vec<Excerpt<'a>>) -> Box<dyn CandidateSession + 'a> {
        let prepared = excerpts.par_iter().map(TokenSets::of).collect();
        Box::new(LexicalSession { prepared })
    }
}

struct LexicalSession {
    prepared: Vec<TokenSets>,
}

impl CandidateSession for LexicalSession {
    fn compare(&self, a: usize, b: usize) -> Result<f64, Error> {
        Ok(self.prepared[a].score(&self.prepared[b]))
    }
}

struct TokenSets {
    text: AHashSet<String>,
    /// Only filled in for excerpts without text.
    name: Option<AHashSet<String>>,
}

impl TokenSets {
    fn of(excerpt: &Excerpt<'_>) -> Self {
        let name = if excerpt.text.trim().is_empty() {
            Some(tokens(excerpt.name))
        } else {
            None
        };
        Self {
            text: tokens(excerpt.text),
            name,
        }
    }

    fn score(&self, other: &TokenSets) -> f64 {
        match (&self.name, &other.name) {
            (Some(a), Some(b)) => jaccard(a, b),
            _ => jaccard(&self.text, &other.text),
        }
    }
}

fn tokens(text: &str) -> AHashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// |A ∩ B| / |A ∪ B|; two empty sets score 0.
pub fn jaccard(set_a: &AHashSet<String>, set_b: &AHashSet<String>) -> f64 {
    let union_size = set_a.union(set_b).count();
    if union_size == 0 {
        return 0.0;
    }
    let intersection_size = set_a.intersection(set_b).count();
    intersection_size as f64 / union_size as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compare(a: &str, b: &str) -> f64 {
        LexicalOracle::new()
            .compare(
                &Excerpt { name: "a.txt", text: a },
                &Excerpt { name: "b.txt", text: b },
            )
            .unwrap()
    }

    #[test]
    fn test_identical_text() {
        assert_eq!(compare("The quick brown fox", "the QUICK, brown fox!"), 1.0);
    }

    #[test]
    fn test_partial_overlap() {
        // {alpha, beta, gamma} vs {alpha, beta, delta}: 2 shared of 4
        assert_eq!(compare("alpha beta gamma", "alpha beta delta"), 0.5);
    }

    #[test]
    fn test_disjoint_text() {
        assert_eq!(compare("invoice total due", "holiday photos beach"), 0.0);
    }

    #[test]
    fn test_one_side_empty() {
        assert_eq!(compare("", "some words"), 0.0);
    }

    #[test]
    fn test_falls_back_to_names() {
        let score = LexicalOracle::new()
            .compare(
                &Excerpt { name: "tax_report_2023.csv", text: "" },
                &Excerpt { name: "tax_report_2024.csv", text: "  " },
            )
            .unwrap();
        // {tax, report, csv} shared, 2023 / 2024 differ: 3 of 5
        assert!((score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_session_matches_direct_compare() {
        let oracle = LexicalOracle::new();
        let excerpts = vec![
            Excerpt { name: "notes.txt", text: "alpha beta gamma" },
            Excerpt { name: "notes_copy.txt", text: "Alpha beta delta" },
            Excerpt { name: "tax_report_2023.csv", text: "" },
            Excerpt { name: "tax_report_2024.csv", text: " " },
        ];
        let session = oracle.session(excerpts.clone());

        for a in 0..excerpts.len() {
            for b in (a + 1)..excerpts.len() {
                let direct = oracle.compare(&excerpts[a], &excerpts[b]).unwrap();
                assert_eq!(session.compare(a, b).unwrap(), direct);
            }
        }
        assert_eq!(session.compare(0, 1).unwrap(), 0.5);
        assert!((session.compare(2, 3).unwrap() - 0.6).abs() < 1e-9);
    }
}
