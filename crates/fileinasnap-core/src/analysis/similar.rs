use crate::error::Error;
use crate::model::FileDescriptor;
use crate::progress::ProgressReporter;
use crate::similarity::{normalize_score, CandidateSession, Excerpt, SimilarityOracle};
use ahash::AHashMap;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// A group formed by the similarity pass. `members` are input indices in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarGroup {
    pub members: Vec<usize>,
    /// Lowest accepted pair score that went into the group.
    pub score: f64,
}

/// Text-like files that are not already part of an exact-match group.
pub fn candidate_indices(files: &[FileDescriptor], already_grouped: &[bool]) -> Vec<usize> {
    files
        .iter()
        .enumerate()
        .filter(|(idx, file)| !already_grouped[*idx] && file.is_text_like())
        .map(|(idx, _)| idx)
        .collect()
}

/// Number of unordered pairs over `candidates` files, saturating on overflow.
pub fn pair_count(candidates: usize) -> usize {
    candidates.saturating_mul(candidates.saturating_sub(1)) / 2
}

/// Lazily yields every unordered pair of candidate positions in `i < j` order.
#[derive(Debug, Clone)]
pub struct CandidatePairs {
    len: usize,
    i: usize,
    j: usize,
}

impl CandidatePairs {
    pub fn new(len: usize) -> Self {
        Self { len, i: 0, j: 1 }
    }
}

impl Iterator for CandidatePairs {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.i >= self.len {
            return None;
        }
        if self.j >= self.len {
            self.i += 1;
            self.j = self.i + 1;
            if self.j >= self.len {
                self.i = self.len;
                return None;
            }
        }
        let pair = (self.i, self.j);
        self.j += 1;
        Some(pair)
    }
}

/// Scores chunks of candidate pairs on a pool of `max_workers` threads.
///
/// Scores line up with the chunk regardless of completion order. A failed lookup is
/// logged and scored 0; it never fails the batch.
pub struct PairScorer<'a> {
    pool: ThreadPool,
    session: Box<dyn CandidateSession + 'a>,
    names: Vec<&'a str>,
    reporter: &'a dyn ProgressReporter,
    total: usize,
    done: AtomicUsize,
}

impl<'a> PairScorer<'a> {
    pub fn new(
        files: &'a [FileDescriptor],
        candidates: &[usize],
        oracle: &'a dyn SimilarityOracle,
        excerpt_chars: usize,
        max_workers: usize,
        reporter: &'a dyn ProgressReporter,
    ) -> Result<Self, Error> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_workers)
            .build()
            .map_err(|e| Error::Other(format!("Failed to build similarity worker pool: {}", e)))?;

        let excerpts: Vec<Excerpt<'a>> = candidates
            .iter()
            .map(|&idx| Excerpt::from_file(&files[idx], excerpt_chars))
            .collect();
        let names = excerpts.iter().map(|excerpt| excerpt.name).collect();
        let session = pool.install(|| oracle.session(excerpts));

        Ok(Self {
            pool,
            session,
            names,
            reporter,
            total: pair_count(candidates.len()),
            done: AtomicUsize::new(0),
        })
    }

    pub fn score_chunk(&self, pairs: &[(usize, usize)]) -> Vec<f64> {
        self.pool.install(|| {
            pairs
                .par_iter()
                .map(|&(a, b)| {
                    let score = match self.session.compare(a, b).and_then(normalize_score) {
                        Ok(score) => score,
                        Err(e) => {
                            warn!(
                                "Similarity lookup failed for '{}' and '{}': {}",
                                self.names[a], self.names[b], e
                            );
                            0.0
                        }
                    };

                    let finished = self.done.fetch_add(1, Ordering::Relaxed) + 1;
                    self.reporter.on_similarity_progress(finished, self.total);
                    score
                })
                .collect::<Vec<f64>>()
        })
    }
}

/// Single-writer merge of scored pairs, fed strictly in pair order.
///
/// A matching pair starts a group, or extends the group one of its files already belongs
/// to. When the pair links two existing groups the later one is folded into the earlier.
/// Growth is greedy: not every pair inside a group has to clear the threshold.
pub struct PairMerger {
    threshold: f64,
    owner: AHashMap<usize, usize>,
    groups: Vec<Option<SimilarGroup>>,
}

impl PairMerger {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            owner: AHashMap::new(),
            groups: Vec::new(),
        }
    }

    pub fn push(&mut self, a: usize, b: usize, score: f64) {
        if score < self.threshold {
            return;
        }

        match (self.owner.get(&a).copied(), self.owner.get(&b).copied()) {
            (None, None) => {
                self.owner.insert(a, self.groups.len());
                self.owner.insert(b, self.groups.len());
                self.groups.push(Some(SimilarGroup {
                    members: vec![a, b],
                    score,
                }));
            }
            (Some(slot), None) | (None, Some(slot)) => {
                let joining = if self.owner.contains_key(&a) { b } else { a };
                if let Some(group) = self.groups[slot].as_mut() {
                    group.members.push(joining);
                    group.score = group.score.min(score);
                }
                self.owner.insert(joining, slot);
            }
            (Some(slot_a), Some(slot_b)) if slot_a == slot_b => {}
            (Some(slot_a), Some(slot_b)) => {
                let (keep, fold) = (slot_a.min(slot_b), slot_a.max(slot_b));
                if let Some(folded) = self.groups[fold].take() {
                    for &member in &folded.members {
                        self.owner.insert(member, keep);
                    }
                    if let Some(group) = self.groups[keep].as_mut() {
                        group.members.extend(folded.members);
                        group.score = group.score.min(folded.score).min(score);
                    }
                }
            }
        }
    }

    pub fn finish(self) -> Vec<SimilarGroup> {
        let merged: Vec<SimilarGroup> = self
            .groups
            .into_iter()
            .flatten()
            .map(|mut group| {
                group.members.sort_unstable();
                group
            })
            .collect();

        debug!("Similarity merge produced {} groups", merged.len());
        merged
    }
}
