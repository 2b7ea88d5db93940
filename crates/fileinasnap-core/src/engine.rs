use crate::analysis::{exact, similar};
use crate::error::Error;
use crate::hasher::KeyStrategy;
use crate::model::{
    DetectionMethod, DuplicateGroup, FileDescriptor, ScanResult, DEFAULT_EXCERPT_CHARS,
};
use crate::progress::ProgressReporter;
use crate::similarity::SimilarityOracle;
use std::time::Instant;
use tracing::{debug, info};

pub const DEFAULT_PAIR_CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Inclusive lower bound a pair score must reach, in [0, 1].
    pub similarity_threshold: f64,
    pub include_similar: bool,
    pub excerpt_chars: usize,
    pub max_workers: usize,
    pub key_strategy: KeyStrategy,
    /// Pairs scored per round before their results are merged. Bounds memory on large batches.
    pub pair_chunk_size: usize,
    /// Reject an empty file list instead of returning an empty result.
    pub require_non_empty: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.9,
            include_similar: true,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            max_workers: 4,
            key_strategy: KeyStrategy::Digest,
            pair_chunk_size: DEFAULT_PAIR_CHUNK_SIZE,
            require_non_empty: false,
        }
    }
}

impl ScanOptions {
    pub fn validate(&self) -> Result<(), Error> {
        if !self.similarity_threshold.is_finite()
            || !(0.0..=1.0).contains(&self.similarity_threshold)
        {
            return Err(Error::InvalidArgument(format!(
                "similarity threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.max_workers == 0 {
            return Err(Error::InvalidArgument(
                "max_workers must be at least 1".to_string(),
            ));
        }
        if self.pair_chunk_size == 0 {
            return Err(Error::InvalidArgument(
                "pair_chunk_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Partitions a batch of files into duplicate groups.
///
/// Stateless between calls: each scan owns its own group map, so one scanner can serve
/// any number of scans.
pub struct DuplicateScanner {
    options: ScanOptions,
    oracle: Option<Box<dyn SimilarityOracle>>,
}

impl DuplicateScanner {
    pub fn new(options: ScanOptions) -> Self {
        Self {
            options,
            oracle: None,
        }
    }

    pub fn with_oracle(mut self, oracle: Box<dyn SimilarityOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_optional_oracle(mut self, oracle: Option<Box<dyn SimilarityOracle>>) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn oracle(&self) -> Option<&dyn SimilarityOracle> {
        self.oracle.as_deref()
    }

    /// Run duplicate detection over `files`:
    /// 1. Validate options and input; nothing runs on an invalid argument
    /// 2. Exact pass on supplied hash / content digest / surrogate key
    /// 3. Similarity pass over the remaining text-like files, if enabled and a collaborator is set
    /// 4. Aggregate groups into a `ScanResult`
    pub fn scan(
        &self,
        files: &[FileDescriptor],
        reporter: &dyn ProgressReporter,
    ) -> Result<ScanResult, Error> {
        self.options.validate()?;
        validate_files(files, self.options.require_non_empty)?;

        // Phase 1: exact keys
        reporter.on_exact_start(files.len());
        let exact_start = Instant::now();
        let exact_groups = exact::group_exact(files, self.options.key_strategy);
        let exact_duration = exact_start.elapsed();
        reporter.on_exact_complete(exact_groups.len(), exact_duration.as_secs_f64());
        info!(
            "Exact pass: {} groups across {} files",
            exact_groups.len(),
            files.len()
        );

        let mut already_grouped = vec![false; files.len()];
        for &idx in exact_groups.iter().flatten() {
            already_grouped[idx] = true;
        }

        // Phase 2: similarity
        let similar_groups = match (self.options.include_similar, self.oracle()) {
            (true, Some(oracle)) => self.similarity_pass(files, &already_grouped, oracle, reporter)?,
            (true, None) => {
                debug!("No similarity collaborator configured, skipping similarity pass");
                Vec::new()
            }
            (false, _) => Vec::new(),
        };

        let mut groups: Vec<DuplicateGroup> =
            Vec::with_capacity(exact_groups.len() + similar_groups.len());
        for members in exact_groups {
            groups.push(DuplicateGroup::new(
                collect_members(files, &members),
                DetectionMethod::ExactHashMatch,
                Some(1.0),
            ));
        }
        for group in similar_groups {
            groups.push(DuplicateGroup::new(
                collect_members(files, &group.members),
                DetectionMethod::AiContentSimilarity,
                Some(group.score),
            ));
        }

        let result = ScanResult::from_groups(files.len(), groups);
        info!(
            "{} duplicate groups, {} removable files, {} bytes reclaimable",
            result.duplicate_groups_found,
            result.total_duplicate_files,
            result.total_potential_savings_bytes,
        );
        Ok(result)
    }

    fn similarity_pass(
        &self,
        files: &[FileDescriptor],
        already_grouped: &[bool],
        oracle: &dyn SimilarityOracle,
        reporter: &dyn ProgressReporter,
    ) -> Result<Vec<similar::SimilarGroup>, Error> {
        let candidates = similar::candidate_indices(files, already_grouped);
        let total_pairs = similar::pair_count(candidates.len());

        reporter.on_similarity_start(total_pairs);
        let start = Instant::now();

        let groups = if total_pairs == 0 {
            Vec::new()
        } else {
            let scorer = similar::PairScorer::new(
                files,
                &candidates,
                oracle,
                self.options.excerpt_chars,
                self.options.max_workers,
                reporter,
            )?;
            let mut merger = similar::PairMerger::new(self.options.similarity_threshold);
            let mut pairs = similar::CandidatePairs::new(candidates.len());

            loop {
                let chunk: Vec<(usize, usize)> =
                    pairs.by_ref().take(self.options.pair_chunk_size).collect();
                if chunk.is_empty() {
                    break;
                }
                let scores = scorer.score_chunk(&chunk);
                for (&(a, b), score) in chunk.iter().zip(scores) {
                    merger.push(candidates[a], candidates[b], score);
                }
            }
            merger.finish()
        };

        let duration = start.elapsed();
        reporter.on_similarity_complete(groups.len(), duration.as_secs_f64());
        debug!(
            "Similarity pass with '{}' completed in {:.2}s: {} candidates, {} pairs, {} groups",
            oracle.name(),
            duration.as_secs_f64(),
            candidates.len(),
            total_pairs,
            groups.len(),
        );

        Ok(groups)
    }
}

fn validate_files(files: &[FileDescriptor], require_non_empty: bool) -> Result<(), Error> {
    if files.is_empty() && require_non_empty {
        return Err(Error::InvalidArgument(
            "at least one file is required".to_string(),
        ));
    }
    if let Some(idx) = files.iter().position(|f| f.name.trim().is_empty()) {
        return Err(Error::InvalidArgument(format!(
            "file at index {} has an empty name",
            idx
        )));
    }
    Ok(())
}

fn collect_members(files: &[FileDescriptor], members: &[usize]) -> Vec<FileDescriptor> {
    members.iter().map(|&idx| files[idx].clone()).collect()
}
