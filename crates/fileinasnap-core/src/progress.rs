/// Trait for reporting scan progress.
///
/// The CLI implements it with indicatif progress bars.
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_walk_start(&self) {}
    fn on_walk_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_exact_start(&self, _total_files: usize) {}
    fn on_exact_complete(&self, _groups: usize, _duration_secs: f64) {}
    fn on_similarity_start(&self, _total_pairs: usize) {}
    fn on_similarity_progress(&self, _pairs_done: usize, _total_pairs: usize) {}
    fn on_similarity_complete(&self, _groups: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
