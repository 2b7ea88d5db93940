use fileinasnap_core::ProgressReporter;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif progress bars.
///
/// - Walk phase: spinner (unknown total files upfront)
/// - Similarity phase: progress bar over candidate pairs
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn spinner(message: &'static str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars(TICK_CHARS));
        }
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }
}

impl ProgressReporter for CliReporter {
    fn on_walk_start(&self) {
        self.set_bar(Self::spinner("Walking directory and hashing files..."));
    }

    fn on_walk_complete(&self, total_files: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Walk complete: {} files in {:.2}s",
            total_files, duration_secs
        );
    }

    fn on_exact_complete(&self, groups: usize, duration_secs: f64) {
        eprintln!(
            "  \x1b[32m✓\x1b[0m Exact match complete: {} groups in {:.2}s",
            groups, duration_secs
        );
    }

    fn on_similarity_start(&self, total_pairs: usize) {
        let pb = ProgressBar::new(total_pairs as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "  {spinner:.cyan} Comparing [{bar:30.cyan/dim}] {pos}/{len} pairs ({eta} remaining)",
        ) {
            pb.set_style(style.progress_chars("━╸─").tick_chars(TICK_CHARS));
        }
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_similarity_progress(&self, _pairs_done: usize, _total_pairs: usize) {
        // Workers finish out of order, so count completions rather than trusting the index.
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.inc(1);
            }
        }
    }

    fn on_similarity_complete(&self, groups: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Similarity complete: {} groups in {:.2}s",
            groups, duration_secs
        );
    }
}
