pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod model;
pub mod progress;
pub mod scanner;
pub mod similarity;

pub use config::AppConfig;
pub use engine::{DuplicateScanner, ScanOptions};
pub use error::Error;
pub use model::{DetectionMethod, DuplicateGroup, FileDescriptor, ScanResult};
pub use progress::{ProgressReporter, SilentReporter};
pub use similarity::{build_oracle, CandidateSession, Excerpt, SimilarityOracle};
