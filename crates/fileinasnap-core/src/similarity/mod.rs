pub mod lexical;
pub mod openrouter;
pub mod stub;

use crate::config::AppConfig;
use crate::error::Error;
use crate::model::FileDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

pub use lexical::LexicalOracle;
pub use openrouter::OpenRouterOracle;
pub use stub::StubOracle;

/// What a similarity collaborator sees of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Excerpt<'a> {
    pub name: &'a str,
    pub text: &'a str,
}

impl<'a> Excerpt<'a> {
    pub fn from_file(file: &'a FileDescriptor, limit: usize) -> Self {
        Self {
            name: &file.name,
            text: file.excerpt(limit),
        }
    }
}

/// Scores how alike two files are, from 0 (unrelated) to 1 (same content).
///
/// Implementations are shared across the worker pool of a scan, so they must be `Sync`.
/// A failed comparison is reported as `Error::Collaborator` and never aborts a scan.
pub trait SimilarityOracle: Send + Sync {
    fn name(&self) -> &str;

    fn compare(&self, a: &Excerpt<'_>, b: &Excerpt<'_>) -> Result<f64, Error>;

    /// Opens a session over one scan's candidates. The default forwards every pair to
    /// [`SimilarityOracle::compare`]; override it to prepare per-file state once per scan.
    fn session<'a>(&'a self, excerpts: Vec<Excerpt<'a>>) -> Box<dyn CandidateSession + 'a> {
        Box::new(DirectSession {
            oracle: self,
            excerpts,
        })
    }
}

/// Pairwise comparisons within one scan, with files addressed by candidate position.
pub trait CandidateSession: Send + Sync {
    fn compare(&self, a: usize, b: usize) -> Result<f64, Error>;
}

struct DirectSession<'a, O: ?Sized> {
    oracle: &'a O,
    excerpts: Vec<Excerpt<'a>>,
}

impl<O: SimilarityOracle + ?Sized> CandidateSession for DirectSession<'_, O> {
    fn compare(&self, a: usize, b: usize) -> Result<f64, Error> {
        self.oracle.compare(&self.excerpts[a], &self.excerpts[b])
    }
}

/// Rejects non-finite scores and clamps the rest into [0, 1].
pub fn normalize_score(raw: f64) -> Result<f64, Error> {
    if !raw.is_finite() {
        return Err(Error::Collaborator(format!(
            "similarity score is not a finite number: {}",
            raw
        )));
    }
    Ok(raw.clamp(0.0, 1.0))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenRouter,
    #[default]
    Lexical,
    None,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "lexical" => Ok(ProviderKind::Lexical),
            "none" => Ok(ProviderKind::None),
            other => Err(format!(
                "unknown similarity provider '{}' (expected openrouter, lexical or none)",
                other
            )),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Lexical => "lexical",
            ProviderKind::None => "none",
        };
        f.write_str(name)
    }
}

/// Constructs the collaborator named by `similarity.provider`.
/// `None` means the similarity pass is disabled.
pub fn build_oracle(config: &AppConfig) -> Result<Option<Box<dyn SimilarityOracle>>, Error> {
    let oracle: Option<Box<dyn SimilarityOracle>> = match config.similarity.provider {
        ProviderKind::OpenRouter => {
            Some(Box::new(OpenRouterOracle::new(config.openrouter.clone())?))
        }
        ProviderKind::Lexical => Some(Box::new(LexicalOracle::new())),
        ProviderKind::None => None,
    };

    match &oracle {
        Some(o) => info!("Using '{}' similarity collaborator", o.name()),
        None => info!("Similarity collaborator disabled"),
    }

    Ok(oracle)
}
