use crate::engine::{ScanOptions, DEFAULT_PAIR_CHUNK_SIZE};
use crate::hasher::KeyStrategy;
use crate::model::DEFAULT_EXCERPT_CHARS;
use crate::scanner::WalkOptions;
use crate::similarity::ProviderKind;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

const REDACTED: &str = "********";

/// Process-wide settings, built once at start-up and handed to whoever needs them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scan: ScanSettings,
    pub similarity: SimilaritySettings,
    pub openrouter: OpenRouterSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub ignore_patterns: Vec<String>,
    pub max_file_size_mb: u64,
    pub content_sample_bytes: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            ignore_patterns: Vec::new(),
            max_file_size_mb: 100,
            content_sample_bytes: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilaritySettings {
    pub provider: ProviderKind,
    pub threshold: f64,
    pub include_similar: bool,
    pub excerpt_chars: usize,
    pub max_workers: usize,
    pub pair_chunk_size: usize,
    pub key_strategy: KeyStrategy,
}

impl Default for SimilaritySettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Lexical,
            threshold: 0.9,
            include_similar: true,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            max_workers: 4,
            pair_chunk_size: DEFAULT_PAIR_CHUNK_SIZE,
            key_strategy: KeyStrategy::Digest,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenRouterSettings {
    pub api_key: Option<String>,
    pub api_base: String,
    pub site_url: String,
    pub site_name: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for OpenRouterSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://openrouter.ai/api/v1".to_string(),
            site_url: "https://fileinasnap.io".to_string(),
            site_name: "FileInASnap".to_string(),
            model: "mistralai/mistral-7b-instruct".to_string(),
            timeout_secs: 60,
            max_tokens: 200,
            temperature: 0.1,
        }
    }
}

impl AppConfig {
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            similarity_threshold: self.similarity.threshold,
            include_similar: self.similarity.include_similar,
            excerpt_chars: self.similarity.excerpt_chars,
            max_workers: self.similarity.max_workers,
            key_strategy: self.similarity.key_strategy,
            pair_chunk_size: self.similarity.pair_chunk_size,
            require_non_empty: false,
        }
    }

    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            ignore_patterns: self.scan.ignore_patterns.clone(),
            max_file_size_bytes: self.scan.max_file_size_mb.saturating_mul(1024 * 1024),
            content_sample_bytes: self.scan.content_sample_bytes,
        }
    }

    /// Copy safe to print: the API key is masked.
    pub fn redacted(&self) -> AppConfig {
        let mut copy = self.clone();
        if copy.openrouter.api_key.is_some() {
            copy.openrouter.api_key = Some(REDACTED.to_string());
        }
        copy
    }
}

/// Loads `Config.toml` from the working directory (optional) and
/// `FILEINASNAP_*` environment overrides, e.g. `FILEINASNAP_SIMILARITY__THRESHOLD=0.8`.
/// List settings take comma-separated values: `FILEINASNAP_SCAN__IGNORE_PATTERNS=**/.git,**/target`.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(env_source())
        .build()?;
    finish(builder, env::var("OPENROUTER_API_KEY").ok())
}

/// Same as [`load_configuration`] but reading an explicit file, which must exist.
pub fn load_configuration_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::from(path).required(true))
        .add_source(env_source())
        .build()?;
    finish(builder, env::var("OPENROUTER_API_KEY").ok())
}

fn env_source() -> Environment {
    Environment::with_prefix("FILEINASNAP")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("scan.ignore_patterns")
}

/// `fallback_key` is the bare `OPENROUTER_API_KEY`, used only when no key was configured.
fn finish(builder: Config, fallback_key: Option<String>) -> Result<AppConfig, ConfigError> {
    let mut config = builder.try_deserialize::<AppConfig>()?;

    if config.openrouter.api_key.is_none() {
        config.openrouter.api_key = fallback_key.filter(|key| !key.trim().is_empty());
    }

    Ok(config)
}
