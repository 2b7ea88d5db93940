use clap::{Args, Parser, Subcommand, ValueEnum};
use fileinasnap_core::similarity::ProviderKind;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "fileinasnap")]
#[command(about = "Find duplicate and near-duplicate files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Walk a directory and report duplicate groups
    Scan {
        dir: PathBuf,
        #[command(flatten)]
        group: GroupArgs,
    },
    /// Group file descriptors read from a JSON array ('-' reads stdin)
    Group {
        input: String,
        #[command(flatten)]
        group: GroupArgs,
    },
    /// Score the content similarity of two files
    Compare {
        a: PathBuf,
        b: PathBuf,
        /// Similarity provider: openrouter, lexical or none
        #[arg(long)]
        provider: Option<ProviderKind>,
    },
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct GroupArgs {
    /// Minimum similarity score (0 to 1) for two files to be grouped
    #[arg(long)]
    pub threshold: Option<f64>,
    /// Only report exact duplicates
    #[arg(long)]
    pub no_similar: bool,
    /// Similarity provider: openrouter, lexical or none
    #[arg(long)]
    pub provider: Option<ProviderKind>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Write the report to a file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}
