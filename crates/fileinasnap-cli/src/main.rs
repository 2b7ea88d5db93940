mod commands;
mod logging;
mod progress;
mod report;

use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process;
use std::time::Instant;

use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, GroupArgs};
use dotenv::dotenv;
use fileinasnap_core::scanner::{collect_descriptors, describe_file};
use fileinasnap_core::similarity::{build_oracle, Excerpt};
use fileinasnap_core::{AppConfig, DuplicateScanner, Error, FileDescriptor, ProgressReporter};
use progress::CliReporter;
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match fileinasnap_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    let outcome = match args.command {
        Some(Commands::Scan { dir, group }) => run_scan(config, &dir, &group),
        Some(Commands::Group { input, group }) => run_group(config, &input, &group),
        Some(Commands::Compare { a, b, provider }) => {
            let mut config = config;
            if let Some(provider) = provider {
                config.similarity.provider = provider;
            }
            run_compare(&config, &a, &b)
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config.redacted());
            Ok(())
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = outcome {
        error!("Error: {}", err);
        process::exit(exit_code(err.as_ref()));
    }
}

fn exit_code(err: &(dyn std::error::Error + 'static)) -> i32 {
    match err.downcast_ref::<Error>() {
        Some(e) if e.is_invalid_argument() => 2,
        _ => 1,
    }
}

fn run_scan(config: AppConfig, dir: &Path, args: &GroupArgs) -> Result<(), Box<dyn std::error::Error>> {
    let reporter = CliReporter::new();

    reporter.on_walk_start();
    let walk_start = Instant::now();
    let files = collect_descriptors(dir, &config.walk_options())?;
    reporter.on_walk_complete(files.len(), walk_start.elapsed().as_secs_f64());

    group_and_report(config, &files, args, &reporter)
}

fn run_group(config: AppConfig, input: &str, args: &GroupArgs) -> Result<(), Box<dyn std::error::Error>> {
    let raw = if input == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let files: Vec<FileDescriptor> = serde_json::from_str(&raw)
        .map_err(|e| Error::InvalidArgument(format!("malformed file list: {}", e)))?;

    group_and_report(config, &files, args, &CliReporter::new())
}

fn group_and_report(
    mut config: AppConfig,
    files: &[FileDescriptor],
    args: &GroupArgs,
    reporter: &dyn ProgressReporter,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(threshold) = args.threshold {
        config.similarity.threshold = threshold;
    }
    if args.no_similar {
        config.similarity.include_similar = false;
    }
    if let Some(provider) = args.provider {
        config.similarity.provider = provider;
    }

    let oracle = if config.similarity.include_similar {
        build_oracle(&config)?
    } else {
        None
    };
    let scanner = DuplicateScanner::new(config.scan_options()).with_optional_oracle(oracle);

    let start = Instant::now();
    let result = scanner.scan(files, reporter)?;
    info!(
        "Grouping: {}, {} duplicate groups, {} removable files",
        format!("{:.2}s", start.elapsed().as_secs_f64()).green(),
        format!("{}", result.duplicate_groups_found).red(),
        format!("{}", result.total_duplicate_files).red(),
    );

    let rendered = report::render(&result, args.format)?;
    match &args.output {
        Some(path) => {
            fs::write(path, rendered)?;
            info!("Report written to {}", path.display());
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

fn run_compare(config: &AppConfig, a: &Path, b: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let oracle = build_oracle(config)?.ok_or_else(|| {
        Error::InvalidArgument("no similarity provider configured (provider = none)".to_string())
    })?;

    let walk = config.walk_options();
    let file_a = describe_file(a, &walk)?
        .ok_or_else(|| Error::InvalidArgument(format!("'{}' is empty or too large", a.display())))?;
    let file_b = describe_file(b, &walk)?
        .ok_or_else(|| Error::InvalidArgument(format!("'{}' is empty or too large", b.display())))?;

    let chars = config.similarity.excerpt_chars;
    let score = oracle.compare(
        &Excerpt::from_file(&file_a, chars),
        &Excerpt::from_file(&file_b, chars),
    )?;
    let score = fileinasnap_core::similarity::normalize_score(score)?;

    let verdict = if score >= config.similarity.threshold {
        "similar".green()
    } else {
        "different".yellow()
    };
    println!(
        "{} vs {}: {:.3} ({}, threshold {:.2}, via {})",
        file_a.name,
        file_b.name,
        score,
        verdict,
        config.similarity.threshold,
        oracle.name()
    );

    Ok(())
}
