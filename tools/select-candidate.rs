//! Report which candidate a loader config would select
//!
//! Evaluates the candidate conditions of a loader config in the current
//! environment without loading anything.
//!
//! Usage:
//!   select-candidate --config loader.toml [--feature new-runtime]... [--all]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use dynamic_module_loader::utils::init_logging_from_config;
use dynamic_module_loader::{select_candidate, LoaderConfig};

#[derive(Parser, Debug)]
#[command(about = "Show which module candidate is eligible in this environment")]
struct Args {
    /// Loader config file (TOML or JSON)
    #[arg(long)]
    config: PathBuf,

    /// Extra feature flags to enable
    #[arg(long = "feature")]
    features: Vec<String>,

    /// Evaluate every candidate's condition, not just up to the first match
    #[arg(long)]
    all: bool,
}

fn run(args: Args) -> anyhow::Result<bool> {
    let mut config = LoaderConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load {:?}", args.config))?;
    init_logging_from_config(config.logging.as_ref());
    config.features.extend(args.features);

    let candidates = config.candidate_descriptors()?;
    info!("Evaluating {} candidates", candidates.len());

    if args.all {
        for (index, candidate) in candidates.iter().enumerate() {
            println!(
                "#{} {:<24} eligible={}",
                index,
                candidate.display_name(),
                candidate.is_eligible()
            );
        }
    }

    match select_candidate(&candidates) {
        Some((index, candidate)) => {
            println!("selected #{} {}", index, candidate.display_name());
            if let Some(identifier) = candidate.identifier() {
                println!("  identifier: {}", identifier);
            }
            if let Some(path) = candidate.path() {
                println!("  path:       {}", path.display());
            }
            Ok(true)
        }
        None => {
            println!("no eligible candidate");
            Ok(false)
        }
    }
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
