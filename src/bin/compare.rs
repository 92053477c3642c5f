//! Scenario Comparison Binary
//!
//! Runs several scenario files and prints their summaries side by side.
//!
//! ## Usage
//! ```bash
//! cargo run --bin compare --release
//! cargo run --bin compare --release -- configs/default.yaml configs/high_volume.yaml
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use eulerswap_simulation::compare::{run_scenario, ComparisonTable};
use eulerswap_simulation::logging::{self, Verbosity};
use eulerswap_simulation::ScenarioConfig;

const DEFAULT_SCENARIOS: [&str; 4] = [
    "configs/default.yaml",
    "configs/profitable.yaml",
    "configs/high_volume.yaml",
    "configs/optimized.yaml",
];

/// Compare one-sided LP scenarios
#[derive(Parser, Debug)]
#[command(name = "compare")]
#[command(version)]
struct Args {
    /// Scenario YAML files (defaults to the bundled presets)
    configs: Vec<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn scenario_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(Verbosity::from_flags(args.verbose, false));

    let paths: Vec<PathBuf> = if args.configs.is_empty() {
        DEFAULT_SCENARIOS.iter().map(PathBuf::from).collect()
    } else {
        args.configs
    };

    let mut outcomes = Vec::with_capacity(paths.len());
    for path in &paths {
        let config = ScenarioConfig::load(path).with_context(|| format!("loading scenario {}", path.display()))?;
        let outcome =
            run_scenario(scenario_name(path), &config).with_context(|| format!("running scenario {}", path.display()))?;
        outcomes.push(outcome);
    }

    println!("=======================================================");
    println!("  Scenario Comparison");
    println!("=======================================================");
    println!();

    ComparisonTable::new(outcomes).print();
    println!();

    Ok(())
}
