//! One-Sided LP Simulation Binary
//!
//! Runs a single scenario file and prints the profitability summary.
//!
//! ## Usage
//! ```bash
//! cargo run --bin simulate --release -- --config configs/default.yaml --output results.csv
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use eulerswap_simulation::export::export_to_path;
use eulerswap_simulation::logging::{self, Verbosity};
use eulerswap_simulation::{ScenarioConfig, SimulationEngine};

/// Eulerswap one-sided LP profitability simulator
#[derive(Parser, Debug)]
#[command(name = "simulate")]
#[command(version)]
struct Args {
    /// Scenario YAML file
    #[arg(long, default_value = "configs/default.yaml")]
    config: PathBuf,

    /// Export the step series (JSON for .json, CSV otherwise)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,

    /// Print a one-line summary only
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(Verbosity::from_flags(args.verbose, args.quiet));

    let config = ScenarioConfig::load(&args.config)
        .with_context(|| format!("loading scenario {}", args.config.display()))?;
    let (params, state) = config.resolve()?;

    if !args.quiet {
        println!("=======================================================");
        println!("  Eulerswap One-Sided LP Simulation");
        println!("=======================================================");
        println!();
        println!("Parameters:");
        println!("  Config:       {}", args.config.display());
        println!("  Horizon:      {} days", params.horizon_days);
        println!("  Time steps:   {}", params.total_steps());
        println!("  Flow model:   {}", params.flow_model.name());
        println!("  Fee:          {} bps", params.fee_bps);
        println!();
    }

    let mut engine = SimulationEngine::new(params, state)?;
    engine.run();
    let summary = engine.summary().context("simulation produced no steps")?;

    if args.quiet {
        println!("{}", summary.one_line());
    } else {
        println!("=======================================================");
        println!("  Summary");
        println!("=======================================================");
        println!();
        summary.print();
        println!();
    }

    if let Some(output) = &args.output {
        let format = export_to_path(engine.results(), output)
            .with_context(|| format!("exporting results to {}", output.display()))?;
        if !args.quiet {
            println!("Results exported to {} ({:?})", output.display(), format);
        }
    }

    Ok(())
}
