//! Eulerswap One-Sided LP Simulation Library
//!
//! This library simulates the profitability of a one-sided AMM liquidity
//! position: the LP deposits plUSD only and the USDT0 side is borrowed.
//! Trading fees, yield on deposited and rehypothecated collateral, borrow
//! cost, operating cost, impermanent loss and liquidation risk are tracked
//! over a discretized horizon.
//!
//! ## Modules
//!
//! - `models`: constant-product swap and finance math (pure functions)
//! - `params`: validated simulation parameters
//! - `state`: pool reserves and the tracked LP position
//! - `flow`: deterministic and seeded stochastic trade flow
//! - `engine`: step transition and the run driver
//! - `summary`: end-of-run metrics and max drawdown
//! - `config`: YAML scenario files
//! - `export`: CSV/JSON step series export
//! - `compare`: side-by-side scenario comparison
//!
//! ## Usage
//!
//! ```bash
//! # Run one scenario and print the summary
//! cargo run --bin simulate --release -- --config configs/default.yaml
//!
//! # Export the step series
//! cargo run --bin simulate --release -- --config configs/default.yaml --output results.csv
//!
//! # Compare the bundled scenarios
//! cargo run --bin compare --release
//! ```

pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod flow;
pub mod logging;
pub mod models;
pub mod params;
pub mod state;
pub mod summary;

pub use config::ScenarioConfig;
pub use engine::{transition, SimulationEngine, StepResult};
pub use error::{ConfigError, ExportError, SimError};
pub use params::{AmmType, FlowModel, SimulationParams};
pub use state::PoolState;
pub use summary::Summary;
