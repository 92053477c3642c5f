//! Trade Flow Generation
//!
//! Produces the plUSD amount swapped into the pool each step.
//!
//! ## Flow Models
//! - Deterministic: a fixed bps-of-pool schedule per day, split evenly across steps
//! - Stochastic: log-normal multiplier on a 1%-of-pool base flow (GBM increment)
//!
//! Both models size flow from the reserves at the start of the step, so
//! deterministic flow drifts slowly as the pool grows with retained fees.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;

use crate::models::BPS_DENOMINATOR;
use crate::params::{FlowModel, SimulationParams};
use crate::state::PoolState;

const STOCHASTIC_BASE_FRACTION: f64 = 0.01;

pub fn deterministic_flow(pool_size: f64, params: &SimulationParams) -> f64 {
    let daily_flow = pool_size * params.deterministic_schedule_bps / BPS_DENOMINATOR;
    daily_flow / f64::from(params.steps_per_day)
}

/// Flow for a standard normal draw `z`; never negative.
pub fn stochastic_flow(pool_size: f64, params: &SimulationParams, z: f64) -> f64 {
    let dt = params.dt_days();
    let drift = params.stochastic_mu_daily * dt;
    let diffusion = params.stochastic_sigma_daily * dt.sqrt() * z;

    let flow_factor = (drift + diffusion).exp();
    let base_flow = pool_size * STOCHASTIC_BASE_FRACTION;
    (base_flow * flow_factor).max(0.0)
}

/// Run-scoped flow source. The generator owns its RNG, seeded once at
/// construction, so runs with different seeds never share random state.
pub struct FlowGenerator {
    rng: StdRng,
}

impl FlowGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_flow(&mut self, state: &PoolState, params: &SimulationParams) -> f64 {
        let pool_size = state.total_liquidity();
        match params.flow_model {
            FlowModel::Deterministic => deterministic_flow(pool_size, params),
            FlowModel::Stochastic => {
                let z: f64 = self.rng.sample(StandardNormal);
                stochastic_flow(pool_size, params, z)
            }
        }
    }
}
