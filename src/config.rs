//! Scenario Configuration
//!
//! Human-authored YAML scenario files. This layer owns every default; once
//! [`ScenarioConfig::resolve`] succeeds, the params and initial state are
//! complete and validated.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SimError};
use crate::params::{AmmType, FlowModel, SimulationParams};
use crate::state::PoolState;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub horizon_days: u32,
    pub steps_per_day: u32,
    pub seed: u64,
    pub amm: AmmConfig,
    pub yields: YieldsConfig,
    pub costs: CostsConfig,
    pub flow: FlowConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
    pub initial_state: InitialStateConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AmmConfig {
    #[serde(rename = "type", default = "default_amm_type")]
    pub amm_type: AmmType,
    pub fee_bps: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct YieldsConfig {
    pub underlying_yield_apr: f64,
    pub rehyp_yield_apr: f64,
    pub borrow_cost_apr: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostsConfig {
    pub ops_cost_usd_per_day: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    pub model: FlowModel,
    #[serde(default = "default_schedule_bps")]
    pub deterministic_schedule_bps_of_pool: f64,
    #[serde(default)]
    pub stochastic: StochasticFlowConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StochasticFlowConfig {
    #[serde(default)]
    pub mu_daily: f64,
    #[serde(default = "default_sigma_daily")]
    pub sigma_daily: f64,
}

impl Default for StochasticFlowConfig {
    fn default() -> Self {
        Self {
            mu_daily: 0.0,
            sigma_daily: default_sigma_daily(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    #[serde(default = "default_max_borrow_multiple")]
    pub max_borrow_multiple: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_borrow_multiple: default_max_borrow_multiple(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportingConfig {
    #[serde(default = "default_mark_price")]
    pub mark_to_market_price_plusd: f64,
    #[serde(default = "default_mark_price")]
    pub mark_to_market_price_usdt0: f64,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            mark_to_market_price_plusd: default_mark_price(),
            mark_to_market_price_usdt0: default_mark_price(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InitialStateConfig {
    pub plusd_reserve: f64,
    pub usdt0_reserve: f64,
    pub trevee_deposit_plusd: f64,
    #[serde(default = "default_rehyp_fraction")]
    pub rehyp_fraction: f64,
}

fn default_amm_type() -> AmmType {
    AmmType::ConstantProduct
}

fn default_schedule_bps() -> f64 {
    20.0
}

fn default_sigma_daily() -> f64 {
    0.25
}

fn default_max_borrow_multiple() -> f64 {
    0.8
}

fn default_mark_price() -> f64 {
    1.0
}

fn default_rehyp_fraction() -> f64 {
    0.6
}

impl ScenarioConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn params(&self) -> SimulationParams {
        SimulationParams {
            horizon_days: self.horizon_days,
            steps_per_day: self.steps_per_day,
            seed: self.seed,
            amm_type: self.amm.amm_type,
            fee_bps: self.amm.fee_bps,
            underlying_yield_apr: self.yields.underlying_yield_apr,
            rehyp_yield_apr: self.yields.rehyp_yield_apr,
            borrow_cost_apr: self.yields.borrow_cost_apr,
            ops_cost_usd_per_day: self.costs.ops_cost_usd_per_day,
            flow_model: self.flow.model,
            deterministic_schedule_bps: self.flow.deterministic_schedule_bps_of_pool,
            stochastic_mu_daily: self.flow.stochastic.mu_daily,
            stochastic_sigma_daily: self.flow.stochastic.sigma_daily,
            max_borrow_multiple: self.risk.max_borrow_multiple,
            mark_plusd_price: self.reporting.mark_to_market_price_plusd,
            mark_usdt0_price: self.reporting.mark_to_market_price_usdt0,
        }
    }

    /// The LP deposits plUSD only and borrows the pool's whole USDT0 side.
    pub fn initial_state(&self) -> PoolState {
        let init = &self.initial_state;
        PoolState::one_sided(
            init.plusd_reserve,
            init.usdt0_reserve,
            init.trevee_deposit_plusd,
            init.rehyp_fraction,
        )
    }

    pub fn resolve(&self) -> Result<(SimulationParams, PoolState), ConfigError> {
        let fraction = self.initial_state.rehyp_fraction;
        if !(0.0..=1.0).contains(&fraction) {
            return Err(SimError::invalid("rehyp_fraction", format!("must be in [0, 1], got {}", fraction)).into());
        }

        let params = self.params();
        params.validate()?;
        let state = self.initial_state();
        state.validate()?;
        Ok((params, state))
    }
}
