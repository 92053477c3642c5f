//! Simulation Parameters
//!
//! A fully resolved, validated bundle fixing the behaviour of one run.
//! Defaulting happens in the config layer; the engine only accepts values
//! that pass [`SimulationParams::validate`].

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::models::BPS_DENOMINATOR;

pub const DAYS_PER_YEAR: f64 = 365.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmmType {
    ConstantProduct,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowModel {
    Deterministic,
    Stochastic,
}

impl FlowModel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Deterministic => "deterministic",
            Self::Stochastic => "stochastic",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    pub horizon_days: u32,
    pub steps_per_day: u32,
    pub seed: u64,

    pub amm_type: AmmType,
    pub fee_bps: f64,

    // Annualized, decimal
    pub underlying_yield_apr: f64,
    pub rehyp_yield_apr: f64,
    pub borrow_cost_apr: f64,
    pub ops_cost_usd_per_day: f64,

    pub flow_model: FlowModel,
    /// Daily flow as bps of the pool, spread evenly across the day's steps.
    pub deterministic_schedule_bps: f64,
    pub stochastic_mu_daily: f64,
    pub stochastic_sigma_daily: f64,

    /// Liquidation LTV threshold.
    pub max_borrow_multiple: f64,

    pub mark_plusd_price: f64,
    pub mark_usdt0_price: f64,
}

impl SimulationParams {
    pub fn total_steps(&self) -> u64 {
        u64::from(self.horizon_days) * u64::from(self.steps_per_day)
    }

    /// Length of one step in years.
    pub fn dt_years(&self) -> f64 {
        1.0 / (DAYS_PER_YEAR * f64::from(self.steps_per_day))
    }

    /// Length of one step in days.
    pub fn dt_days(&self) -> f64 {
        self.dt_years() * DAYS_PER_YEAR
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.horizon_days == 0 {
            return Err(SimError::invalid("horizon_days", "must be greater than 0"));
        }
        if self.steps_per_day == 0 {
            return Err(SimError::invalid("steps_per_day", "must be greater than 0"));
        }
        if !(0.0..BPS_DENOMINATOR).contains(&self.fee_bps) {
            return Err(SimError::invalid(
                "fee_bps",
                format!("must be in [0, 10000), got {}", self.fee_bps),
            ));
        }

        if !self.stochastic_mu_daily.is_finite() {
            return Err(SimError::invalid(
                "stochastic_mu_daily",
                format!("must be finite, got {}", self.stochastic_mu_daily),
            ));
        }

        // Accrual counters must never decrease, so rates cannot be negative.
        let non_negative = [
            ("underlying_yield_apr", self.underlying_yield_apr),
            ("rehyp_yield_apr", self.rehyp_yield_apr),
            ("borrow_cost_apr", self.borrow_cost_apr),
            ("ops_cost_usd_per_day", self.ops_cost_usd_per_day),
            ("deterministic_schedule_bps", self.deterministic_schedule_bps),
            ("stochastic_sigma_daily", self.stochastic_sigma_daily),
            ("mark_plusd_price", self.mark_plusd_price),
            ("mark_usdt0_price", self.mark_usdt0_price),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::invalid(
                    field,
                    format!("must be finite and non-negative, got {}", value),
                ));
            }
        }

        if !(self.max_borrow_multiple > 0.0 && self.max_borrow_multiple <= 1.0) {
            return Err(SimError::invalid(
                "max_borrow_multiple",
                format!("must be in (0, 1], got {}", self.max_borrow_multiple),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_params() -> SimulationParams {
    SimulationParams {
        horizon_days: 30,
        steps_per_day: 24,
        seed: 42,
        amm_type: AmmType::ConstantProduct,
        fee_bps: 7.0,
        underlying_yield_apr: 0.06,
        rehyp_yield_apr: 0.12,
        borrow_cost_apr: 0.08,
        ops_cost_usd_per_day: 100.0,
        flow_model: FlowModel::Deterministic,
        deterministic_schedule_bps: 10.0,
        stochastic_mu_daily: 0.0,
        stochastic_sigma_daily: 0.25,
        max_borrow_multiple: 0.8,
        mark_plusd_price: 1.0,
        mark_usdt0_price: 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_time_values() {
        let params = test_params();
        assert_eq!(params.total_steps(), 720);
        assert!((params.dt_years() - 1.0 / 8760.0).abs() < 1e-15);
        assert!((params.dt_days() - 1.0 / 24.0).abs() < 1e-12);
    }

    #[test]
    fn test_valid_params_pass() {
        assert!(test_params().validate().is_ok());
    }

    #[test]
    fn test_zero_horizon_rejected() {
        let params = SimulationParams { horizon_days: 0, ..test_params() };
        assert_eq!(
            params.validate(),
            Err(SimError::invalid("horizon_days", "must be greater than 0"))
        );
    }

    #[test]
    fn test_zero_steps_rejected() {
        let params = SimulationParams { steps_per_day: 0, ..test_params() };
        assert!(matches!(
            params.validate(),
            Err(SimError::InvalidParameter { field: "steps_per_day", .. })
        ));
    }

    #[test]
    fn test_fee_out_of_range_rejected() {
        for fee_bps in [-1.0, 10_000.0, f64::NAN] {
            let params = SimulationParams { fee_bps, ..test_params() };
            assert!(matches!(
                params.validate(),
                Err(SimError::InvalidParameter { field: "fee_bps", .. })
            ));
        }
    }

    #[test]
    fn test_borrow_multiple_bounds() {
        for max_borrow_multiple in [0.0, -0.5, 1.2] {
            let params = SimulationParams { max_borrow_multiple, ..test_params() };
            assert!(params.validate().is_err());
        }
        let params = SimulationParams { max_borrow_multiple: 1.0, ..test_params() };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_non_finite_rate_rejected() {
        let params = SimulationParams { borrow_cost_apr: f64::INFINITY, ..test_params() };
        assert!(matches!(
            params.validate(),
            Err(SimError::InvalidParameter { field: "borrow_cost_apr", .. })
        ));
    }

    #[test]
    fn test_negative_rate_rejected() {
        let params = SimulationParams { rehyp_yield_apr: -0.01, ..test_params() };
        assert!(matches!(
            params.validate(),
            Err(SimError::InvalidParameter { field: "rehyp_yield_apr", .. })
        ));
    }

    #[test]
    fn test_negative_sigma_rejected() {
        let params = SimulationParams { stochastic_sigma_daily: -0.1, ..test_params() };
        assert!(params.validate().is_err());
    }
}
