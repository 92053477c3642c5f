//! Pool and Position State
//!
//! Reserves of the plUSD/USDT0 pool together with the tracked LP position:
//! deposited plUSD, net USDT0, the rehypothecated tranche, outstanding debt
//! and the cumulative accrual counters.

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Pool reserves, the tracked LP position and its running accrual totals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoolState {
    pub plusd_reserve: f64,
    pub usdt0_reserve: f64,

    pub trevee_plusd: f64,
    /// May be read as a net borrowed contribution, hence used as `abs()` for liquidity.
    pub trevee_usdt0: f64,

    /// Fixed tranche of the deposit earning the rehypothecation rate.
    pub rehypothecated_plusd: f64,
    pub borrowed_usdt0: f64,

    // Cumulative, non-decreasing
    pub fee_accruals: f64,
    pub underlying_yield_accrued: f64,
    pub rehyp_yield_accrued: f64,
    pub borrow_cost_accrued: f64,
    pub ops_cost_accrued: f64,

    pub initial_trevee_plusd: f64,
    pub initial_trevee_usdt0: f64,

    pub step: u64,
}

impl PoolState {
    pub fn new(
        plusd_reserve: f64,
        usdt0_reserve: f64,
        trevee_plusd: f64,
        trevee_usdt0: f64,
        rehypothecated_plusd: f64,
        borrowed_usdt0: f64,
    ) -> Self {
        Self {
            plusd_reserve,
            usdt0_reserve,
            trevee_plusd,
            trevee_usdt0,
            rehypothecated_plusd,
            borrowed_usdt0,
            fee_accruals: 0.0,
            underlying_yield_accrued: 0.0,
            rehyp_yield_accrued: 0.0,
            borrow_cost_accrued: 0.0,
            ops_cost_accrued: 0.0,
            initial_trevee_plusd: trevee_plusd,
            initial_trevee_usdt0: trevee_usdt0,
            step: 0,
        }
    }

    /// LP deposits only plUSD; the entire USDT0 side of the pool is borrowed.
    pub fn one_sided(plusd_reserve: f64, usdt0_reserve: f64, deposit_plusd: f64, rehyp_fraction: f64) -> Self {
        Self::new(
            plusd_reserve,
            usdt0_reserve,
            deposit_plusd,
            0.0,
            deposit_plusd * rehyp_fraction,
            usdt0_reserve,
        )
    }

    pub fn total_liquidity(&self) -> f64 {
        self.plusd_reserve + self.usdt0_reserve
    }

    pub fn lp_liquidity(&self) -> f64 {
        self.trevee_plusd + self.trevee_usdt0.abs()
    }

    /// Fraction of pool liquidity attributed to the LP, 0 for an empty pool.
    pub fn lp_share(&self) -> f64 {
        let total = self.total_liquidity();
        if total > 0.0 {
            self.lp_liquidity() / total
        } else {
            0.0
        }
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_trevee_plusd + self.initial_trevee_usdt0
    }

    pub fn validate(&self) -> Result<(), SimError> {
        let non_negative = [
            ("plusd_reserve", self.plusd_reserve),
            ("usdt0_reserve", self.usdt0_reserve),
            ("trevee_plusd", self.trevee_plusd),
            ("rehypothecated_plusd", self.rehypothecated_plusd),
            ("borrowed_usdt0", self.borrowed_usdt0),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::invalid(
                    field,
                    format!("must be finite and non-negative, got {}", value),
                ));
            }
        }
        if !self.trevee_usdt0.is_finite() {
            return Err(SimError::invalid("trevee_usdt0", "must be finite"));
        }
        Ok(())
    }
}
