//! AMM and Finance Math
//!
//! Stateless closed-form functions used by the simulation engine.
//!
//! ## Contents
//! - Constant-product swap (`x * y = k`) with the fee retained in the pool
//! - Continuous-compounding accrual for yields and borrow cost
//! - Price impact, mark-to-market, pool share
//! - Impermanent loss against holding the initial balances
//! - Liquidation risk (LTV against a borrow multiple)
//!
//! Degenerate inputs (empty pool, zero collateral) resolve to sentinel values
//! rather than errors: `0.0`, or `f64::INFINITY` for LTV.

use serde::{Deserialize, Serialize};

pub const BPS_DENOMINATOR: f64 = 10_000.0;

/// Result of a constant-product swap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SwapOutcome {
    pub amount_out: f64,
    pub new_reserve_in: f64,
    pub new_reserve_out: f64,
}

/// Swaps `x_in` of X into a constant-product pool holding `(x_reserve, y_reserve)`.
///
/// The fee only shrinks the input used for pricing; the full `x_in` is
/// credited to the X reserve, so `k` grows by the fee revenue.
///
/// Callers must ensure both reserves are positive when `x_in > 0`.
pub fn swap_xy(x_reserve: f64, y_reserve: f64, x_in: f64, fee_bps: f64) -> SwapOutcome {
    if x_in <= 0.0 {
        return SwapOutcome {
            amount_out: 0.0,
            new_reserve_in: x_reserve,
            new_reserve_out: y_reserve,
        };
    }

    let x_in_after_fee = x_in * (1.0 - fee_bps / BPS_DENOMINATOR);
    let k = x_reserve * y_reserve;
    let new_y = k / (x_reserve + x_in_after_fee);

    SwapOutcome {
        amount_out: y_reserve - new_y,
        new_reserve_in: x_reserve + x_in,
        new_reserve_out: new_y,
    }
}

/// Interest earned on `balance` over `dt_years` at a continuously compounded `apr`.
///
/// Returns only the accrual, not the principal.
pub fn accrue_rate(balance: f64, apr: f64, dt_years: f64) -> f64 {
    if balance <= 0.0 || apr == 0.0 {
        return 0.0;
    }
    balance * ((apr * dt_years).exp() - 1.0)
}

/// Relative gap between spot price `y/x` and the fee-free execution price of `x_in`.
pub fn compute_price_impact(x_reserve: f64, y_reserve: f64, x_in: f64) -> f64 {
    if x_in <= 0.0 || x_reserve <= 0.0 || y_reserve <= 0.0 {
        return 0.0;
    }

    let price_before = y_reserve / x_reserve;
    let amount_out = swap_xy(x_reserve, y_reserve, x_in, 0.0).amount_out;
    let price_effective = amount_out / x_in;

    (price_effective - price_before).abs() / price_before
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImpermanentLoss {
    pub hodl_value: f64,
    pub lp_value: f64,
    pub il_absolute: f64,
    /// `il_absolute / hodl_value` as a decimal; 0 when the hold value is not positive.
    pub il_ratio: f64,
}

/// Compares the current position with simply holding the initial balances,
/// both marked at the current prices. Positive means the position is ahead.
pub fn compute_il_vs_hold(
    initial_plusd: f64,
    initial_usdt0: f64,
    current_plusd: f64,
    current_usdt0: f64,
    price_plusd: f64,
    price_usdt0: f64,
) -> ImpermanentLoss {
    let hodl_value = mark_to_market(initial_plusd, initial_usdt0, price_plusd, price_usdt0);
    let lp_value = mark_to_market(current_plusd, current_usdt0, price_plusd, price_usdt0);
    let il_absolute = lp_value - hodl_value;
    let il_ratio = if hodl_value > 0.0 {
        il_absolute / hodl_value
    } else {
        0.0
    };

    ImpermanentLoss {
        hodl_value,
        lp_value,
        il_absolute,
        il_ratio,
    }
}

pub fn mark_to_market(plusd_balance: f64, usdt0_balance: f64, plusd_price: f64, usdt0_price: f64) -> f64 {
    plusd_balance * plusd_price + usdt0_balance * usdt0_price
}

/// Share of the pool held by the LP, valuing both assets 1:1.
pub fn calculate_pool_share(lp_plusd: f64, lp_usdt0: f64, total_plusd: f64, total_usdt0: f64) -> f64 {
    let total_value = total_plusd + total_usdt0;
    if total_value <= 0.0 {
        return 0.0;
    }
    (lp_plusd + lp_usdt0) / total_value
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LiquidationRisk {
    pub ltv: f64,
    pub at_risk: bool,
    /// Borrowed amount over the maximum borrowable amount.
    pub utilization: f64,
    pub max_borrow: f64,
}

/// Loan-to-value of `borrowed_usdt0` against plUSD collateral.
///
/// With no collateral value, any debt means `ltv = inf` and the position is at risk.
pub fn check_liquidation_risk(
    borrowed_usdt0: f64,
    collateral_plusd: f64,
    max_borrow_multiple: f64,
    plusd_price: f64,
) -> LiquidationRisk {
    let collateral_value = collateral_plusd * plusd_price;

    if collateral_value <= 0.0 {
        let has_debt = borrowed_usdt0 > 0.0;
        return LiquidationRisk {
            ltv: if has_debt { f64::INFINITY } else { 0.0 },
            at_risk: has_debt,
            utilization: if has_debt { 1.0 } else { 0.0 },
            max_borrow: 0.0,
        };
    }

    let ltv = borrowed_usdt0 / collateral_value;
    let max_borrow = collateral_value * max_borrow_multiple;
    let utilization = if max_borrow > 0.0 {
        borrowed_usdt0 / max_borrow
    } else {
        0.0
    };

    LiquidationRisk {
        ltv,
        at_risk: ltv >= max_borrow_multiple,
        utilization,
        max_borrow,
    }
}
