//! Run Summary
//!
//! Reduces the ordered step series to end-of-run performance figures.
//! Returns and IL are decimal ratios; max drawdown is in percent.

use serde::{Deserialize, Serialize};

use crate::engine::StepResult;
use crate::params::{SimulationParams, DAYS_PER_YEAR};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub horizon_days: u32,
    pub initial_capital: f64,
    pub final_nav: f64,
    pub net_pnl: f64,
    pub total_return: f64,
    pub annualized_return: f64,

    pub total_fees: f64,
    pub total_yields: f64,
    pub total_borrow_cost: f64,
    pub total_ops_cost: f64,

    pub final_il_ratio: f64,
    pub final_borrowed_usdt0: f64,
    pub final_ltv: f64,
    pub max_drawdown_pct: f64,
}

impl Summary {
    pub fn from_results(params: &SimulationParams, initial_capital: f64, results: &[StepResult]) -> Option<Self> {
        let last = results.last()?;

        let (total_return, annualized_return) = if initial_capital > 0.0 && params.horizon_days > 0 {
            let total = last.net_pnl / initial_capital;
            (total, total * DAYS_PER_YEAR / f64::from(params.horizon_days))
        } else {
            (0.0, 0.0)
        };

        Some(Self {
            horizon_days: params.horizon_days,
            initial_capital,
            final_nav: last.lp_nav,
            net_pnl: last.net_pnl,
            total_return,
            annualized_return,
            total_fees: last.total_fees,
            total_yields: last.total_yields(),
            total_borrow_cost: last.total_borrow_cost,
            total_ops_cost: last.total_ops_cost,
            final_il_ratio: last.il_ratio,
            final_borrowed_usdt0: last.borrowed_usdt0,
            final_ltv: last.ltv,
            max_drawdown_pct: max_drawdown_pct(results.iter().map(|r| r.lp_nav)),
        })
    }

    pub fn total_return_pct(&self) -> f64 {
        self.total_return * 100.0
    }

    pub fn annualized_return_pct(&self) -> f64 {
        self.annualized_return * 100.0
    }

    pub fn print(&self) {
        println!("Time Horizon:            {} days", self.horizon_days);
        println!("Initial Capital:         ${:.2}", self.initial_capital);
        println!("Final NAV:               ${:.2}", self.final_nav);
        println!();
        println!("P&L Breakdown");
        println!("{}", "-".repeat(50));
        println!("  Total fees earned:     ${:.2}", self.total_fees);
        println!("  Total yields:          ${:.2}", self.total_yields);
        println!("  Total borrow cost:    -${:.2}", self.total_borrow_cost);
        println!("  Total ops cost:       -${:.2}", self.total_ops_cost);
        println!("  Impermanent loss:      {:.2}%", self.final_il_ratio * 100.0);
        println!("  Net P&L:               ${:.2}", self.net_pnl);
        println!();
        println!("Returns");
        println!("{}", "-".repeat(50));
        println!("  Total return:          {:.2}%", self.total_return_pct());
        println!("  Annualized return:     {:.2}%", self.annualized_return_pct());
        println!("  Max drawdown:          {:.2}%", self.max_drawdown_pct);
        println!();
        println!("Risk");
        println!("{}", "-".repeat(50));
        println!("  Final borrowed USDT0:  ${:.2}", self.final_borrowed_usdt0);
        println!("  Final LTV:             {:.2}%", self.final_ltv * 100.0);
    }

    pub fn one_line(&self) -> String {
        format!(
            "Net P&L: ${:.2} | Return: {:.2}% | APR: {:.2}%",
            self.net_pnl,
            self.total_return_pct(),
            self.annualized_return_pct()
        )
    }
}

/// Largest peak-to-trough NAV decline, in percent, over a single forward pass.
///
/// Points where the running peak is not positive contribute 0. A decline
/// past zero NAV is capped at 100%.
pub fn max_drawdown_pct(navs: impl IntoIterator<Item = f64>) -> f64 {
    let mut navs = navs.into_iter();
    let Some(first) = navs.next() else {
        return 0.0;
    };

    let mut peak = first;
    let mut max_dd: f64 = 0.0;

    for nav in std::iter::once(first).chain(navs) {
        if nav > peak {
            peak = nav;
        }
        let dd = if peak > 0.0 { ((peak - nav) / peak).min(1.0) } else { 0.0 };
        max_dd = max_dd.max(dd);
    }

    max_dd * 100.0
}
