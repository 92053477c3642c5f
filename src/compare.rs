//! Scenario Comparison
//!
//! Runs several scenarios to completion and lays their summaries side by side.
//! Every scenario gets its own engine and RNG, so results do not depend on
//! the order scenarios are run in.

use std::cmp::Ordering;

use crate::config::ScenarioConfig;
use crate::engine::SimulationEngine;
use crate::error::{ConfigError, SimError};
use crate::params::SimulationParams;
use crate::summary::Summary;

const LABEL_WIDTH: usize = 24;
const COLUMN_WIDTH: usize = 20;

#[derive(Clone, Debug)]
pub struct ScenarioOutcome {
    pub name: String,
    pub params: SimulationParams,
    pub summary: Summary,
}

pub fn run_scenario(name: impl Into<String>, config: &ScenarioConfig) -> Result<ScenarioOutcome, ConfigError> {
    let (params, state) = config.resolve()?;
    let mut engine = SimulationEngine::new(params.clone(), state)?;
    engine.run();
    let summary = engine.summary().ok_or(SimError::EmptyRun)?;

    Ok(ScenarioOutcome {
        name: name.into(),
        params,
        summary,
    })
}

type Metric = (&'static str, fn(&ScenarioOutcome) -> String);

const METRICS: &[Metric] = &[
    ("Horizon (days)", |s| s.summary.horizon_days.to_string()),
    ("Initial Capital", |s| format!("${:.0}", s.summary.initial_capital)),
    ("Final NAV", |s| format!("${:.0}", s.summary.final_nav)),
    ("", |_| String::new()),
    ("Total Fees", |s| format!("${:.0}", s.summary.total_fees)),
    ("Total Yields", |s| format!("${:.0}", s.summary.total_yields)),
    ("Borrow Cost", |s| format!("-${:.0}", s.summary.total_borrow_cost)),
    ("Ops Cost", |s| format!("-${:.0}", s.summary.total_ops_cost)),
    ("IL %", |s| format!("{:.2}%", s.summary.final_il_ratio * 100.0)),
    ("", |_| String::new()),
    ("Net P&L", |s| format!("${:.0}", s.summary.net_pnl)),
    ("Total Return", |s| format!("{:.2}%", s.summary.total_return_pct())),
    ("Annual Return", |s| format!("{:.2}%", s.summary.annualized_return_pct())),
    ("Max Drawdown", |s| format!("{:.2}%", s.summary.max_drawdown_pct)),
    ("", |_| String::new()),
    ("Fee Rate (bps)", |s| format!("{}", s.params.fee_bps)),
    ("Flow Rate (bps)", |s| format!("{}", s.params.deterministic_schedule_bps)),
    ("Rehyp APR", |s| format!("{:.1}%", s.params.rehyp_yield_apr * 100.0)),
    ("Final LTV", |s| format!("{:.1}%", s.summary.final_ltv * 100.0)),
];

pub struct ComparisonTable {
    scenarios: Vec<ScenarioOutcome>,
}

impl ComparisonTable {
    pub fn new(scenarios: Vec<ScenarioOutcome>) -> Self {
        Self { scenarios }
    }

    pub fn scenarios(&self) -> &[ScenarioOutcome] {
        &self.scenarios
    }

    fn best_by(&self, key: impl Fn(&Summary) -> f64, want: Ordering) -> Option<&ScenarioOutcome> {
        self.scenarios
            .iter()
            .reduce(|best, s| if key(&s.summary).total_cmp(&key(&best.summary)) == want { s } else { best })
    }

    pub fn best_annual_return(&self) -> Option<&ScenarioOutcome> {
        self.best_by(|s| s.annualized_return, Ordering::Greater)
    }

    pub fn most_fees(&self) -> Option<&ScenarioOutcome> {
        self.best_by(|s| s.total_fees, Ordering::Greater)
    }

    pub fn lowest_ltv(&self) -> Option<&ScenarioOutcome> {
        self.best_by(|s| s.final_ltv, Ordering::Less)
    }

    pub fn render(&self) -> String {
        let width = LABEL_WIDTH + COLUMN_WIDTH * self.scenarios.len().max(1);
        let mut out = String::new();

        out.push_str(&format!("{:<LABEL_WIDTH$}", "Metric"));
        for s in &self.scenarios {
            out.push_str(&format!("{:<COLUMN_WIDTH$}", s.name));
        }
        out.push('\n');
        out.push_str(&"-".repeat(width));
        out.push('\n');

        for (label, getter) in METRICS {
            if label.is_empty() {
                out.push('\n');
                continue;
            }
            out.push_str(&format!("{:<LABEL_WIDTH$}", label));
            for s in &self.scenarios {
                out.push_str(&format!("{:<COLUMN_WIDTH$}", getter(s)));
            }
            out.push('\n');
        }

        out
    }

    pub fn recommendations(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(s) = self.best_annual_return() {
            lines.push(format!(
                "Best annual return: {} ({:.2}%)",
                s.name,
                s.summary.annualized_return_pct()
            ));
        }
        if let Some(s) = self.most_fees() {
            lines.push(format!("Most fees earned: {} (${:.0})", s.name, s.summary.total_fees));
        }
        if let Some(s) = self.lowest_ltv() {
            lines.push(format!("Lowest risk (LTV): {} ({:.1}%)", s.name, s.summary.final_ltv * 100.0));
        }
        lines
    }

    pub fn print(&self) {
        print!("{}", self.render());
        println!();
        println!("Recommendations:");
        for line in self.recommendations() {
            println!("  - {}", line);
        }
    }
}
