//! Flat CSV/JSON export of the step series.
//!
//! Column order is fixed; IL is written in percent to match the summary report.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::engine::StepResult;
use crate::error::ExportError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// JSON for a `.json` extension, CSV for anything else.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Csv,
        }
    }
}

#[derive(Debug, Serialize)]
struct ExportRecord {
    step: u64,
    time_days: f64,
    plusd_reserve: f64,
    usdt0_reserve: f64,
    trevee_plusd: f64,
    trevee_usdt0: f64,
    borrowed_usdt0: f64,
    trade_flow: f64,
    usdt0_out: f64,
    fee_earned: f64,
    underlying_yield: f64,
    rehyp_yield: f64,
    borrow_cost: f64,
    ops_cost: f64,
    total_fees: f64,
    total_underlying_yield: f64,
    total_rehyp_yield: f64,
    total_borrow_cost: f64,
    total_ops_cost: f64,
    lp_nav: f64,
    net_pnl: f64,
    il_percentage: f64,
    ltv: f64,
}

impl From<&StepResult> for ExportRecord {
    fn from(r: &StepResult) -> Self {
        Self {
            step: r.step,
            time_days: r.time_days,
            plusd_reserve: r.plusd_reserve,
            usdt0_reserve: r.usdt0_reserve,
            trevee_plusd: r.trevee_plusd,
            trevee_usdt0: r.trevee_usdt0,
            borrowed_usdt0: r.borrowed_usdt0,
            trade_flow: r.trade_flow,
            usdt0_out: r.usdt0_out,
            fee_earned: r.fee_earned,
            underlying_yield: r.underlying_yield,
            rehyp_yield: r.rehyp_yield,
            borrow_cost: r.borrow_cost,
            ops_cost: r.ops_cost,
            total_fees: r.total_fees,
            total_underlying_yield: r.total_underlying_yield,
            total_rehyp_yield: r.total_rehyp_yield,
            total_borrow_cost: r.total_borrow_cost,
            total_ops_cost: r.total_ops_cost,
            lp_nav: r.lp_nav,
            net_pnl: r.net_pnl,
            il_percentage: r.il_ratio * 100.0,
            ltv: r.ltv,
        }
    }
}

pub fn write_csv<W: Write>(results: &[StepResult], writer: W) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for result in results {
        csv_writer.serialize(ExportRecord::from(result))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(results: &[StepResult], writer: W) -> Result<(), ExportError> {
    let records: Vec<ExportRecord> = results.iter().map(ExportRecord::from).collect();
    serde_json::to_writer_pretty(writer, &records)?;
    Ok(())
}

pub fn export_to_path(results: &[StepResult], path: impl AsRef<Path>) -> Result<ExportFormat, ExportError> {
    let path = path.as_ref();
    let format = ExportFormat::from_path(path);
    let mut writer = BufWriter::new(File::create(path)?);

    match format {
        ExportFormat::Csv => write_csv(results, &mut writer)?,
        ExportFormat::Json => write_json(results, &mut writer)?,
    }
    writer.flush()?;

    info!(path = %path.display(), rows = results.len(), ?format, "results exported");
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SimulationEngine;
    use crate::params::{test_params, SimulationParams};
    use crate::state::PoolState;

    const HEADER: &str = "step,time_days,plusd_reserve,usdt0_reserve,trevee_plusd,trevee_usdt0,\
borrowed_usdt0,trade_flow,usdt0_out,fee_earned,underlying_yield,rehyp_yield,borrow_cost,ops_cost,\
total_fees,total_underlying_yield,total_rehyp_yield,total_borrow_cost,total_ops_cost,\
lp_nav,net_pnl,il_percentage,ltv";

    fn sample_results() -> Vec<StepResult> {
        let params = SimulationParams { horizon_days: 2, steps_per_day: 2, ..test_params() };
        let state = PoolState::one_sided(5_000_000.0, 5_000_000.0, 1_000_000.0, 0.6);
        let mut engine = SimulationEngine::new(params, state).unwrap();
        engine.run();
        engine.into_results()
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("out/results.json")), ExportFormat::Json);
        assert_eq!(ExportFormat::from_path(Path::new("results.JSON")), ExportFormat::Json);
        assert_eq!(ExportFormat::from_path(Path::new("results.csv")), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_path(Path::new("results")), ExportFormat::Csv);
    }

    #[test]
    fn test_csv_has_fixed_header_and_one_row_per_step() {
        let results = sample_results();
        let mut buf = Vec::new();
        write_csv(&results, &mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines.len(), results.len() + 1);
        assert!(lines[1].starts_with("0,0.0,"));
    }

    #[test]
    fn test_json_reports_il_in_percent() {
        let results = sample_results();
        let mut buf = Vec::new();
        write_json(&results, &mut buf).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), results.len());

        let last = rows.last().unwrap();
        let il_pct = last["il_percentage"].as_f64().unwrap();
        assert!((il_pct - results.last().unwrap().il_ratio * 100.0).abs() < 1e-9);
        assert_eq!(last["step"].as_u64(), Some(4));
    }

    #[test]
    fn test_json_carries_cumulative_accruals() {
        let results = sample_results();
        let mut buf = Vec::new();
        write_json(&results, &mut buf).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        let last_row = value.as_array().unwrap().last().unwrap();
        let last = results.last().unwrap();
        let columns = [
            ("total_fees", last.total_fees),
            ("total_underlying_yield", last.total_underlying_yield),
            ("total_rehyp_yield", last.total_rehyp_yield),
            ("total_borrow_cost", last.total_borrow_cost),
            ("total_ops_cost", last.total_ops_cost),
        ];
        for (column, expected) in columns {
            let written = last_row[column].as_f64().unwrap();
            assert!((written - expected).abs() <= expected.abs() * 1e-12, "{} mismatch", column);
        }
        assert!(last.total_fees > 0.0);
    }

    #[test]
    fn test_export_to_path_picks_format() {
        let results = sample_results();
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("run.json");
        assert_eq!(export_to_path(&results, &json_path).unwrap(), ExportFormat::Json);
        let json = std::fs::read_to_string(&json_path).unwrap();
        assert!(json.trim_start().starts_with('['));

        let csv_path = dir.path().join("run.csv");
        assert_eq!(export_to_path(&results, &csv_path).unwrap(), ExportFormat::Csv);
        let csv = std::fs::read_to_string(&csv_path).unwrap();
        assert!(csv.starts_with("step,time_days"));
    }
}
