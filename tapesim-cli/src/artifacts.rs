//! Result artifact export (JSON/CSV).

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use tapesim_core::analytics::extract_closed_trades;
use tapesim_core::engine::BacktestResult;

/// Write `metrics.json`, `equity.csv`, and `trades.csv` into `dir`.
pub fn write_artifacts(dir: &Path, result: &BacktestResult) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create artifact dir {}", dir.display()))?;
    write_metrics_json(&dir.join("metrics.json"), result)?;
    write_equity_csv(&dir.join("equity.csv"), result)?;
    write_trades_csv(&dir.join("trades.csv"), result)?;
    Ok(())
}

fn write_metrics_json(path: &Path, result: &BacktestResult) -> Result<()> {
    let json = serde_json::to_string_pretty(&result.metrics)?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write metrics {}", path.display()))?;
    Ok(())
}

fn write_equity_csv(path: &Path, result: &BacktestResult) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("failed to create equity CSV {}", path.display()))?;
    writeln!(file, "timestamp,equity,drawdown")?;
    for (point, drawdown) in result.equity_curve.iter().zip(&result.drawdown_curve) {
        writeln!(
            file,
            "{},{:.4},{:.6}",
            point.timestamp.to_rfc3339(),
            point.value,
            drawdown
        )?;
    }
    Ok(())
}

fn write_trades_csv(path: &Path, result: &BacktestResult) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("failed to create trades CSV {}", path.display()))?;
    writeln!(file, "timestamp,symbol,quantity,entry_price,exit_price,pnl")?;
    for trade in extract_closed_trades(&result.orders) {
        writeln!(
            file,
            "{},{},{},{:.4},{:.4},{:.4}",
            trade.timestamp.to_rfc3339(),
            trade.symbol,
            trade.quantity,
            trade.entry_price,
            trade.exit_price,
            trade.pnl
        )?;
    }
    Ok(())
}
