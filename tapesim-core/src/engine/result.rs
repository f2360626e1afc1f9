//! Result types for a completed run.

use super::config::BacktestConfig;
use crate::analytics::PerformanceMetrics;
use crate::domain::{Order, PortfolioSnapshot, RunId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One equity curve sample: total portfolio value at a bar close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Complete result of a successful backtest run.
///
/// Assembled once at completion and immutable afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub run_id: RunId,
    pub config: BacktestConfig,
    pub metrics: PerformanceMetrics,
    /// Full order history, filled and rejected, in submission order.
    pub orders: Vec<Order>,
    pub equity_curve: Vec<EquityPoint>,
    /// Per-bar drawdown fractions, same length as the equity curve.
    pub drawdown_curve: Vec<f64>,
    pub final_portfolio: PortfolioSnapshot,
}

impl BacktestResult {
    /// Orders that actually filled.
    pub fn filled_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(|o| o.is_filled())
    }

    /// Orders the broker rejected.
    pub fn rejected_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(|o| o.is_rejected())
    }
}
