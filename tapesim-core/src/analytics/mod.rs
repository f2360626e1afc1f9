//! Performance analytics — pure functions over orders and the equity curve.
//!
//! Every metric is a pure function: order history and/or equity values in,
//! scalar out. No dependencies on the engine or broker internals.

pub mod drawdown;
pub mod trades;

pub use drawdown::{drawdown_curve, max_drawdown, max_drawdown_duration};
pub use trades::{extract_closed_trades, ClosedTrade};

use crate::domain::Order;
use crate::engine::EquityPoint;
use serde::{Deserialize, Serialize};

/// Trading periods per year, for annualization.
const PERIODS_PER_YEAR: f64 = 252.0;

/// Sentinel profit factor when there are winners but no losing trades.
const PROFIT_FACTOR_CAP: f64 = 100.0;

/// Aggregate performance metrics for a completed run.
///
/// Recomputed once at run completion and never mutated afterward.
/// Invariant: `total_trades == winning_trades + losing_trades`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    /// Positive fraction (0.15 = 15% decline from peak).
    pub max_drawdown: f64,
    /// Longest span below a prior peak, in bars.
    pub max_drawdown_duration: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub avg_win: f64,
    /// Mean losing P&L (a negative number, 0 when there are no losers).
    pub avg_loss: f64,
    pub largest_win: f64,
    /// Most negative losing P&L (0 when there are no losers).
    pub largest_loss: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics from the order history and equity curve.
    pub fn compute(orders: &[Order], equity_curve: &[EquityPoint], initial_capital: f64) -> Self {
        let values: Vec<f64> = equity_curve.iter().map(|p| p.value).collect();
        let closed = extract_closed_trades(orders);

        let wins: Vec<f64> = closed.iter().filter(|t| t.is_winner()).map(|t| t.pnl).collect();
        let losses: Vec<f64> = closed.iter().filter(|t| !t.is_winner()).map(|t| t.pnl).collect();

        let total_return = total_return(&values, initial_capital);

        Self {
            total_return,
            annualized_return: annualized_return(total_return, values.len()),
            sharpe_ratio: sharpe_ratio(&values, 0.0),
            max_drawdown: max_drawdown(&values),
            max_drawdown_duration: max_drawdown_duration(&values),
            win_rate: win_rate(&closed),
            profit_factor: profit_factor(&closed),
            total_trades: closed.len(),
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            avg_win: mean(&wins),
            avg_loss: mean(&losses),
            largest_win: wins.iter().copied().fold(0.0, f64::max),
            largest_loss: losses.iter().copied().fold(0.0, f64::min),
        }
    }
}

/// Total return as a fraction of initial capital.
pub fn total_return(equity: &[f64], initial_capital: f64) -> f64 {
    if initial_capital <= 0.0 {
        return 0.0;
    }
    match equity.last() {
        Some(&final_value) => (final_value - initial_capital) / initial_capital,
        None => 0.0,
    }
}

/// Total return scaled to a 252-trading-day year.
pub fn annualized_return(total_return: f64, trading_days: usize) -> f64 {
    if trading_days == 0 {
        return 0.0;
    }
    total_return * (PERIODS_PER_YEAR / trading_days as f64)
}

/// Annualized Sharpe ratio over period-over-period equity returns.
///
/// `(mean(returns) - risk_free) / std(returns) * sqrt(252)`; 0 when the
/// return standard deviation is 0 or there are fewer than 2 periods.
pub fn sharpe_ratio(equity: &[f64], risk_free_rate: f64) -> f64 {
    let returns = period_returns(equity);
    if returns.len() < 2 {
        return 0.0;
    }
    let rf_per_period = risk_free_rate / PERIODS_PER_YEAR;
    let excess: Vec<f64> = returns.iter().map(|r| r - rf_per_period).collect();
    let std = std_dev(&excess);
    if std < 1e-15 {
        return 0.0;
    }
    (mean(&excess) / std) * PERIODS_PER_YEAR.sqrt()
}

/// Fraction of closed trades that were winners (0 when there are none).
pub fn win_rate(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Gross profits / gross losses.
///
/// Capped at 100.0 as the no-losses sentinel; 0 with no trades or no
/// winners.
pub fn profit_factor(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 {
            PROFIT_FACTOR_CAP
        } else {
            0.0
        };
    }
    (gross_profit / gross_loss).min(PROFIT_FACTOR_CAP)
}

/// Period-over-period returns of an equity curve.
pub fn period_returns(equity: &[f64]) -> Vec<f64> {
    if equity.len() < 2 {
        return Vec::new();
    }
    equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderId, OrderKind, OrderSide, OrderStatus};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn ts(i: usize) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap() + Duration::days(i as i64)
    }

    fn fill(id: u64, side: OrderSide, quantity: f64, price: f64) -> Order {
        Order {
            id: OrderId(id),
            symbol: "BTC".into(),
            side,
            kind: OrderKind::Market,
            quantity,
            limit_price: None,
            status: OrderStatus::Filled,
            timestamp: ts(id as usize),
            fill_price: Some(price),
            commission: 0.0,
            slippage: 0.0,
        }
    }

    fn curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &value)| EquityPoint {
                timestamp: ts(i),
                value,
            })
            .collect()
    }

    #[test]
    fn total_return_from_final_value() {
        assert!((total_return(&[10_000.0, 11_000.0], 10_000.0) - 0.1).abs() < 1e-12);
        assert_eq!(total_return(&[], 10_000.0), 0.0);
    }

    #[test]
    fn annualized_return_scales_by_trading_days() {
        // 10% over 126 days annualizes to 20%.
        assert!((annualized_return(0.1, 126) - 0.2).abs() < 1e-12);
        assert_eq!(annualized_return(0.1, 0), 0.0);
    }

    #[test]
    fn sharpe_zero_for_constant_equity() {
        assert_eq!(sharpe_ratio(&[100.0, 100.0, 100.0], 0.0), 0.0);
    }

    #[test]
    fn sharpe_positive_for_steady_gains() {
        let equity: Vec<f64> = (0..50).map(|i| 10_000.0 * (1.0 + 0.001 * i as f64)).collect();
        assert!(sharpe_ratio(&equity, 0.0) > 0.0);
    }

    #[test]
    fn trade_count_identity_holds() {
        let orders = vec![
            fill(0, OrderSide::Buy, 1.0, 100.0),
            fill(1, OrderSide::Sell, 1.0, 110.0), // win
            fill(2, OrderSide::Buy, 1.0, 110.0),
            fill(3, OrderSide::Sell, 1.0, 105.0), // loss
            fill(4, OrderSide::Buy, 1.0, 105.0),
            fill(5, OrderSide::Sell, 1.0, 120.0), // win
        ];
        let metrics =
            PerformanceMetrics::compute(&orders, &curve(&[10_000.0, 10_020.0]), 10_000.0);

        assert_eq!(metrics.total_trades, 3);
        assert_eq!(
            metrics.total_trades,
            metrics.winning_trades + metrics.losing_trades
        );
        assert!((metrics.win_rate - 2.0 / 3.0).abs() < 1e-12);
        assert!((metrics.avg_win - 12.5).abs() < 1e-9);
        assert!((metrics.avg_loss - (-5.0)).abs() < 1e-9);
        assert!((metrics.largest_win - 15.0).abs() < 1e-9);
        assert!((metrics.largest_loss - (-5.0)).abs() < 1e-9);
        assert!((metrics.profit_factor - 5.0).abs() < 1e-9);
    }

    #[test]
    fn no_trades_yields_zeroed_trade_stats() {
        let metrics = PerformanceMetrics::compute(&[], &curve(&[10_000.0, 10_100.0]), 10_000.0);
        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.profit_factor, 0.0);
        assert_eq!(metrics.avg_win, 0.0);
        assert_eq!(metrics.largest_loss, 0.0);
    }

    #[test]
    fn profit_factor_capped_without_losses() {
        let orders = vec![
            fill(0, OrderSide::Buy, 1.0, 100.0),
            fill(1, OrderSide::Sell, 1.0, 110.0),
        ];
        let metrics =
            PerformanceMetrics::compute(&orders, &curve(&[10_000.0, 10_010.0]), 10_000.0);
        assert_eq!(metrics.profit_factor, 100.0);
    }

    #[test]
    fn drawdown_fields_come_from_equity() {
        let metrics = PerformanceMetrics::compute(
            &[],
            &curve(&[100.0, 110.0, 99.0, 104.5, 111.0]),
            100.0,
        );
        assert!((metrics.max_drawdown - 0.1).abs() < 1e-12);
        assert_eq!(metrics.max_drawdown_duration, 2);
    }

    #[test]
    fn metrics_serialization_roundtrip() {
        let metrics = PerformanceMetrics::compute(&[], &curve(&[100.0, 101.0]), 100.0);
        let json = serde_json::to_string(&metrics).unwrap();
        let deser: PerformanceMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(metrics.total_trades, deser.total_trades);
        assert_eq!(metrics.total_return, deser.total_return);
    }
}
