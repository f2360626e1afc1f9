//! Portfolio snapshot — cash plus all open positions at a point in time.

use super::position::Position;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Point-in-time copy of broker state.
///
/// The live portfolio is owned exclusively by one broker; snapshots are
/// handed to strategies, the equity curve, and the final result. The
/// accounting identity holds at every bar:
/// `total_value == cash + sum(position market values)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: HashMap<String, Position>,
    pub total_value: f64,
}

impl PortfolioSnapshot {
    /// Market value of all open positions.
    pub fn position_value(&self) -> f64 {
        self.positions.values().map(Position::market_value).sum()
    }

    /// Total return relative to initial capital.
    pub fn total_return(&self) -> f64 {
        if self.initial_capital <= 0.0 {
            return 0.0;
        }
        (self.total_value - self.initial_capital) / self.initial_capital
    }
}
