//! Order types and the order lifecycle.

use super::ids::OrderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// What kind of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    /// Fill at the latest observed price, adjusted by slippage.
    Market,
    /// Fill at the supplied limit price as-is (no slippage applied).
    Limit,
}

/// Order lifecycle states.
///
/// An order is created `Pending` and moves to exactly one terminal state
/// during submission. Once terminal it is never mutated again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Filled,
    Rejected { reason: String },
}

/// A single order as recorded by the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub quantity: f64,
    pub limit_price: Option<f64>,
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    /// Execution price. `None` unless the order filled.
    pub fill_price: Option<f64>,
    /// Commission charged on the fill (0 for rejected orders).
    pub commission: f64,
    /// Per-unit price difference caused by slippage (0 for limit fills).
    pub slippage: f64,
}

impl Order {
    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.status, OrderStatus::Rejected { .. })
    }

    /// Traded notional for a filled order.
    pub fn notional(&self) -> Option<f64> {
        self.fill_price.map(|p| p * self.quantity)
    }
}
