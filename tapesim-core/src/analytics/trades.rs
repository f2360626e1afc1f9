//! Closed-trade extraction from an order history.
//!
//! Replays the filled-order sequence with the same volume-weighted
//! average-cost rule the broker uses, so realized P&L per closing fill can
//! be derived from the order list alone. Rejected orders are skipped.

use crate::domain::{Order, OrderSide};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One closing fill with its realized P&L.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub symbol: String,
    pub quantity: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
    pub timestamp: DateTime<Utc>,
}

impl ClosedTrade {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct CostBasis {
    quantity: f64,
    avg_price: f64,
}

/// Walk the order history and emit one `ClosedTrade` per filled sell.
pub fn extract_closed_trades(orders: &[Order]) -> Vec<ClosedTrade> {
    let mut basis: HashMap<&str, CostBasis> = HashMap::new();
    let mut trades = Vec::new();

    for order in orders.iter().filter(|o| o.is_filled()) {
        let price = match order.fill_price {
            Some(p) => p,
            None => continue,
        };
        let entry = basis.entry(order.symbol.as_str()).or_default();

        match order.side {
            OrderSide::Buy => {
                let total = entry.quantity + order.quantity;
                entry.avg_price =
                    (entry.avg_price * entry.quantity + price * order.quantity) / total;
                entry.quantity = total;
            }
            OrderSide::Sell => {
                trades.push(ClosedTrade {
                    symbol: order.symbol.clone(),
                    quantity: order.quantity,
                    entry_price: entry.avg_price,
                    exit_price: price,
                    pnl: (price - entry.avg_price) * order.quantity,
                    timestamp: order.timestamp,
                });
                entry.quantity -= order.quantity;
                if entry.quantity <= 1e-12 {
                    entry.quantity = 0.0;
                    entry.avg_price = 0.0;
                }
            }
        }
    }

    trades
}
