//! Virtual broker — sole authority for cash, positions, and fills.
//!
//! Orders execute against the latest observed price with deterministic
//! commission and slippage formulas. Rejections are recorded in the order
//! history and surfaced to the caller; they never corrupt broker state.

use crate::clock::Clock;
use crate::domain::{
    IdGen, Order, OrderKind, OrderSide, OrderStatus, PortfolioSnapshot, Position,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Order rejection reasons. All are local to the broker and non-fatal to a run.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("no price data for '{symbol}'")]
    NoPriceData { symbol: String },

    #[error("insufficient funds: order requires {required:.2}, cash is {available:.2}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("insufficient position in '{symbol}': requested {requested}, held {held}")]
    InsufficientPosition {
        symbol: String,
        requested: f64,
        held: f64,
    },

    #[error("invalid order quantity: {quantity}")]
    InvalidQuantity { quantity: f64 },

    #[error("limit order for '{symbol}' has no limit price")]
    MissingLimitPrice { symbol: String },
}

/// Simulated broker for one run.
///
/// Owns the portfolio exclusively: cash, per-symbol positions, and the full
/// order history. Construction takes the commission rate (fraction of
/// notional), slippage rate (fraction of price), and the run's clock.
pub struct Broker {
    cash: f64,
    initial_capital: f64,
    commission_rate: f64,
    slippage_rate: f64,
    clock: Arc<dyn Clock>,
    positions: HashMap<String, Position>,
    last_prices: HashMap<String, f64>,
    orders: Vec<Order>,
    ids: IdGen,
    total_commission: f64,
    total_slippage: f64,
    realized_pnl: f64,
}

impl Broker {
    pub fn new(
        initial_capital: f64,
        commission_rate: f64,
        slippage_rate: f64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cash: initial_capital,
            initial_capital,
            commission_rate,
            slippage_rate,
            clock,
            positions: HashMap::new(),
            last_prices: HashMap::new(),
            orders: Vec::new(),
            ids: IdGen::default(),
            total_commission: 0.0,
            total_slippage: 0.0,
            realized_pnl: 0.0,
        }
    }

    /// Record the latest observed price and re-mark any open position.
    pub fn update_price(&mut self, symbol: &str, price: f64) {
        self.last_prices.insert(symbol.to_string(), price);
        if let Some(pos) = self.positions.get_mut(symbol) {
            pos.mark(price);
        }
    }

    /// Submit an order for immediate execution.
    ///
    /// On success the returned order is `Filled` with execution price,
    /// commission, and per-unit slippage recorded. On failure the order is
    /// recorded as `Rejected` in the history and the error is returned.
    pub fn submit_order(
        &mut self,
        symbol: &str,
        side: OrderSide,
        kind: OrderKind,
        quantity: f64,
        limit_price: Option<f64>,
    ) -> Result<Order, BrokerError> {
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(self.reject(
                symbol,
                side,
                kind,
                quantity,
                limit_price,
                BrokerError::InvalidQuantity { quantity },
            ));
        }

        let last_price = match self.last_prices.get(symbol) {
            Some(&p) => p,
            None => {
                return Err(self.reject(
                    symbol,
                    side,
                    kind,
                    quantity,
                    limit_price,
                    BrokerError::NoPriceData {
                        symbol: symbol.to_string(),
                    },
                ));
            }
        };

        // Execution price: market orders slip in the adverse direction for
        // the trader; limit orders fill at the limit price as-is.
        let exec_price = match kind {
            OrderKind::Market => match side {
                OrderSide::Buy => last_price * (1.0 + self.slippage_rate),
                OrderSide::Sell => last_price * (1.0 - self.slippage_rate),
            },
            OrderKind::Limit => match limit_price {
                Some(p) => p,
                None => {
                    return Err(self.reject(
                        symbol,
                        side,
                        kind,
                        quantity,
                        limit_price,
                        BrokerError::MissingLimitPrice {
                            symbol: symbol.to_string(),
                        },
                    ));
                }
            },
        };

        let commission = exec_price * quantity * self.commission_rate;
        let slippage = match kind {
            OrderKind::Market => (exec_price - last_price).abs(),
            OrderKind::Limit => 0.0,
        };

        match side {
            OrderSide::Buy => {
                let required = exec_price * quantity + commission;
                if required > self.cash {
                    return Err(self.reject(
                        symbol,
                        side,
                        kind,
                        quantity,
                        limit_price,
                        BrokerError::InsufficientFunds {
                            required,
                            available: self.cash,
                        },
                    ));
                }
                self.cash -= required;
                match self.positions.get_mut(symbol) {
                    Some(pos) => pos.add(quantity, exec_price),
                    None => {
                        let mut pos = Position::open(symbol.to_string(), quantity, exec_price);
                        pos.mark(last_price);
                        self.positions.insert(symbol.to_string(), pos);
                    }
                }
            }
            OrderSide::Sell => {
                let held = self.positions.get(symbol).map_or(0.0, |p| p.quantity);
                if quantity > held {
                    return Err(self.reject(
                        symbol,
                        side,
                        kind,
                        quantity,
                        limit_price,
                        BrokerError::InsufficientPosition {
                            symbol: symbol.to_string(),
                            requested: quantity,
                            held,
                        },
                    ));
                }
                self.cash += exec_price * quantity - commission;
                // Position is present: held >= quantity > 0.
                if let Some(pos) = self.positions.get_mut(symbol) {
                    let pnl = pos.reduce(quantity, exec_price);
                    self.realized_pnl += pnl;
                    if pos.is_flat() {
                        self.positions.remove(symbol);
                    }
                }
            }
        }

        self.total_commission += commission;
        self.total_slippage += slippage * quantity;

        let order = Order {
            id: self.ids.next_order_id(),
            symbol: symbol.to_string(),
            side,
            kind,
            quantity,
            limit_price,
            status: OrderStatus::Filled,
            timestamp: self.clock.now(),
            fill_price: Some(exec_price),
            commission,
            slippage,
        };
        self.orders.push(order.clone());
        Ok(order)
    }

    /// Record a rejected order in the history and hand the error back.
    fn reject(
        &mut self,
        symbol: &str,
        side: OrderSide,
        kind: OrderKind,
        quantity: f64,
        limit_price: Option<f64>,
        error: BrokerError,
    ) -> BrokerError {
        self.orders.push(Order {
            id: self.ids.next_order_id(),
            symbol: symbol.to_string(),
            side,
            kind,
            quantity,
            limit_price,
            status: OrderStatus::Rejected {
                reason: error.to_string(),
            },
            timestamp: self.clock.now(),
            fill_price: None,
            commission: 0.0,
            slippage: 0.0,
        });
        error
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn last_price(&self, symbol: &str) -> Option<f64> {
        self.last_prices.get(symbol).copied()
    }

    /// Current portfolio snapshot: cash, positions, computed total value.
    pub fn portfolio(&self) -> PortfolioSnapshot {
        let position_value: f64 = self.positions.values().map(Position::market_value).sum();
        PortfolioSnapshot {
            cash: self.cash,
            initial_capital: self.initial_capital,
            positions: self.positions.clone(),
            total_value: self.cash + position_value,
        }
    }

    /// Full order history, filled and rejected, in submission order.
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn total_commission(&self) -> f64 {
        self.total_commission
    }

    pub fn total_slippage(&self) -> f64 {
        self.total_slippage
    }
}
