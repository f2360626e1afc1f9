//! Trading signals — the only channel from a strategy to the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a strategy wants to do with a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

/// One trading decision for one bar.
///
/// Signals are ephemeral: produced by `Strategy::on_bar`, consumed by the
/// engine in the same bar-processing step, and never persisted as a
/// first-class entity. A signal only materializes into an order if it is
/// actionable (buy/sell with a quantity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub action: SignalAction,
    pub quantity: Option<f64>,
    pub reason: String,
    pub confidence: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    pub fn buy(
        symbol: impl Into<String>,
        quantity: f64,
        reason: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            action: SignalAction::Buy,
            quantity: Some(quantity),
            reason: reason.into(),
            confidence: None,
            timestamp,
        }
    }

    pub fn sell(
        symbol: impl Into<String>,
        quantity: f64,
        reason: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            action: SignalAction::Sell,
            quantity: Some(quantity),
            reason: reason.into(),
            confidence: None,
            timestamp,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Whether this signal should produce an order.
    pub fn is_actionable(&self) -> bool {
        self.action != SignalAction::Hold && self.quantity.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn buy_signal_is_actionable() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let sig = Signal::buy("BTC", 0.1, "fast SMA crossed above slow SMA", ts);
        assert_eq!(sig.action, SignalAction::Buy);
        assert!(sig.is_actionable());
    }

    #[test]
    fn hold_signal_is_not_actionable() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let sig = Signal {
            symbol: "BTC".into(),
            action: SignalAction::Hold,
            quantity: None,
            reason: "warming up".into(),
            confidence: None,
            timestamp: ts,
        };
        assert!(!sig.is_actionable());
    }

    #[test]
    fn confidence_builder() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let sig = Signal::sell("BTC", 0.1, "RSI above overbought", ts).with_confidence(0.8);
        assert_eq!(sig.confidence, Some(0.8));
    }
}
