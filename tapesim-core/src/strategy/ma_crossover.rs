//! Moving average crossover — golden cross entry, death cross exit.
//!
//! Buys when the fast SMA crosses above the slow SMA and sells the whole
//! position on the cross-under. Warms up silently until both averages have
//! a value; the first bar with both values only records state, so a signal
//! needs a previous observation to compare against.

use super::{param_f64, param_usize, Params, Strategy, StrategyError};
use crate::broker::Broker;
use crate::domain::{Bar, Signal};
use crate::indicators::RollingSma;
use serde_json::json;

/// Fraction of cash committed per entry. Leaves headroom so slippage and
/// commission cannot push the order over available cash.
const DEFAULT_POSITION_PCT: f64 = 0.95;

pub struct MaCrossover {
    fast_period: usize,
    slow_period: usize,
    position_pct: f64,
    fast: RollingSma,
    slow: RollingSma,
    prev: Option<(f64, f64)>,
}

impl MaCrossover {
    pub fn new(fast_period: usize, slow_period: usize, position_pct: f64) -> Self {
        Self {
            fast_period,
            slow_period,
            position_pct,
            fast: RollingSma::new(fast_period),
            slow: RollingSma::new(slow_period),
            prev: None,
        }
    }
}

impl Default for MaCrossover {
    fn default() -> Self {
        Self::new(10, 30, DEFAULT_POSITION_PCT)
    }
}

impl Strategy for MaCrossover {
    fn id(&self) -> &str {
        "ma_crossover"
    }

    fn name(&self) -> &str {
        "Moving Average Crossover"
    }

    fn description(&self) -> &str {
        "Buys when the fast SMA crosses above the slow SMA, exits on the cross-under"
    }

    fn params(&self) -> Params {
        let mut params = Params::new();
        params.insert("fast_period".into(), json!(self.fast_period));
        params.insert("slow_period".into(), json!(self.slow_period));
        params.insert("position_pct".into(), json!(self.position_pct));
        params
    }

    fn validate_params(&self, params: &Params) -> Vec<String> {
        let mut errors = Vec::new();

        let fast = match param_usize(params, "fast_period") {
            Ok(v) => v.unwrap_or(self.fast_period),
            Err(e) => {
                errors.push(e.to_string());
                self.fast_period
            }
        };
        let slow = match param_usize(params, "slow_period") {
            Ok(v) => v.unwrap_or(self.slow_period),
            Err(e) => {
                errors.push(e.to_string());
                self.slow_period
            }
        };
        if fast < 1 {
            errors.push("fast_period must be >= 1".into());
        }
        if slow <= fast {
            errors.push("slow_period must be greater than fast_period".into());
        }

        match param_f64(params, "position_pct") {
            Ok(Some(pct)) if !(0.0..=1.0).contains(&pct) || pct == 0.0 => {
                errors.push("position_pct must be in (0, 1]".into());
            }
            Ok(_) => {}
            Err(e) => errors.push(e.to_string()),
        }

        errors
    }

    fn initialize(&mut self, params: &Params) -> Result<(), StrategyError> {
        let errors = self.validate_params(params);
        if let Some(first) = errors.into_iter().next() {
            return Err(StrategyError::Execution(first));
        }

        if let Some(fast) = param_usize(params, "fast_period")? {
            self.fast_period = fast;
        }
        if let Some(slow) = param_usize(params, "slow_period")? {
            self.slow_period = slow;
        }
        if let Some(pct) = param_f64(params, "position_pct")? {
            self.position_pct = pct;
        }

        self.fast = RollingSma::new(self.fast_period);
        self.slow = RollingSma::new(self.slow_period);
        self.prev = None;
        Ok(())
    }

    fn on_bar(&mut self, bar: &Bar, broker: &Broker) -> Result<Option<Signal>, StrategyError> {
        let fast = self.fast.push(bar.close);
        let slow = self.slow.push(bar.close);

        let (fast_cur, slow_cur) = match (fast, slow) {
            (Some(f), Some(s)) => (f, s),
            _ => return Ok(None), // still warming up
        };

        let signal = match self.prev {
            Some((fast_prev, slow_prev)) => {
                let holding = broker.position(&bar.symbol).is_some();
                if fast_cur > slow_cur && fast_prev <= slow_prev && !holding {
                    let quantity = broker.cash() * self.position_pct / bar.close;
                    if quantity > 0.0 {
                        Some(Signal::buy(
                            bar.symbol.clone(),
                            quantity,
                            "fast SMA crossed above slow SMA",
                            bar.timestamp,
                        ))
                    } else {
                        None
                    }
                } else if fast_cur < slow_cur && fast_prev >= slow_prev && holding {
                    let held = broker.position(&bar.symbol).map_or(0.0, |p| p.quantity);
                    Some(Signal::sell(
                        bar.symbol.clone(),
                        held,
                        "fast SMA crossed below slow SMA",
                        bar.timestamp,
                    ))
                } else {
                    None
                }
            }
            None => None,
        };

        self.prev = Some((fast_cur, slow_cur));
        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::HistoricalClock;
    use crate::domain::SignalAction;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;

    fn make_bar(i: usize, close: f64) -> Bar {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap() + Duration::days(i as i64);
        Bar {
            symbol: "BTC".into(),
            timestamp: ts,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000.0,
        }
    }

    fn flat_broker() -> Broker {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        Broker::new(
            10_000.0,
            0.0,
            0.0,
            Arc::new(HistoricalClock::new(start, Duration::days(1))),
        )
    }

    /// Feed a price series and collect emitted signal actions.
    fn run_series(strategy: &mut MaCrossover, closes: &[f64]) -> Vec<SignalAction> {
        let broker = flat_broker();
        let mut actions = Vec::new();
        for (i, &close) in closes.iter().enumerate() {
            let bar = make_bar(i, close);
            if let Some(sig) = strategy.on_bar(&bar, &broker).unwrap() {
                actions.push(sig.action);
            }
        }
        actions
    }

    #[test]
    fn silent_during_warmup() {
        let mut strategy = MaCrossover::new(2, 4, 0.95);
        // Only 4 bars: slow SMA first valid on the last, no prev pair to compare.
        let actions = run_series(&mut strategy, &[100.0, 100.0, 100.0, 100.0]);
        assert!(actions.is_empty());
    }

    #[test]
    fn buys_on_golden_cross() {
        let mut strategy = MaCrossover::new(2, 4, 0.95);
        // Downtrend keeps fast below slow, then a sharp rally crosses it above.
        let actions = run_series(
            &mut strategy,
            &[110.0, 108.0, 106.0, 104.0, 102.0, 120.0, 130.0],
        );
        assert_eq!(actions, vec![SignalAction::Buy]);
    }

    #[test]
    fn no_sell_without_position() {
        let mut strategy = MaCrossover::new(2, 4, 0.95);
        // Rally then collapse: the cross-under fires but the broker is flat,
        // so no sell signal is emitted.
        let actions = run_series(
            &mut strategy,
            &[100.0, 102.0, 104.0, 106.0, 108.0, 80.0, 70.0],
        );
        // The buy may fire on the initial rally depending on warmup; the tail
        // collapse must not produce a sell while flat.
        assert!(!actions.contains(&SignalAction::Sell));
    }

    #[test]
    fn buy_quantity_scales_with_cash() {
        let mut strategy = MaCrossover::new(2, 4, 0.5);
        let broker = flat_broker();
        let closes = [110.0, 108.0, 106.0, 104.0, 102.0, 120.0];
        let mut signal = None;
        for (i, &close) in closes.iter().enumerate() {
            signal = strategy.on_bar(&make_bar(i, close), &broker).unwrap();
        }
        let sig = signal.expect("expected buy signal on cross");
        let qty = sig.quantity.unwrap();
        assert!((qty - 10_000.0 * 0.5 / 120.0).abs() < 1e-9);
    }

    #[test]
    fn initialize_merges_and_resets() {
        let mut strategy = MaCrossover::default();
        let mut params = Params::new();
        params.insert("fast_period".into(), json!(3));
        params.insert("slow_period".into(), json!(6));
        strategy.initialize(&params).unwrap();

        let merged = strategy.params();
        assert_eq!(merged["fast_period"], json!(3));
        assert_eq!(merged["slow_period"], json!(6));
    }

    #[test]
    fn initialize_rejects_inverted_periods() {
        let mut strategy = MaCrossover::default();
        let mut params = Params::new();
        params.insert("fast_period".into(), json!(30));
        params.insert("slow_period".into(), json!(10));
        assert!(strategy.initialize(&params).is_err());
    }
}
