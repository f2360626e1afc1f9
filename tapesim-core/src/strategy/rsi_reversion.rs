//! RSI mean-reversion — buy oversold, sell overbought.
//!
//! Enters when the Wilder RSI drops below the oversold threshold while flat
//! and exits the whole position when it rises above the overbought
//! threshold. Emits nothing until the RSI warm-up window has been observed.

use super::{param_f64, param_usize, Params, Strategy, StrategyError};
use crate::broker::Broker;
use crate::domain::{Bar, Signal};
use crate::indicators::WilderRsi;
use serde_json::json;

const DEFAULT_POSITION_PCT: f64 = 0.95;

pub struct RsiReversion {
    period: usize,
    oversold: f64,
    overbought: f64,
    position_pct: f64,
    rsi: WilderRsi,
}

impl RsiReversion {
    pub fn new(period: usize, oversold: f64, overbought: f64, position_pct: f64) -> Self {
        Self {
            period,
            oversold,
            overbought,
            position_pct,
            rsi: WilderRsi::new(period),
        }
    }

    /// Confidence grows with distance past the threshold, clamped to [0, 1].
    fn confidence(distance: f64) -> f64 {
        (distance / 10.0).clamp(0.0, 1.0)
    }
}

impl Default for RsiReversion {
    fn default() -> Self {
        Self::new(14, 30.0, 70.0, DEFAULT_POSITION_PCT)
    }
}

impl Strategy for RsiReversion {
    fn id(&self) -> &str {
        "rsi_reversion"
    }

    fn name(&self) -> &str {
        "RSI Mean Reversion"
    }

    fn description(&self) -> &str {
        "Buys when RSI drops below the oversold threshold, exits above the overbought threshold"
    }

    fn params(&self) -> Params {
        let mut params = Params::new();
        params.insert("period".into(), json!(self.period));
        params.insert("oversold".into(), json!(self.oversold));
        params.insert("overbought".into(), json!(self.overbought));
        params.insert("position_pct".into(), json!(self.position_pct));
        params
    }

    fn validate_params(&self, params: &Params) -> Vec<String> {
        let mut errors = Vec::new();

        match param_usize(params, "period") {
            Ok(Some(0)) => errors.push("period must be >= 1".into()),
            Ok(_) => {}
            Err(e) => errors.push(e.to_string()),
        }

        let oversold = match param_f64(params, "oversold") {
            Ok(v) => v.unwrap_or(self.oversold),
            Err(e) => {
                errors.push(e.to_string());
                self.oversold
            }
        };
        let overbought = match param_f64(params, "overbought") {
            Ok(v) => v.unwrap_or(self.overbought),
            Err(e) => {
                errors.push(e.to_string());
                self.overbought
            }
        };
        if !(0.0..=100.0).contains(&oversold) || !(0.0..=100.0).contains(&overbought) {
            errors.push("RSI thresholds must be within [0, 100]".into());
        }
        if oversold >= overbought {
            errors.push("oversold threshold must be below overbought threshold".into());
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

        if let Some(period) = param_usize(params, "period")? {
            self.period = period;
        }
        if let Some(oversold) = param_f64(params, "oversold")? {
            self.oversold = oversold;
        }
        if let Some(overbought) = param_f64(params, "overbought")? {
            self.overbought = overbought;
        }
        if let Some(pct) = param_f64(params, "position_pct")? {
            self.position_pct = pct;
        }

        self.rsi = WilderRsi::new(self.period);
        Ok(())
    }

    fn on_bar(&mut self, bar: &Bar, broker: &Broker) -> Result<Option<Signal>, StrategyError> {
        let rsi = match self.rsi.push(bar.close) {
            Some(v) => v,
            None => return Ok(None), // still warming up
        };

        let holding = broker.position(&bar.symbol).is_some();

        if rsi < self.oversold && !holding {
            let quantity = broker.cash() * self.position_pct / bar.close;
            if quantity > 0.0 {
                return Ok(Some(
                    Signal::buy(
                        bar.symbol.clone(),
                        quantity,
                        format!("RSI {rsi:.1} below oversold threshold {:.1}", self.oversold),
                        bar.timestamp,
                    )
                    .with_confidence(Self::confidence(self.oversold - rsi)),
                ));
            }
        }

        if rsi > self.overbought && holding {
            let held = broker.position(&bar.symbol).map_or(0.0, |p| p.quantity);
            return Ok(Some(
                Signal::sell(
                    bar.symbol.clone(),
                    held,
                    format!(
                        "RSI {rsi:.1} above overbought threshold {:.1}",
                        self.overbought
                    ),
                    bar.timestamp,
                )
                .with_confidence(Self::confidence(rsi - self.overbought)),
            ));
        }

        Ok(None)
    }
}
