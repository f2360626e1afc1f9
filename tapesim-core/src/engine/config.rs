//! Serializable backtest configuration.

use crate::domain::RunId;
use crate::strategy::Params;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Immutable input to one engine run.
///
/// Captures everything needed to reproduce a backtest: strategy identity and
/// parameters, symbol, date range, capital, and the cost model. Two runs
/// with identical configs share the same content-addressed `run_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestConfig {
    pub strategy_id: String,

    /// Strategy parameter overrides, merged over the strategy's defaults.
    #[serde(default)]
    pub params: Params,

    pub symbol: String,

    /// Backtest start date (inclusive).
    pub start: NaiveDate,

    /// Backtest end date (inclusive).
    pub end: NaiveDate,

    pub initial_capital: f64,

    /// Commission as a fraction of traded notional (0.001 = 0.1%).
    #[serde(default)]
    pub commission_rate: f64,

    /// Slippage as a fraction of price (0.0005 = 0.05%).
    #[serde(default)]
    pub slippage_rate: f64,

    /// Persist a performance snapshot every N bars.
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval: usize,

    /// Simulated time per bar, in seconds. Drives the historical clock.
    #[serde(default = "default_bar_interval_secs")]
    pub bar_interval_secs: i64,
}

fn default_snapshot_interval() -> usize {
    10
}

fn default_bar_interval_secs() -> i64 {
    86_400
}

impl BacktestConfig {
    pub fn new(
        strategy_id: impl Into<String>,
        symbol: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
        initial_capital: f64,
    ) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            params: Params::new(),
            symbol: symbol.into(),
            start,
            end,
            initial_capital,
            commission_rate: 0.0,
            slippage_rate: 0.0,
            snapshot_interval: default_snapshot_interval(),
            bar_interval_secs: default_bar_interval_secs(),
        }
    }

    pub fn with_costs(mut self, commission_rate: f64, slippage_rate: f64) -> Self {
        self.commission_rate = commission_rate;
        self.slippage_rate = slippage_rate;
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Deterministic content-addressed run id.
    ///
    /// BLAKE3 over the canonical JSON encoding, so identical configs map to
    /// the same id across builds and platforms.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Structural validation, independent of any strategy.
    pub fn validate(&self) -> Result<(), String> {
        if self.strategy_id.is_empty() {
            return Err("strategy_id must not be empty".into());
        }
        if self.symbol.is_empty() {
            return Err("symbol must not be empty".into());
        }
        if self.end < self.start {
            return Err(format!(
                "end date {} precedes start date {}",
                self.end, self.start
            ));
        }
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err("initial_capital must be positive".into());
        }
        if !(0.0..1.0).contains(&self.commission_rate) {
            return Err("commission_rate must be in [0, 1)".into());
        }
        if !(0.0..1.0).contains(&self.slippage_rate) {
            return Err("slippage_rate must be in [0, 1)".into());
        }
        if self.snapshot_interval == 0 {
            return Err("snapshot_interval must be >= 1".into());
        }
        if self.bar_interval_secs <= 0 {
            return Err("bar_interval_secs must be positive".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> BacktestConfig {
        BacktestConfig::new(
            "ma_crossover",
            "BTC",
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            10_000.0,
        )
        .with_costs(0.001, 0.0005)
    }

    #[test]
    fn run_id_is_deterministic() {
        assert_eq!(config().run_id(), config().run_id());
    }

    #[test]
    fn run_id_changes_with_params() {
        let a = config();
        let mut b = config();
        b.params.insert("fast_period".into(), json!(5));
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn validates_good_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_dates() {
        let mut c = config();
        c.end = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_capital() {
        let mut c = config();
        c.initial_capital = 0.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_zero_snapshot_interval() {
        let mut c = config();
        c.snapshot_interval = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn toml_roundtrip_with_defaults() {
        let toml_str = r#"
            strategy_id = "rsi_reversion"
            symbol = "BTC"
            start = "2024-01-02"
            end = "2024-03-01"
            initial_capital = 10000.0
        "#;
        let c: BacktestConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(c.snapshot_interval, 10);
        assert_eq!(c.bar_interval_secs, 86_400);
        assert_eq!(c.commission_rate, 0.0);
    }
}
