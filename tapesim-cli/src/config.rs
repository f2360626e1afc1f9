//! TOML run configuration for the CLI.
//!
//! Example:
//!
//! ```toml
//! [backtest]
//! strategy = "ma_crossover"
//! symbol = "BTC"
//! start = "2024-01-02"
//! end = "2024-06-28"
//! initial_capital = 10000.0
//! commission_rate = 0.001
//! slippage_rate = 0.0005
//!
//! [strategy_params]
//! fast_period = 10
//! slow_period = 30
//!
//! [data]
//! kind = "csv"
//! dir = "data"
//! ```
//!
//! Dates are quoted ISO strings. The `[data]` section selects the bar
//! source: `csv` reads `<dir>/<SYMBOL>.csv`, `synthetic` generates a seeded
//! random walk.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tapesim_core::data::{BarSource, CsvBarSource, SyntheticBarSource};
use tapesim_core::engine::BacktestConfig;
use tapesim_core::strategy::Params;

#[derive(Debug, Deserialize)]
pub struct CliConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub strategy_params: Params,
    pub data: DataSection,
}

#[derive(Debug, Deserialize)]
pub struct BacktestSection {
    pub strategy: String,
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub initial_capital: f64,
    #[serde(default)]
    pub commission_rate: f64,
    #[serde(default)]
    pub slippage_rate: f64,
    pub snapshot_interval: Option<usize>,
    pub bar_interval_secs: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSection {
    Csv {
        dir: PathBuf,
    },
    Synthetic {
        #[serde(default = "default_seed")]
        seed: u64,
        #[serde(default = "default_start_price")]
        start_price: f64,
        #[serde(default = "default_drift")]
        drift: f64,
        #[serde(default = "default_volatility")]
        volatility: f64,
    },
}

fn default_seed() -> u64 {
    42
}

fn default_start_price() -> f64 {
    100.0
}

fn default_drift() -> f64 {
    0.0005
}

fn default_volatility() -> f64 {
    0.02
}

impl CliConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Engine config assembled from the `[backtest]` and `[strategy_params]`
    /// sections.
    pub fn to_backtest_config(&self) -> BacktestConfig {
        let mut config = BacktestConfig::new(
            &self.backtest.strategy,
            &self.backtest.symbol,
            self.backtest.start,
            self.backtest.end,
            self.backtest.initial_capital,
        )
        .with_costs(self.backtest.commission_rate, self.backtest.slippage_rate)
        .with_params(self.strategy_params.clone());

        if let Some(interval) = self.backtest.snapshot_interval {
            config.snapshot_interval = interval;
        }
        if let Some(secs) = self.backtest.bar_interval_secs {
            config.bar_interval_secs = secs;
        }
        config
    }

    /// Bar source selected by the `[data]` section.
    pub fn make_source(&self) -> Arc<dyn BarSource> {
        match &self.data {
            DataSection::Csv { dir } => Arc::new(CsvBarSource::new(dir.clone())),
            DataSection::Synthetic {
                seed,
                start_price,
                drift,
                volatility,
            } => Arc::new(SyntheticBarSource::new(
                *seed,
                *start_price,
                *drift,
                *volatility,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [backtest]
        strategy = "ma_crossover"
        symbol = "BTC"
        start = "2024-01-02"
        end = "2024-06-28"
        initial_capital = 10000.0
        commission_rate = 0.001
        slippage_rate = 0.0005

        [strategy_params]
        fast_period = 10
        slow_period = 30

        [data]
        kind = "synthetic"
        seed = 7
    "#;

    #[test]
    fn parses_sample_config() {
        let config: CliConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.backtest.strategy, "ma_crossover");
        assert_eq!(config.strategy_params["fast_period"], serde_json::json!(10));
        assert!(matches!(config.data, DataSection::Synthetic { seed: 7, .. }));
    }

    #[test]
    fn builds_engine_config_with_defaults() {
        let config: CliConfig = toml::from_str(SAMPLE).unwrap();
        let engine_config = config.to_backtest_config();
        assert_eq!(engine_config.snapshot_interval, 10);
        assert_eq!(engine_config.commission_rate, 0.001);
        assert!(engine_config.validate().is_ok());
    }

    #[test]
    fn csv_data_section() {
        let toml_str = r#"
            [backtest]
            strategy = "rsi_reversion"
            symbol = "ETH"
            start = "2024-01-02"
            end = "2024-02-01"
            initial_capital = 5000.0

            [data]
            kind = "csv"
            dir = "fixtures"
        "#;
        let config: CliConfig = toml::from_str(toml_str).unwrap();
        assert!(matches!(config.data, DataSection::Csv { .. }));
    }
}
