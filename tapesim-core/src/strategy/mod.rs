//! Strategy framework — trait, parameter handling, and registry.
//!
//! Strategies are pure decision components: per bar they see the market bar
//! and a read-only broker view, and may return at most one `Signal`. They
//! never mutate broker state directly; the engine routes signals to orders.
//!
//! The registry replaces what would otherwise be a wide inheritance
//! hierarchy with a flat capability interface plus lookup-by-id. It is an
//! explicit instance constructed at startup and injected into the engine —
//! no global mutable state.

pub mod ma_crossover;
pub mod rsi_reversion;

pub use ma_crossover::MaCrossover;
pub use rsi_reversion::RsiReversion;

use crate::broker::Broker;
use crate::domain::{Bar, PortfolioSnapshot, Signal};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Strategy parameters as a JSON map, so user-supplied implementations can
/// carry arbitrary keys. Ordered so that config serialization is canonical
/// and content-addressed run ids stay stable.
pub type Params = BTreeMap<String, Value>;

/// Errors raised inside strategy code. Any of these is fatal to a run: the
/// engine cannot safely continue with a strategy in an unknown state.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("strategy execution failed: {0}")]
    Execution(String),
}

/// A pluggable trading strategy.
///
/// Lifecycle: `initialize` once with merged parameters, `on_start` before
/// the first bar, `on_bar` once per bar in strict chronological order,
/// `on_end` after the last bar.
pub trait Strategy: Send {
    /// Stable identity used for registry lookup and run configs.
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Current parameter values (defaults merged with any overrides).
    fn params(&self) -> Params;

    /// Check a parameter map without mutating state. Returns one message per
    /// problem; empty means valid.
    fn validate_params(&self, params: &Params) -> Vec<String>;

    /// Merge the supplied parameters into strategy state. Called once,
    /// before the run starts.
    fn initialize(&mut self, params: &Params) -> Result<(), StrategyError>;

    /// Called once before the first bar.
    fn on_start(&mut self, _initial_capital: f64) {}

    /// Called once per bar. Must be a function of the bar history seen so
    /// far plus the broker's current position/price state.
    fn on_bar(&mut self, bar: &Bar, broker: &Broker) -> Result<Option<Signal>, StrategyError>;

    /// Called once after the last bar.
    fn on_end(&mut self, _portfolio: &PortfolioSnapshot) {}
}

/// Read an `f64` parameter if present.
pub(crate) fn param_f64(params: &Params, key: &str) -> Result<Option<f64>, StrategyError> {
    match params.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| StrategyError::InvalidParameter {
                name: key.to_string(),
                reason: format!("expected a number, got {v}"),
            }),
    }
}

/// Read a `usize` parameter if present.
pub(crate) fn param_usize(params: &Params, key: &str) -> Result<Option<usize>, StrategyError> {
    match params.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| StrategyError::InvalidParameter {
                name: key.to_string(),
                reason: format!("expected a non-negative integer, got {v}"),
            }),
    }
}

/// Factory for strategy instances. Each run gets a fresh instance so no
/// state leaks between runs.
pub type StrategyFactory = Box<dyn Fn() -> Box<dyn Strategy> + Send + Sync>;

/// Descriptive listing entry for a registered strategy.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StrategyInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Result of validating parameters against a registered strategy.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Lookup-by-id registry of strategy factories.
#[derive(Default)]
pub struct StrategyRegistry {
    factories: HashMap<String, StrategyFactory>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the built-in reference strategies.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(|| Box::new(MaCrossover::default())));
        registry.register(Box::new(|| Box::new(RsiReversion::default())));
        registry
    }

    /// Register a factory under the id its instances report.
    /// Re-registering an id replaces the previous factory.
    pub fn register(&mut self, factory: StrategyFactory) {
        let id = factory().id().to_string();
        self.factories.insert(id, factory);
    }

    /// Remove a strategy. Returns whether it was present.
    pub fn unregister(&mut self, id: &str) -> bool {
        self.factories.remove(id).is_some()
    }

    /// Create a fresh instance of a registered strategy.
    pub fn create(&self, id: &str) -> Option<Box<dyn Strategy>> {
        self.factories.get(id).map(|f| f())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// All registered strategies, sorted by id.
    pub fn list(&self) -> Vec<StrategyInfo> {
        let mut infos: Vec<StrategyInfo> = self
            .factories
            .values()
            .map(|f| {
                let s = f();
                StrategyInfo {
                    id: s.id().to_string(),
                    name: s.name().to_string(),
                    description: s.description().to_string(),
                }
            })
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// Validate a parameter map for a strategy without constructing a run.
    pub fn validate(&self, id: &str, params: &Params) -> ValidationReport {
        match self.create(id) {
            None => ValidationReport {
                valid: false,
                errors: vec![format!("unknown strategy '{id}'")],
            },
            Some(strategy) => {
                let errors = strategy.validate_params(params);
                ValidationReport {
                    valid: errors.is_empty(),
                    errors,
                }
            }
        }
    }
}
