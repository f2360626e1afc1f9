//! Engine error taxonomy.
//!
//! Order rejections (`BrokerError`) are deliberately absent: they are
//! recovered locally inside the bar loop and never fail a run. Everything
//! here is fatal — it either prevents the run from starting or leaves the
//! engine unable to continue safely.

use crate::data::DataError;
use crate::engine::state::RunState;
use crate::persist::PersistError;
use crate::strategy::StrategyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no historical data available for '{symbol}'")]
    NoHistoricalData { symbol: String },

    #[error("unknown strategy '{0}'")]
    UnknownStrategy(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("strategy execution failed: {0}")]
    Strategy(#[from] StrategyError),

    #[error("data source error: {0}")]
    Data(#[from] DataError),

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistError),

    #[error("run cancelled")]
    Cancelled,

    #[error("run already consumed (state: {state})")]
    AlreadyRan { state: RunState },
}
