//! Backtest engine — configuration, state machine, bar loop, and results.
//!
//! The engine advances the clock, feeds bars to the strategy, routes
//! signals to the broker as orders, accumulates the equity curve, and
//! persists progress through the repository and progress-bus collaborators.

pub mod cancel;
pub mod config;
pub mod error;
pub mod result;
pub mod runner;
pub mod state;

pub use cancel::CancelToken;
pub use config::BacktestConfig;
pub use error::EngineError;
pub use result::{BacktestResult, EquityPoint};
pub use runner::Engine;
pub use state::RunState;
