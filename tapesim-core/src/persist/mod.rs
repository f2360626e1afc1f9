//! Run persistence — typed repository contract and bundled backends.
//!
//! The engine writes run lifecycle, trades, and periodic performance
//! snapshots through `RunRepository` and never reads the state back during
//! a run. All calls are idempotent-safe keyed by run id, so a repository
//! may be shared by concurrent runs without cross-run locking.

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonlRepository;
pub use memory::{MemoryRepository, RunRecord, TradeRow};

use crate::analytics::PerformanceMetrics;
use crate::domain::{Order, RunId};
use crate::engine::{BacktestConfig, RunState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Persisted trade direction.
///
/// The broker is long-only today; `Short` exists so storage schemas stay
/// forward-compatible if short selling is wired in later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeDirection {
    Long,
    Short,
}

/// Whether a trade opens or closes exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeLifecycle {
    Open,
    Close,
}

/// Periodic performance snapshot written every N bars.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub timestamp: DateTime<Utc>,
    pub portfolio_value: f64,
    pub cash_balance: f64,
    pub position_value: f64,
    pub total_return: f64,
    /// Current drawdown from the running equity peak, positive fraction.
    pub drawdown: f64,
}

/// Payload accompanying a run status update.
#[derive(Debug, Clone, Copy)]
pub enum RunUpdate<'a> {
    None,
    Metrics(&'a PerformanceMetrics),
    Error(&'a str),
}

/// Errors from a persistence backend.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Typed repository the engine persists through.
pub trait RunRepository: Send + Sync {
    /// Record a new run and return its id. Run ids are content-addressed
    /// from the config, so re-creating the same run is idempotent.
    fn create_run(&self, config: &BacktestConfig) -> Result<RunId, PersistError>;

    fn update_run_status(
        &self,
        run_id: &str,
        state: RunState,
        update: RunUpdate<'_>,
    ) -> Result<(), PersistError>;

    fn insert_trade(
        &self,
        run_id: &str,
        order: &Order,
        direction: TradeDirection,
        lifecycle: TradeLifecycle,
    ) -> Result<(), PersistError>;

    fn insert_performance_snapshot(
        &self,
        run_id: &str,
        snapshot: &PerformanceSnapshot,
    ) -> Result<(), PersistError>;
}
