//! tapesim core — historical replay engine with a virtual broker.
//!
//! This crate contains the heart of the backtesting system:
//! - Domain types (bars, orders, positions, portfolio snapshots, signals)
//! - Clock variants (historical stepped, live, pausable)
//! - Virtual broker with deterministic commission and slippage
//! - Strategy trait, registry, and the built-in reference strategies
//! - Sequential bar loop with a pending/running/completed/failed run
//!   state machine
//! - Pure analytics over order history and equity curves
//! - Collaborator contracts: bar sources, run repositories, progress bus

pub mod analytics;
pub mod batch;
pub mod broker;
pub mod clock;
pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod persist;
pub mod progress;
pub mod strategy;

pub use analytics::PerformanceMetrics;
pub use broker::{Broker, BrokerError};
pub use clock::{Clock, HistoricalClock, LiveClock, PausableClock};
pub use engine::{
    BacktestConfig, BacktestResult, CancelToken, Engine, EngineError, EquityPoint, RunState,
};
pub use progress::{EngineEvent, ProgressBus};
pub use strategy::{Strategy, StrategyRegistry};
