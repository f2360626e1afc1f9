//! Parallel execution of independent backtest runs.
//!
//! Runs are embarrassingly parallel: each gets a fresh engine, clock,
//! broker, and strategy instance with no shared mutable state. The only
//! shared collaborators are the repository and progress bus, both of which
//! tolerate concurrent writes keyed by run id.

use crate::data::BarSource;
use crate::engine::{BacktestConfig, BacktestResult, CancelToken, Engine, EngineError};
use crate::persist::RunRepository;
use crate::progress::ProgressBus;
use crate::strategy::StrategyRegistry;
use rayon::prelude::*;
use std::sync::Arc;

/// Shared, read-only collaborators for a batch of runs.
pub struct BatchContext {
    pub registry: StrategyRegistry,
    pub data: Arc<dyn BarSource>,
    pub repo: Arc<dyn RunRepository>,
    pub bus: Option<Arc<ProgressBus>>,
    pub cancel: CancelToken,
}

impl BatchContext {
    pub fn new(
        registry: StrategyRegistry,
        data: Arc<dyn BarSource>,
        repo: Arc<dyn RunRepository>,
    ) -> Self {
        Self {
            registry,
            data,
            repo,
            bus: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_progress(mut self, bus: Arc<ProgressBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Run each config to completion on the rayon pool.
///
/// Results are returned in config order. A failed run does not affect the
/// others; the shared cancel token stops every run between bars.
pub fn run_batch(
    configs: Vec<BacktestConfig>,
    ctx: &BatchContext,
) -> Vec<Result<BacktestResult, EngineError>> {
    configs
        .into_par_iter()
        .map(|config| {
            let mut engine = Engine::new(
                config,
                &ctx.registry,
                ctx.data.clone(),
                ctx.repo.clone(),
            )?
            .with_cancel(ctx.cancel.clone());
            if let Some(bus) = &ctx.bus {
                engine = engine.with_progress(bus.clone());
            }
            engine.run()
        })
        .collect()
}
