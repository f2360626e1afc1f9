//! In-memory repository — for tests and library embedding.

use super::{
    PerformanceSnapshot, PersistError, RunRepository, RunUpdate, TradeDirection, TradeLifecycle,
};
use crate::analytics::PerformanceMetrics;
use crate::domain::{Order, RunId};
use crate::engine::{BacktestConfig, RunState};
use std::collections::HashMap;
use std::sync::Mutex;

/// One persisted trade row.
#[derive(Debug, Clone)]
pub struct TradeRow {
    pub order: Order,
    pub direction: TradeDirection,
    pub lifecycle: TradeLifecycle,
}

/// Everything recorded for one run.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub config: BacktestConfig,
    pub state: RunState,
    pub metrics: Option<PerformanceMetrics>,
    pub error: Option<String>,
    pub trades: Vec<TradeRow>,
    pub snapshots: Vec<PerformanceSnapshot>,
}

/// Mutex-guarded map of run records, keyed by run id.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    runs: Mutex<HashMap<RunId, RunRecord>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of a run record, if present.
    pub fn run(&self, run_id: &str) -> Option<RunRecord> {
        self.runs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(run_id)
            .cloned()
    }

    pub fn run_count(&self) -> usize {
        self.runs.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl RunRepository for MemoryRepository {
    fn create_run(&self, config: &BacktestConfig) -> Result<RunId, PersistError> {
        let run_id = config.run_id();
        let mut runs = self.runs.lock().map_err(|_| poisoned())?;
        // Re-creating an existing run resets its record (idempotent keyed by id).
        runs.insert(
            run_id.clone(),
            RunRecord {
                config: config.clone(),
                state: RunState::Pending,
                metrics: None,
                error: None,
                trades: Vec::new(),
                snapshots: Vec::new(),
            },
        );
        Ok(run_id)
    }

    fn update_run_status(
        &self,
        run_id: &str,
        state: RunState,
        update: RunUpdate<'_>,
    ) -> Result<(), PersistError> {
        let mut runs = self.runs.lock().map_err(|_| poisoned())?;
        let record = runs
            .get_mut(run_id)
            .ok_or_else(|| PersistError::Backend(format!("unknown run '{run_id}'")))?;
        record.state = state;
        match update {
            RunUpdate::None => {}
            RunUpdate::Metrics(metrics) => record.metrics = Some(metrics.clone()),
            RunUpdate::Error(message) => record.error = Some(message.to_string()),
        }
        Ok(())
    }

    fn insert_trade(
        &self,
        run_id: &str,
        order: &Order,
        direction: TradeDirection,
        lifecycle: TradeLifecycle,
    ) -> Result<(), PersistError> {
        let mut runs = self.runs.lock().map_err(|_| poisoned())?;
        let record = runs
            .get_mut(run_id)
            .ok_or_else(|| PersistError::Backend(format!("unknown run '{run_id}'")))?;
        record.trades.push(TradeRow {
            order: order.clone(),
            direction,
            lifecycle,
        });
        Ok(())
    }

    fn insert_performance_snapshot(
        &self,
        run_id: &str,
        snapshot: &PerformanceSnapshot,
    ) -> Result<(), PersistError> {
        let mut runs = self.runs.lock().map_err(|_| poisoned())?;
        let record = runs
            .get_mut(run_id)
            .ok_or_else(|| PersistError::Backend(format!("unknown run '{run_id}'")))?;
        record.snapshots.push(snapshot.clone());
        Ok(())
    }
}

fn poisoned() -> PersistError {
    PersistError::Backend("repository mutex poisoned".to_string())
}
