//! JSONL repository — append-only run journal.
//!
//! One JSON object per line, tagged by record type. The format is resilient
//! to partial writes and easy to stream or grep. Appends are serialized
//! through a mutex so a single repository can be shared by parallel runs.

use super::{
    PerformanceSnapshot, PersistError, RunRepository, RunUpdate, TradeDirection, TradeLifecycle,
};
use crate::analytics::PerformanceMetrics;
use crate::domain::{Order, RunId};
use crate::engine::{BacktestConfig, RunState};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Tagged journal record.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum JournalRecord<'a> {
    RunCreated {
        run_id: &'a str,
        config: &'a BacktestConfig,
    },
    StatusChanged {
        run_id: &'a str,
        state: RunState,
        #[serde(skip_serializing_if = "Option::is_none")]
        metrics: Option<&'a PerformanceMetrics>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<&'a str>,
    },
    Trade {
        run_id: &'a str,
        order: &'a Order,
        direction: TradeDirection,
        lifecycle: TradeLifecycle,
    },
    Snapshot {
        run_id: &'a str,
        #[serde(flatten)]
        snapshot: &'a PerformanceSnapshot,
    },
}

/// Append-only JSONL journal at a fixed path.
#[derive(Debug)]
pub struct JsonlRepository {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn append(&self, record: &JournalRecord<'_>) -> Result<(), PersistError> {
        let json = serde_json::to_string(record)?;

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| PersistError::Backend("journal mutex poisoned".to_string()))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{json}")?;
        Ok(())
    }
}

impl RunRepository for JsonlRepository {
    fn create_run(&self, config: &BacktestConfig) -> Result<RunId, PersistError> {
        let run_id = config.run_id();
        self.append(&JournalRecord::RunCreated {
            run_id: &run_id,
            config,
        })?;
        Ok(run_id)
    }

    fn update_run_status(
        &self,
        run_id: &str,
        state: RunState,
        update: RunUpdate<'_>,
    ) -> Result<(), PersistError> {
        let (metrics, error) = match update {
            RunUpdate::None => (None, None),
            RunUpdate::Metrics(m) => (Some(m), None),
            RunUpdate::Error(e) => (None, Some(e)),
        };
        self.append(&JournalRecord::StatusChanged {
            run_id,
            state,
            metrics,
            error,
        })
    }

    fn insert_trade(
        &self,
        run_id: &str,
        order: &Order,
        direction: TradeDirection,
        lifecycle: TradeLifecycle,
    ) -> Result<(), PersistError> {
        self.append(&JournalRecord::Trade {
            run_id,
            order,
            direction,
            lifecycle,
        })
    }

    fn insert_performance_snapshot(
        &self,
        run_id: &str,
        snapshot: &PerformanceSnapshot,
    ) -> Result<(), PersistError> {
        self.append(&JournalRecord::Snapshot { run_id, snapshot })
    }
}
