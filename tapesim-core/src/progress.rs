//! Progress notifications — per-run event broadcast over mpsc channels.
//!
//! Consumers subscribe by run id before the run starts and receive
//! `EngineEvent`s as the engine produces them. Publishing is fire-and-forget:
//! the engine never blocks on subscribers, and receivers that have been
//! dropped are pruned on the next publish.

use crate::domain::RunId;
use crate::engine::BacktestResult;
use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;

/// Events emitted by a running engine.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Progress {
        run_id: RunId,
        percent_complete: f64,
        bars_processed: usize,
    },
    Completed {
        run_id: RunId,
        result: Box<BacktestResult>,
    },
    Failed {
        run_id: RunId,
        error: String,
    },
}

impl EngineEvent {
    pub fn run_id(&self) -> &str {
        match self {
            EngineEvent::Progress { run_id, .. } => run_id,
            EngineEvent::Completed { run_id, .. } => run_id,
            EngineEvent::Failed { run_id, .. } => run_id,
        }
    }
}

/// Broadcast hub mapping run ids to subscriber channels.
#[derive(Debug, Default)]
pub struct ProgressBus {
    subscribers: Mutex<HashMap<RunId, Vec<Sender<EngineEvent>>>>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events for one run id.
    pub fn subscribe(&self, run_id: &str) -> Receiver<EngineEvent> {
        let (tx, rx) = channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(run_id.to_string())
            .or_default()
            .push(tx);
        rx
    }

    /// Broadcast an event to all subscribers of its run id.
    /// Disconnected subscribers are dropped.
    pub fn publish(&self, event: &EngineEvent) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(senders) = subscribers.get_mut(event.run_id()) {
            senders.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    /// Drop all subscriptions for a finished run.
    pub fn remove(&self, run_id: &str) {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(run_id);
    }

    pub fn subscriber_count(&self, run_id: &str) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(run_id)
            .map_or(0, Vec::len)
    }
}
