//! Backtest engine — wires clock, broker, strategy, and collaborators into
//! the sequential bar loop.
//!
//! Per-bar processing order (never reordered, never concurrent within a run):
//! 1. Record the bar close with the broker
//! 2. Ask the strategy for a signal
//! 3. Route an actionable signal to the broker as a market order
//! 4. Sample the equity curve
//! 5. Every `snapshot_interval` bars, persist a snapshot and emit progress
//! 6. Advance the clock and check for cooperative cancellation

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tracing::{info, warn};

use crate::analytics::{drawdown_curve, PerformanceMetrics};
use crate::broker::Broker;
use crate::clock::HistoricalClock;
use crate::data::BarSource;
use crate::domain::{OrderKind, OrderSide, PortfolioSnapshot, RunId, Signal, SignalAction};
use crate::persist::{
    PerformanceSnapshot, RunRepository, RunUpdate, TradeDirection, TradeLifecycle,
};
use crate::progress::{EngineEvent, ProgressBus};
use crate::strategy::{Strategy, StrategyRegistry};

use super::cancel::CancelToken;
use super::config::BacktestConfig;
use super::error::EngineError;
use super::result::{BacktestResult, EquityPoint};
use super::state::RunState;

/// One backtest run: owns a fresh clock, broker, and strategy instance.
///
/// `run()` drives the state machine `Pending → Running → {Completed |
/// Failed}` and can only be invoked once per engine. Concurrent runs each
/// construct their own engine; nothing here is shared between runs except
/// the repository and (optionally) the progress bus.
pub struct Engine {
    config: BacktestConfig,
    run_state: RunState,
    strategy: Box<dyn Strategy>,
    broker: Broker,
    clock: Arc<HistoricalClock>,
    data: Arc<dyn BarSource>,
    repo: Arc<dyn RunRepository>,
    bus: Option<Arc<ProgressBus>>,
    cancel: CancelToken,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("run_state", &self.run_state)
            .field("strategy", &self.strategy.name())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Build an engine for one run.
    ///
    /// Fails fast on structural config problems, unknown strategy ids, and
    /// invalid strategy parameters — nothing is persisted for a run that
    /// cannot start.
    pub fn new(
        config: BacktestConfig,
        registry: &StrategyRegistry,
        data: Arc<dyn BarSource>,
        repo: Arc<dyn RunRepository>,
    ) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::InvalidConfig)?;

        let strategy = registry
            .create(&config.strategy_id)
            .ok_or_else(|| EngineError::UnknownStrategy(config.strategy_id.clone()))?;

        let errors = strategy.validate_params(&config.params);
        if !errors.is_empty() {
            return Err(EngineError::InvalidConfig(errors.join("; ")));
        }

        let start: DateTime<Utc> = config.start.and_time(NaiveTime::MIN).and_utc();
        let clock = Arc::new(HistoricalClock::new(
            start,
            Duration::seconds(config.bar_interval_secs),
        ));
        let broker = Broker::new(
            config.initial_capital,
            config.commission_rate,
            config.slippage_rate,
            clock.clone(),
        );

        Ok(Self {
            config,
            run_state: RunState::Pending,
            strategy,
            broker,
            clock,
            data,
            repo,
            bus: None,
            cancel: CancelToken::new(),
        })
    }

    /// Attach a progress bus. Consumers subscribe by run id.
    pub fn with_progress(mut self, bus: Arc<ProgressBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Attach a cancellation token checked between bars.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> RunState {
        self.run_state
    }

    /// The run id this engine's config maps to.
    pub fn run_id(&self) -> RunId {
        self.config.run_id()
    }

    /// Execute the run to completion or failure.
    ///
    /// Order rejections are recovered locally and logged; anything that
    /// leaves the engine in an unknown state fails the run with the reason
    /// recorded on the run record. The final result write is the one
    /// persistence call whose failure propagates to the caller.
    pub fn run(&mut self) -> Result<BacktestResult, EngineError> {
        if self.run_state != RunState::Pending {
            return Err(EngineError::AlreadyRan {
                state: self.run_state,
            });
        }

        let run_id = self.repo.create_run(&self.config)?;
        self.run_state = RunState::Running;
        if let Err(e) = self
            .repo
            .update_run_status(&run_id, RunState::Running, RunUpdate::None)
        {
            warn!(run_id = %run_id, error = %e, "failed to persist running status");
        }
        info!(
            run_id = %run_id,
            strategy = %self.config.strategy_id,
            symbol = %self.config.symbol,
            "backtest run started"
        );

        match self.execute(&run_id) {
            Ok(result) => {
                self.run_state = RunState::Completed;
                info!(
                    run_id = %run_id,
                    total_return = result.metrics.total_return,
                    trades = result.metrics.total_trades,
                    "backtest run completed"
                );
                self.publish(EngineEvent::Completed {
                    run_id: run_id.clone(),
                    result: Box::new(result.clone()),
                });
                Ok(result)
            }
            Err(error) => {
                self.run_state = RunState::Failed;
                let message = error.to_string();
                if let Err(e) =
                    self.repo
                        .update_run_status(&run_id, RunState::Failed, RunUpdate::Error(&message))
                {
                    warn!(run_id = %run_id, error = %e, "failed to record run failure");
                }
                warn!(run_id = %run_id, error = %message, "backtest run failed");
                self.publish(EngineEvent::Failed {
                    run_id: run_id.clone(),
                    error: message,
                });
                Err(error)
            }
        }
    }

    fn execute(&mut self, run_id: &RunId) -> Result<BacktestResult, EngineError> {
        let bars = self
            .data
            .load_bars(&self.config.symbol, self.config.start, self.config.end)?;
        if bars.is_empty() {
            return Err(EngineError::NoHistoricalData {
                symbol: self.config.symbol.clone(),
            });
        }

        self.strategy.initialize(&self.config.params)?;
        self.strategy.on_start(self.config.initial_capital);

        let total_bars = bars.len();
        let mut equity_curve: Vec<EquityPoint> = Vec::with_capacity(total_bars);
        let mut equity_peak = f64::MIN;

        for (index, bar) in bars.iter().enumerate() {
            self.broker.update_price(&bar.symbol, bar.close);

            if let Some(signal) = self.strategy.on_bar(bar, &self.broker)? {
                if signal.is_actionable() {
                    self.route_signal(run_id, &signal);
                }
            }

            let snapshot = self.broker.portfolio();
            equity_peak = equity_peak.max(snapshot.total_value);
            equity_curve.push(EquityPoint {
                timestamp: bar.timestamp,
                value: snapshot.total_value,
            });

            let processed = index + 1;
            if processed % self.config.snapshot_interval == 0 {
                self.persist_snapshot(run_id, bar.timestamp, &snapshot, equity_peak);
                self.publish(EngineEvent::Progress {
                    run_id: run_id.clone(),
                    percent_complete: 100.0 * processed as f64 / total_bars as f64,
                    bars_processed: processed,
                });
            }

            self.clock.advance();
            if self.cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
        }

        let final_portfolio = self.broker.portfolio();
        self.strategy.on_end(&final_portfolio);

        let metrics = PerformanceMetrics::compute(
            self.broker.orders(),
            &equity_curve,
            self.config.initial_capital,
        );
        let values: Vec<f64> = equity_curve.iter().map(|p| p.value).collect();

        let result = BacktestResult {
            run_id: run_id.clone(),
            config: self.config.clone(),
            metrics,
            orders: self.broker.orders().to_vec(),
            equity_curve,
            drawdown_curve: drawdown_curve(&values),
            final_portfolio,
        };

        // The one persistence call that must surface on failure.
        self.repo.update_run_status(
            run_id,
            RunState::Completed,
            RunUpdate::Metrics(&result.metrics),
        )?;

        Ok(result)
    }

    /// Submit an actionable signal as a market order. Rejections are logged
    /// and the bar continues; they are never fatal to the run.
    fn route_signal(&mut self, run_id: &str, signal: &Signal) {
        let quantity = match signal.quantity {
            Some(q) => q,
            None => return,
        };
        let side = match signal.action {
            SignalAction::Buy => OrderSide::Buy,
            SignalAction::Sell => OrderSide::Sell,
            SignalAction::Hold => return,
        };

        match self
            .broker
            .submit_order(&signal.symbol, side, OrderKind::Market, quantity, None)
        {
            Ok(order) => {
                let lifecycle = match side {
                    OrderSide::Buy => TradeLifecycle::Open,
                    OrderSide::Sell => TradeLifecycle::Close,
                };
                if let Err(e) =
                    self.repo
                        .insert_trade(run_id, &order, TradeDirection::Long, lifecycle)
                {
                    warn!(run_id = %run_id, order_id = %order.id, error = %e, "failed to persist trade");
                }
            }
            Err(e) => {
                warn!(
                    run_id = %run_id,
                    symbol = %signal.symbol,
                    reason = %signal.reason,
                    error = %e,
                    "order rejected"
                );
            }
        }
    }

    /// Best-effort snapshot write: failures are logged, never fatal.
    fn persist_snapshot(
        &self,
        run_id: &str,
        timestamp: DateTime<Utc>,
        snapshot: &PortfolioSnapshot,
        equity_peak: f64,
    ) {
        let drawdown = if equity_peak > 0.0 {
            ((equity_peak - snapshot.total_value) / equity_peak).max(0.0)
        } else {
            0.0
        };
        let record = PerformanceSnapshot {
            timestamp,
            portfolio_value: snapshot.total_value,
            cash_balance: snapshot.cash,
            position_value: snapshot.position_value(),
            total_return: snapshot.total_return(),
            drawdown,
        };
        if let Err(e) = self.repo.insert_performance_snapshot(run_id, &record) {
            warn!(run_id = %run_id, error = %e, "failed to persist performance snapshot");
        }
    }

    fn publish(&self, event: EngineEvent) {
        if let Some(bus) = &self.bus {
            bus.publish(&event);
        }
    }
}
