//! Integration tests for the engine bar loop and run state machine.
//!
//! Covers:
//! 1. Full run: equity curve length, metrics identity, persisted lifecycle
//! 2. Fatal conditions: empty data, strategy errors, cancellation
//! 3. Non-fatal conditions: order rejections mid-run
//! 4. Progress events over the bus

use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use serde_json::json;

use tapesim_core::broker::Broker;
use tapesim_core::data::StaticBarSource;
use tapesim_core::domain::{Bar, PortfolioSnapshot, Signal};
use tapesim_core::engine::{
    BacktestConfig, CancelToken, Engine, EngineError, RunState,
};
use tapesim_core::persist::{MemoryRepository, TradeLifecycle};
use tapesim_core::progress::{EngineEvent, ProgressBus};
use tapesim_core::strategy::{Params, Strategy, StrategyError, StrategyRegistry};

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
}

/// Bars on consecutive days following the given closes.
fn make_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap() + Duration::days(i as i64);
            Bar {
                symbol: "BTC".into(),
                timestamp: ts,
                open: close,
                high: close + 1.0,
                low: (close - 1.0).max(0.01),
                close,
                volume: 1_000.0,
            }
        })
        .collect()
}

/// 60 closes engineered to force one full round trip for a 5/20 crossover:
/// decline, sharp rally (golden cross), collapse (death cross).
fn round_trip_closes() -> Vec<f64> {
    let mut closes = Vec::with_capacity(60);
    for i in 0..20 {
        closes.push(150.0 - 2.0 * i as f64); // 150 → 112
    }
    for i in 0..20 {
        closes.push(115.0 + 5.0 * i as f64); // rally to 210
    }
    for i in 0..20 {
        closes.push(205.0 - 6.0 * i as f64); // collapse to 91
    }
    closes
}

fn crossover_config(bars: usize) -> BacktestConfig {
    let end = start_date() + Duration::days(bars as i64 - 1);
    let mut config = BacktestConfig::new("ma_crossover", "BTC", start_date(), end, 10_000.0)
        .with_costs(0.001, 0.0005);
    config.params.insert("fast_period".into(), json!(5));
    config.params.insert("slow_period".into(), json!(20));
    config
}

struct Fixture {
    registry: StrategyRegistry,
    data: Arc<StaticBarSource>,
    repo: Arc<MemoryRepository>,
}

impl Fixture {
    fn new(closes: &[f64]) -> Self {
        Self {
            registry: StrategyRegistry::with_builtins(),
            data: Arc::new(StaticBarSource::new(make_bars(closes))),
            repo: Arc::new(MemoryRepository::new()),
        }
    }

    fn engine(&self, config: BacktestConfig) -> Engine {
        Engine::new(config, &self.registry, self.data.clone(), self.repo.clone())
            .expect("engine construction")
    }
}

#[test]
fn full_run_completes_with_round_trip() {
    let closes = round_trip_closes();
    let fixture = Fixture::new(&closes);
    let mut engine = fixture.engine(crossover_config(closes.len()));

    let result = engine.run().expect("run should complete");
    assert_eq!(engine.state(), RunState::Completed);

    // One equity sample per bar, drawdown curve aligned.
    assert_eq!(result.equity_curve.len(), closes.len());
    assert_eq!(result.drawdown_curve.len(), closes.len());

    // The engineered series produces at least one full round trip.
    let filled = result.filled_orders().count();
    assert!(filled >= 2, "expected a buy and a sell, got {filled} fills");
    assert!(result.metrics.total_trades >= 1);
    assert_eq!(
        result.metrics.total_trades,
        result.metrics.winning_trades + result.metrics.losing_trades
    );

    // Final portfolio accounting identity.
    let snapshot = &result.final_portfolio;
    assert!(
        (snapshot.total_value - (snapshot.cash + snapshot.position_value())).abs() < 1e-9
    );
}

#[test]
fn run_lifecycle_is_persisted() {
    let closes = round_trip_closes();
    let fixture = Fixture::new(&closes);
    let mut engine = fixture.engine(crossover_config(closes.len()));
    let result = engine.run().unwrap();

    let record = fixture.repo.run(&result.run_id).expect("run record");
    assert_eq!(record.state, RunState::Completed);
    assert!(record.error.is_none());

    let metrics = record.metrics.expect("final metrics persisted");
    assert_eq!(metrics.total_trades, result.metrics.total_trades);

    // Snapshot every 10 bars over 60 bars.
    assert_eq!(record.snapshots.len(), closes.len() / 10);

    // Every filled order was persisted as a trade with its lifecycle.
    assert_eq!(record.trades.len(), result.filled_orders().count());
    assert!(record
        .trades
        .iter()
        .any(|t| t.lifecycle == TradeLifecycle::Open));
    assert!(record
        .trades
        .iter()
        .any(|t| t.lifecycle == TradeLifecycle::Close));
}

#[test]
fn empty_data_fails_the_run() {
    let fixture = Fixture::new(&[]);
    let mut engine = fixture.engine(crossover_config(30));

    let err = engine.run().unwrap_err();
    assert!(matches!(err, EngineError::NoHistoricalData { .. }));
    assert_eq!(engine.state(), RunState::Failed);

    let record = fixture.repo.run(&engine.run_id()).expect("run record");
    assert_eq!(record.state, RunState::Failed);
    assert!(record.error.unwrap().contains("no historical data"));
}

#[test]
fn cancellation_stops_between_bars() {
    let closes = round_trip_closes();
    let fixture = Fixture::new(&closes);
    let cancel = CancelToken::new();
    cancel.cancel(); // pre-cancelled: stops after the first bar

    let mut engine = fixture
        .engine(crossover_config(closes.len()))
        .with_cancel(cancel);

    let err = engine.run().unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
    assert_eq!(engine.state(), RunState::Failed);

    let record = fixture.repo.run(&engine.run_id()).unwrap();
    assert_eq!(record.error.as_deref(), Some("run cancelled"));
}

#[test]
fn run_is_single_shot() {
    let closes = round_trip_closes();
    let fixture = Fixture::new(&closes);
    let mut engine = fixture.engine(crossover_config(closes.len()));

    engine.run().unwrap();
    let err = engine.run().unwrap_err();
    assert!(matches!(
        err,
        EngineError::AlreadyRan {
            state: RunState::Completed
        }
    ));
}

#[test]
fn progress_events_reach_subscribers() {
    let closes = round_trip_closes();
    let fixture = Fixture::new(&closes);
    let bus = Arc::new(ProgressBus::new());

    let config = crossover_config(closes.len());
    let rx = bus.subscribe(&config.run_id());
    let mut engine = fixture.engine(config).with_progress(bus);

    engine.run().unwrap();

    let events: Vec<EngineEvent> = rx.try_iter().collect();
    let progress_count = events
        .iter()
        .filter(|e| matches!(e, EngineEvent::Progress { .. }))
        .count();
    assert_eq!(progress_count, closes.len() / 10);

    match events.last().expect("events emitted") {
        EngineEvent::Completed { result, .. } => {
            assert_eq!(result.equity_curve.len(), closes.len());
        }
        other => panic!("expected Completed as the final event, got {other:?}"),
    }

    // Progress percentages are monotonically non-decreasing.
    let mut last_pct = 0.0;
    for event in &events {
        if let EngineEvent::Progress {
            percent_complete, ..
        } = event
        {
            assert!(*percent_complete >= last_pct);
            last_pct = *percent_complete;
        }
    }
}

#[test]
fn failed_run_emits_failed_event() {
    let fixture = Fixture::new(&[]);
    let bus = Arc::new(ProgressBus::new());
    let config = crossover_config(30);
    let rx = bus.subscribe(&config.run_id());

    let mut engine = fixture.engine(config).with_progress(bus);
    engine.run().unwrap_err();

    let events: Vec<EngineEvent> = rx.try_iter().collect();
    assert!(matches!(
        events.last(),
        Some(EngineEvent::Failed { .. })
    ));
}

// ── Custom strategies for failure-path coverage ─────────────────────

/// Buys an impossible quantity every bar: every order is rejected.
struct Pushy;

impl Strategy for Pushy {
    fn id(&self) -> &str {
        "pushy"
    }
    fn name(&self) -> &str {
        "Pushy"
    }
    fn description(&self) -> &str {
        "Submits an unaffordable buy on every bar"
    }
    fn params(&self) -> Params {
        Params::new()
    }
    fn validate_params(&self, _params: &Params) -> Vec<String> {
        Vec::new()
    }
    fn initialize(&mut self, _params: &Params) -> Result<(), StrategyError> {
        Ok(())
    }
    fn on_bar(&mut self, bar: &Bar, _broker: &Broker) -> Result<Option<Signal>, StrategyError> {
        Ok(Some(Signal::buy(
            bar.symbol.clone(),
            1_000_000.0,
            "always buying",
            bar.timestamp,
        )))
    }
}

/// Errors out on the Nth bar.
struct Faulty {
    bars_seen: usize,
    fail_at: usize,
    ended: bool,
}

impl Strategy for Faulty {
    fn id(&self) -> &str {
        "faulty"
    }
    fn name(&self) -> &str {
        "Faulty"
    }
    fn description(&self) -> &str {
        "Fails mid-run"
    }
    fn params(&self) -> Params {
        Params::new()
    }
    fn validate_params(&self, _params: &Params) -> Vec<String> {
        Vec::new()
    }
    fn initialize(&mut self, _params: &Params) -> Result<(), StrategyError> {
        Ok(())
    }
    fn on_bar(&mut self, _bar: &Bar, _broker: &Broker) -> Result<Option<Signal>, StrategyError> {
        self.bars_seen += 1;
        if self.bars_seen >= self.fail_at {
            return Err(StrategyError::Execution(
                "indicator state corrupted".into(),
            ));
        }
        Ok(None)
    }
    fn on_end(&mut self, _portfolio: &PortfolioSnapshot) {
        self.ended = true;
    }
}

#[test]
fn rejected_orders_do_not_fail_the_run() {
    let closes = round_trip_closes();
    let mut registry = StrategyRegistry::new();
    registry.register(Box::new(|| Box::new(Pushy)));

    let data = Arc::new(StaticBarSource::new(make_bars(&closes)));
    let repo = Arc::new(MemoryRepository::new());
    let end = start_date() + Duration::days(closes.len() as i64 - 1);
    let config = BacktestConfig::new("pushy", "BTC", start_date(), end, 10_000.0);

    let mut engine = Engine::new(config, &registry, data, repo).unwrap();
    let result = engine.run().expect("rejections are not fatal");

    assert_eq!(engine.state(), RunState::Completed);
    assert_eq!(result.rejected_orders().count(), closes.len());
    assert_eq!(result.filled_orders().count(), 0);
    assert_eq!(result.metrics.total_trades, 0);
    assert_eq!(result.metrics.win_rate, 0.0);
}

#[test]
fn strategy_error_is_fatal() {
    let closes = round_trip_closes();
    let data = Arc::new(StaticBarSource::new(make_bars(&closes)));
    let repo = Arc::new(MemoryRepository::new());
    let mut registry = StrategyRegistry::new();
    registry.register(Box::new(|| {
        Box::new(Faulty {
            bars_seen: 0,
            fail_at: 5,
            ended: false,
        })
    }));

    let end = start_date() + Duration::days(closes.len() as i64 - 1);
    let config = BacktestConfig::new("faulty", "BTC", start_date(), end, 10_000.0);
    let mut engine = Engine::new(config, &registry, data, repo.clone()).unwrap();

    let err = engine.run().unwrap_err();
    assert!(matches!(err, EngineError::Strategy(_)));
    assert_eq!(engine.state(), RunState::Failed);

    let record = repo.run(&engine.run_id()).unwrap();
    assert_eq!(record.state, RunState::Failed);
    assert!(record.error.unwrap().contains("indicator state corrupted"));
}
