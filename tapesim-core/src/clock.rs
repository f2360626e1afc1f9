//! Simulation clocks — the engine's only notion of "current time".
//!
//! Three variants:
//! - `HistoricalClock`: deterministic stepped time for backtests
//! - `LiveClock`: system wall time for paper-trading style runs
//! - `PausableClock`: wall time that can be frozen and resumed
//!
//! Each engine instance owns exactly one clock; clocks are never shared
//! between concurrent runs.

use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// Time source for a single run.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    fn is_historical(&self) -> bool;
}

/// Deterministic stepped clock for the historical bar loop.
///
/// Time starts at `start`; `advance()` adds exactly one step. No dependency
/// on wall time, so two runs over the same data produce identical order
/// timestamps.
#[derive(Debug)]
pub struct HistoricalClock {
    current_micros: AtomicI64,
    step: Duration,
}

impl HistoricalClock {
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            current_micros: AtomicI64::new(start.timestamp_micros()),
            step,
        }
    }

    /// Move simulated time forward by exactly one step.
    pub fn advance(&self) {
        self.current_micros
            .fetch_add(self.step.num_microseconds().unwrap_or(0), Ordering::SeqCst);
    }

    pub fn step(&self) -> Duration {
        self.step
    }
}

impl Clock for HistoricalClock {
    fn now(&self) -> DateTime<Utc> {
        let micros = self.current_micros.load(Ordering::SeqCst);
        DateTime::from_timestamp_micros(micros).unwrap_or_default()
    }

    fn is_historical(&self) -> bool {
        true
    }
}

/// System wall-clock time.
#[derive(Debug, Default)]
pub struct LiveClock;

impl Clock for LiveClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn is_historical(&self) -> bool {
        false
    }
}

/// Wall-clock time that can be frozen.
///
/// While paused, `now()` returns the instant at which `pause()` was called,
/// until `resume()`.
#[derive(Debug, Default)]
pub struct PausableClock {
    paused_at: Mutex<Option<DateTime<Utc>>>,
}

impl PausableClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        let mut paused = self.paused_at.lock().unwrap_or_else(|e| e.into_inner());
        if paused.is_none() {
            *paused = Some(Utc::now());
        }
    }

    pub fn resume(&self) {
        let mut paused = self.paused_at.lock().unwrap_or_else(|e| e.into_inner());
        *paused = None;
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl Clock for PausableClock {
    fn now(&self) -> DateTime<Utc> {
        let paused = self.paused_at.lock().unwrap_or_else(|e| e.into_inner());
        match *paused {
            Some(at) => at,
            None => Utc::now(),
        }
    }

    fn is_historical(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn historical_clock_steps_deterministically() {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let clock = HistoricalClock::new(start, Duration::days(1));
        assert!(clock.is_historical());
        assert_eq!(clock.now(), start);

        clock.advance();
        clock.advance();
        assert_eq!(clock.now(), start + Duration::days(2));
    }

    #[test]
    fn historical_clocks_do_not_share_state() {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let a = HistoricalClock::new(start, Duration::hours(1));
        let b = HistoricalClock::new(start, Duration::hours(1));
        a.advance();
        assert_eq!(b.now(), start);
    }

    #[test]
    fn live_clock_is_not_historical() {
        assert!(!LiveClock.is_historical());
    }

    #[test]
    fn pausable_clock_freezes_while_paused() {
        let clock = PausableClock::new();
        assert!(!clock.is_paused());

        clock.pause();
        assert!(clock.is_paused());
        let first = clock.now();
        let second = clock.now();
        assert_eq!(first, second);

        clock.resume();
        assert!(!clock.is_paused());
        assert!(clock.now() >= first);
    }

    #[test]
    fn double_pause_keeps_first_instant() {
        let clock = PausableClock::new();
        clock.pause();
        let first = clock.now();
        clock.pause();
        assert_eq!(clock.now(), first);
    }
}
