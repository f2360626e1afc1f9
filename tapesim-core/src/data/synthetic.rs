//! Deterministic synthetic bar generator.
//!
//! Seeded geometric random walk for demos, benches, and determinism tests.
//! The same `(seed, symbol, range)` always produces the same bars; the seed
//! is mixed with a hash of the symbol so different symbols get independent
//! but reproducible paths.

use super::{BarSource, DataError};
use crate::domain::Bar;
use chrono::{Duration, NaiveDate, NaiveTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Synthetic daily bar source.
#[derive(Debug, Clone)]
pub struct SyntheticBarSource {
    seed: u64,
    start_price: f64,
    /// Per-bar drift as a fraction (e.g. 0.0005).
    drift: f64,
    /// Per-bar volatility as a fraction (e.g. 0.02).
    volatility: f64,
}

impl SyntheticBarSource {
    pub fn new(seed: u64, start_price: f64, drift: f64, volatility: f64) -> Self {
        Self {
            seed,
            start_price,
            drift,
            volatility,
        }
    }

    fn symbol_seed(&self, symbol: &str) -> u64 {
        let digest = blake3::hash(symbol.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest.as_bytes()[..8]);
        self.seed ^ u64::from_le_bytes(bytes)
    }
}

impl Default for SyntheticBarSource {
    fn default() -> Self {
        Self::new(42, 100.0, 0.0005, 0.02)
    }
}

impl BarSource for SyntheticBarSource {
    fn load_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        if end < start {
            return Ok(Vec::new());
        }

        let mut rng = StdRng::seed_from_u64(self.symbol_seed(symbol));
        let mut close = self.start_price;
        let days = (end - start).num_days() + 1;
        let mut bars = Vec::with_capacity(days as usize);

        for offset in 0..days {
            let date = start + Duration::days(offset);
            let open = close;
            let ret = self.drift + self.volatility * rng.gen_range(-1.0..1.0);
            close = (open * (1.0 + ret)).max(0.01);

            let span = open.max(close) - open.min(close);
            let high = open.max(close) + span * rng.gen_range(0.0..0.5);
            let low = (open.min(close) - span * rng.gen_range(0.0..0.5)).max(0.01);
            let volume = 1_000.0 * (1.0 + rng.gen_range(0.0..1.0));

            bars.push(Bar {
                symbol: symbol.to_string(),
                timestamp: date.and_time(NaiveTime::MIN).and_utc(),
                open,
                high,
                low,
                close,
                volume,
            });
        }

        Ok(bars)
    }
}
