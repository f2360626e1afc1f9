//! Historical data sources.
//!
//! The engine only depends on the `BarSource` read contract; adapters can
//! be swapped per backend. Bundled sources: CSV files, a deterministic
//! synthetic generator, and an in-memory source for tests.

pub mod csv;
pub mod synthetic;

pub use self::csv::CsvBarSource;
pub use synthetic::SyntheticBarSource;

use crate::domain::Bar;
use chrono::NaiveDate;
use thiserror::Error;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("no data file for symbol '{symbol}' at {path}")]
    MissingFile { symbol: String, path: String },

    #[error("invalid row {row} in {path}: {reason}")]
    InvalidRow {
        path: String,
        row: usize,
        reason: String,
    },
}

/// Read contract for historical bars.
///
/// Implementations return bars in ascending timestamp order within
/// `[start, end]`. No gap-filling is performed; an empty result is a fatal
/// condition for the engine, not for the source.
pub trait BarSource: Send + Sync {
    fn load_bars(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<Vec<Bar>, DataError>;
}

/// In-memory bar source for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticBarSource {
    bars: Vec<Bar>,
}

impl StaticBarSource {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars }
    }
}

impl BarSource for StaticBarSource {
    fn load_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        let mut bars: Vec<Bar> = self
            .bars
            .iter()
            .filter(|b| {
                let date = b.timestamp.date_naive();
                b.symbol == symbol && date >= start && date <= end
            })
            .cloned()
            .collect();
        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}
