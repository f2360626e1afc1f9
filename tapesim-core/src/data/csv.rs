//! CSV-backed bar source — one file per symbol.
//!
//! Expects `<dir>/<SYMBOL>.csv` with a header row:
//! `timestamp,open,high,low,close,volume`. Timestamps are RFC 3339
//! (`2024-01-02T00:00:00Z`) or plain dates (`2024-01-02`, read as midnight
//! UTC). Rows are sorted by timestamp after parsing, so unordered files are
//! tolerated.

use super::{BarSource, DataError};
use crate::domain::Bar;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Directory of per-symbol CSV files.
#[derive(Debug, Clone)]
pub struct CsvBarSource {
    dir: PathBuf,
}

impl CsvBarSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        raw.parse::<NaiveDate>()
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN).and_utc())
    }

    fn read_file(&self, symbol: &str, path: &Path) -> Result<Vec<Bar>, DataError> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut bars = Vec::new();

        for (row_index, record) in reader.deserialize::<CsvRow>().enumerate() {
            let row = record?;
            let timestamp = Self::parse_timestamp(&row.timestamp).ok_or_else(|| {
                DataError::InvalidRow {
                    path: path.display().to_string(),
                    row: row_index + 1,
                    reason: format!("unparseable timestamp '{}'", row.timestamp),
                }
            })?;
            bars.push(Bar {
                symbol: symbol.to_string(),
                timestamp,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

impl BarSource for CsvBarSource {
    fn load_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        let path = self.file_for(symbol);
        if !path.exists() {
            return Err(DataError::MissingFile {
                symbol: symbol.to_string(),
                path: path.display().to_string(),
            });
        }

        let bars = self.read_file(symbol, &path)?;
        Ok(bars
            .into_iter()
            .filter(|b| {
                let date = b.timestamp.date_naive();
                date >= start && date <= end
            })
            .collect())
    }
}
