//! Relative Strength Index with Wilder smoothing.
//!
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss), seeded over the first
//! `period` price changes, then smoothed with alpha = 1/period.
//! Edge cases: avg_loss == 0 → 100; avg_gain == 0 → 0; both zero → 50.

#[derive(Debug, Clone)]
pub struct WilderRsi {
    period: usize,
    prev_close: Option<f64>,
    avg_gain: f64,
    avg_loss: f64,
    changes_seen: usize,
}

impl WilderRsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            prev_close: None,
            avg_gain: 0.0,
            avg_loss: 0.0,
            changes_seen: 0,
        }
    }

    /// Observe one close. Returns the RSI once `period` changes have been seen.
    pub fn push(&mut self, close: f64) -> Option<f64> {
        let prev = match self.prev_close.replace(close) {
            Some(p) => p,
            None => return None,
        };

        let change = close - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        self.changes_seen += 1;

        if self.changes_seen <= self.period {
            // Seed phase: plain averages over the first `period` changes.
            self.avg_gain += gain / self.period as f64;
            self.avg_loss += loss / self.period as f64;
        } else {
            let alpha = 1.0 / self.period as f64;
            self.avg_gain = alpha * gain + (1.0 - alpha) * self.avg_gain;
            self.avg_loss = alpha * loss + (1.0 - alpha) * self.avg_loss;
        }

        self.value()
    }

    /// Current RSI, `None` while warming up.
    pub fn value(&self) -> Option<f64> {
        if self.changes_seen < self.period {
            return None;
        }
        Some(compute_rsi(self.avg_gain, self.avg_loss))
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // no movement
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(rsi: &mut WilderRsi, closes: &[f64]) -> Option<f64> {
        let mut last = None;
        for &c in closes {
            last = rsi.push(c);
        }
        last
    }

    #[test]
    fn warms_up_over_period_changes() {
        let mut rsi = WilderRsi::new(3);
        assert_eq!(rsi.push(100.0), None);
        assert_eq!(rsi.push(101.0), None);
        assert_eq!(rsi.push(102.0), None);
        assert!(rsi.push(103.0).is_some());
    }

    #[test]
    fn all_gains_is_100() {
        let mut rsi = WilderRsi::new(3);
        let v = feed(&mut rsi, &[100.0, 101.0, 102.0, 103.0]).unwrap();
        assert!((v - 100.0).abs() < 1e-9);
    }

    #[test]
    fn all_losses_is_0() {
        let mut rsi = WilderRsi::new(3);
        let v = feed(&mut rsi, &[103.0, 102.0, 101.0, 100.0]).unwrap();
        assert!(v.abs() < 1e-9);
    }

    #[test]
    fn flat_series_is_50() {
        let mut rsi = WilderRsi::new(3);
        let v = feed(&mut rsi, &[100.0, 100.0, 100.0, 100.0]).unwrap();
        assert!((v - 50.0).abs() < 1e-9);
    }

    #[test]
    fn stays_within_bounds() {
        let mut rsi = WilderRsi::new(3);
        for &c in &[100.0, 105.0, 98.0, 110.0, 95.0, 115.0, 90.0, 120.0] {
            if let Some(v) = rsi.push(c) {
                assert!((0.0..=100.0).contains(&v), "RSI out of bounds: {v}");
            }
        }
    }

    #[test]
    fn mixed_series_matches_wilder_seed() {
        // Changes over period 3 seed: +0.34, -0.25, -0.48
        // avg_gain = 0.34/3, avg_loss = 0.73/3
        // RSI = 100 - 100/(1 + 0.34/0.73) ≈ 31.776
        let mut rsi = WilderRsi::new(3);
        let v = feed(&mut rsi, &[44.0, 44.34, 44.09, 43.61]).unwrap();
        assert!((v - 31.7757).abs() < 1e-3);
    }
}
