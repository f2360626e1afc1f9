//! Drawdown analysis over an equity curve.

/// Per-point drawdown: `(peak_so_far - value) / peak_so_far`, as a positive
/// fraction. Zero at new peaks.
pub fn drawdown_curve(equity: &[f64]) -> Vec<f64> {
    let mut peak = f64::MIN;
    equity
        .iter()
        .map(|&value| {
            if value > peak {
                peak = value;
            }
            if peak > 0.0 {
                (peak - value) / peak
            } else {
                0.0
            }
        })
        .collect()
}

/// Largest peak-to-trough decline as a positive fraction
/// (0.15 = 15% drawdown). Zero for monotonically rising equity.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    drawdown_curve(equity).into_iter().fold(0.0, f64::max)
}

/// Longest span (in bars) spent below a prior equity peak.
pub fn max_drawdown_duration(equity: &[f64]) -> usize {
    let mut peak = f64::MIN;
    let mut longest = 0usize;
    let mut current = 0usize;

    for &value in equity {
        if value >= peak {
            peak = value;
            current = 0;
        } else {
            current += 1;
            longest = longest.max(current);
        }
    }
    longest
}
