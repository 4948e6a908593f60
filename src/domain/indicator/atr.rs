//! Average True Range.

/// Mean of the trailing `period` true ranges, where
/// `TR[i] = max(high[i] - low[i], |high[i] - close[i-1]|, |low[i] - close[i-1]|)`
/// from index 1. Returns 0 when any input series is shorter than `period`.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> f64 {
    if period == 0
        || highs.len() < period
        || lows.len() < period
        || closes.len() < period
    {
        return 0.0;
    }

    let n = highs.len().min(lows.len()).min(closes.len());
    let mut true_ranges = Vec::with_capacity(n.saturating_sub(1));
    for i in 1..n {
        let hl = highs[i] - lows[i];
        let hc = (highs[i] - closes[i - 1]).abs();
        let lc = (lows[i] - closes[i - 1]).abs();
        true_ranges.push(hl.max(hc).max(lc));
    }

    if true_ranges.is_empty() {
        return 0.0;
    }

    let take = period.min(true_ranges.len());
    let tail = &true_ranges[true_ranges.len() - take..];
    tail.iter().sum::<f64>() / take as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn constant_range_bars() {
        let highs = vec![102.0; 15];
        let lows = vec![98.0; 15];
        let closes = vec![100.0; 15];
        assert_relative_eq!(atr(&highs, &lows, &closes, 14), 4.0);
    }

    #[test]
    fn gap_dominates_true_range() {
        // Second bar gaps well above the prior close.
        let highs = vec![100.0, 120.0];
        let lows = vec![99.0, 118.0];
        let closes = vec![100.0, 119.0];
        assert_relative_eq!(atr(&highs, &lows, &closes, 2), 20.0);
    }

    #[test]
    fn short_series_is_zero() {
        let highs = vec![100.0, 101.0];
        let lows = vec![99.0, 100.0];
        let closes = vec![100.0, 100.5];
        assert_eq!(atr(&highs, &lows, &closes, 14), 0.0);
    }

    #[test]
    fn close_only_series_still_positive() {
        // Live mode feeds closes for all three series; movement keeps TR > 0.
        let closes: Vec<f64> = (1..=15).map(|i| 100.0 + i as f64).collect();
        let value = atr(&closes, &closes, &closes, 14);
        assert_relative_eq!(value, 1.0);
    }

    #[test]
    fn zero_period_is_zero() {
        assert_eq!(atr(&[1.0], &[1.0], &[1.0], 0), 0.0);
    }
}
