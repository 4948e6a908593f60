//! Return volatility.

/// Population standard deviation of simple step-over-step returns across the
/// first `period` samples. Returns 0 when fewer than `period` samples exist.
pub fn volatility(prices: &[f64], period: usize) -> f64 {
    if period < 2 || prices.len() < period {
        return 0.0;
    }

    let window = &prices[..period];
    let mut returns = Vec::with_capacity(period - 1);
    for pair in window.windows(2) {
        if pair[0] == 0.0 {
            return 0.0;
        }
        returns.push((pair[1] - pair[0]) / pair[0]);
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / n;
    variance.sqrt()
}
