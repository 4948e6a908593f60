//! Exponential Moving Average.
//!
//! Seeded with the first price, then
//! `ema[i] = (price[i] - ema[i-1]) * k + ema[i-1]` with `k = 2/(periods+1)`.

use crate::domain::error::CoinstratError;

/// Full EMA sequence, one value per input price. The MACD line and signal
/// line are built from these.
pub fn ema_series(prices: &[f64], periods: usize) -> Result<Vec<f64>, CoinstratError> {
    if prices.is_empty() {
        return Err(CoinstratError::InvalidInput {
            reason: "ema requires a non-empty price sequence".into(),
        });
    }
    if periods == 0 {
        return Err(CoinstratError::InvalidInput {
            reason: "ema requires a positive period".into(),
        });
    }

    let k = 2.0 / (periods as f64 + 1.0);
    let mut values = Vec::with_capacity(prices.len());
    let mut current = prices[0];
    values.push(current);
    for &price in &prices[1..] {
        current = (price - current) * k + current;
        values.push(current);
    }
    Ok(values)
}

/// Final EMA value only.
pub fn ema(prices: &[f64], periods: usize) -> Result<f64, CoinstratError> {
    let series = ema_series(prices, periods)?;
    Ok(*series.last().expect("series is non-empty for non-empty input"))
}
