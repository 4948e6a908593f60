//! Relative Strength Index.

/// Momentum oscillator in [0, 100].
///
/// Splits the trailing `periods` price differences into gains and losses and
/// averages each side. 100 when the average loss is exactly zero, neutral 50
/// when fewer than `periods` samples exist.
pub fn rsi(prices: &[f64], periods: usize) -> f64 {
    if periods == 0 || prices.len() < periods {
        return 50.0;
    }

    // Trailing `periods` differences need `periods + 1` samples; with exactly
    // `periods` samples we average over the differences actually available.
    let window = if prices.len() > periods {
        &prices[prices.len() - (periods + 1)..]
    } else {
        prices
    };

    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;
    let mut steps = 0usize;
    for pair in window.windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            gain_sum += change;
        } else {
            loss_sum += -change;
        }
        steps += 1;
    }

    if steps == 0 {
        return 50.0;
    }

    let avg_gain = gain_sum / steps as f64;
    let avg_loss = loss_sum / steps as f64;

    if avg_loss == 0.0 {
        return 100.0;
    }

    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}
