//! Bollinger Bands.

use super::sma::sma;

/// SMA ± `multiplier` population standard deviations over the trailing
/// `period` prices. Returns `(upper, middle, lower)`, or `(0, 0, 0)` when
/// fewer than `period` samples exist.
pub fn bollinger_bands(prices: &[f64], period: usize, multiplier: f64) -> (f64, f64, f64) {
    if period == 0 || prices.len() < period {
        return (0.0, 0.0, 0.0);
    }

    let window = &prices[prices.len() - period..];
    let middle = sma(prices, period);

    let variance = window
        .iter()
        .map(|p| {
            let diff = p - middle;
            diff * diff
        })
        .sum::<f64>()
        / period as f64;
    let band = multiplier * variance.sqrt();

    (middle + band, middle, middle - band)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn flat_series_collapses_to_middle() {
        let prices = vec![100.0; 20];
        let (upper, middle, lower) = bollinger_bands(&prices, 20, 2.0);
        assert_relative_eq!(upper, 100.0);
        assert_relative_eq!(middle, 100.0);
        assert_relative_eq!(lower, 100.0);
    }

    #[test]
    fn known_standard_deviation() {
        // Window [2, 4, 4, 4, 5, 5, 7, 9]: mean 5, population stddev 2.
        let prices = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let (upper, middle, lower) = bollinger_bands(&prices, 8, 2.0);
        assert_relative_eq!(middle, 5.0);
        assert_relative_eq!(upper, 9.0);
        assert_relative_eq!(lower, 1.0);
    }

    #[test]
    fn insufficient_data_is_zero_triple() {
        let prices = vec![100.0, 101.0];
        assert_eq!(bollinger_bands(&prices, 20, 2.0), (0.0, 0.0, 0.0));
    }

    #[test]
    fn uses_trailing_window() {
        let mut prices = vec![1000.0; 10];
        prices.extend(vec![50.0; 5]);
        let (_, middle, _) = bollinger_bands(&prices, 5, 2.0);
        assert_relative_eq!(middle, 50.0);
    }
}
