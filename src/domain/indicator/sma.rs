//! Simple Moving Average.

/// Arithmetic mean of the last `periods` prices.
///
/// With fewer than `periods` samples available the mean of everything held
/// is returned, so a warming-up live feed still gets a usable value.
/// Empty input or a zero period yields 0.
pub fn sma(prices: &[f64], periods: usize) -> f64 {
    if prices.is_empty() || periods == 0 {
        return 0.0;
    }
    let window = if prices.len() >= periods {
        &prices[prices.len() - periods..]
    } else {
        prices
    };
    window.iter().sum::<f64>() / window.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_of_last_periods() {
        let prices = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_relative_eq!(sma(&prices, 3), 5.0);
    }

    #[test]
    fn short_input_averages_everything() {
        let prices = vec![10.0, 20.0];
        assert_relative_eq!(sma(&prices, 5), 15.0);
    }

    #[test]
    fn exact_window() {
        let prices = vec![2.0, 4.0, 6.0];
        assert_relative_eq!(sma(&prices, 3), 4.0);
    }

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(sma(&[], 3), 0.0);
    }

    #[test]
    fn zero_period_is_zero() {
        assert_eq!(sma(&[1.0, 2.0], 0), 0.0);
    }
}
