//! Percentage price change over a window.

/// Percent change from the oldest to the newest sample.
///
/// `history` is ordered most-recent-first (the shape recent-price queries
/// hand back when reversed for display); the oldest price is the
/// denominator. Returns 0 with fewer than 2 samples or a zero oldest price.
pub fn price_change_percent(history: &[f64]) -> f64 {
    if history.len() < 2 {
        return 0.0;
    }
    let newest = history[0];
    let oldest = history[history.len() - 1];
    if oldest == 0.0 {
        return 0.0;
    }
    (newest - oldest) / oldest * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rise_is_positive() {
        // Newest 120, oldest 100 -> +20%.
        assert_relative_eq!(price_change_percent(&[120.0, 110.0, 100.0]), 20.0);
    }

    #[test]
    fn fall_is_negative() {
        assert_relative_eq!(price_change_percent(&[80.0, 100.0]), -20.0);
    }

    #[test]
    fn single_sample_is_zero() {
        assert_eq!(price_change_percent(&[100.0]), 0.0);
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(price_change_percent(&[]), 0.0);
    }

    #[test]
    fn zero_oldest_price_is_zero() {
        assert_eq!(price_change_percent(&[100.0, 0.0]), 0.0);
    }
}
