//! Price samples and rolling per-asset history.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// A single recorded price tick. Immutable once recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSample {
    pub asset: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

impl PriceSample {
    pub fn new(asset: impl Into<String>, price: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            asset: asset.into(),
            price,
            timestamp,
        }
    }
}

/// Chronological price series for one asset, bounded to the most recent
/// `capacity` samples. Live operation keeps only what the indicators need;
/// backtests read unbounded series straight from the data adapter instead.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    samples: VecDeque<PriceSample>,
    capacity: usize,
}

impl PriceHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest when full. Out-of-order samples
    /// (timestamp earlier than the newest held) are dropped.
    pub fn push(&mut self, sample: PriceSample) {
        if let Some(last) = self.samples.back() {
            if sample.timestamp < last.timestamp {
                return;
            }
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples in chronological order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PriceSample> {
        self.samples.iter()
    }

    /// Close prices in chronological order.
    pub fn prices(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.price).collect()
    }

    /// The most recent `count` samples, chronological ascending.
    pub fn recent(&self, count: usize) -> Vec<PriceSample> {
        let skip = self.samples.len().saturating_sub(count);
        self.samples.iter().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn sample(price: f64, secs: i64) -> PriceSample {
        PriceSample::new("BTC", price, ts(secs))
    }

    #[test]
    fn push_and_len() {
        let mut history = PriceHistory::new(5);
        assert!(history.is_empty());

        history.push(sample(100.0, 1));
        history.push(sample(101.0, 2));
        assert_eq!(history.len(), 2);
        assert_eq!(history.prices(), vec![100.0, 101.0]);
    }

    #[test]
    fn bounded_to_capacity() {
        let mut history = PriceHistory::new(3);
        for i in 0..5 {
            history.push(sample(100.0 + i as f64, i));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.prices(), vec![102.0, 103.0, 104.0]);
    }

    #[test]
    fn out_of_order_sample_dropped() {
        let mut history = PriceHistory::new(5);
        history.push(sample(100.0, 10));
        history.push(sample(99.0, 5));
        assert_eq!(history.len(), 1);
        assert_eq!(history.prices(), vec![100.0]);
    }

    #[test]
    fn recent_returns_newest_ascending() {
        let mut history = PriceHistory::new(10);
        for i in 0..6 {
            history.push(sample(100.0 + i as f64, i));
        }
        let recent = history.recent(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].price, 103.0);
        assert_eq!(recent[2].price, 105.0);
    }

    #[test]
    fn recent_with_short_history_returns_all() {
        let mut history = PriceHistory::new(10);
        history.push(sample(100.0, 1));
        let recent = history.recent(5);
        assert_eq!(recent.len(), 1);
    }
}
