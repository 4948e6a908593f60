//! Market data access port trait.

use chrono::{DateTime, Utc};

use crate::domain::error::CoinstratError;
use crate::domain::price::PriceSample;

/// Read/write access to recorded price ticks. Acquisition from exchanges is
/// some other component's job; the engine only ever reads what was stored.
pub trait MarketDataPort: Send + Sync {
    fn append_price(
        &self,
        asset: &str,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), CoinstratError>;

    /// The most recent `count` samples for `asset`, chronological ascending.
    fn recent_prices(&self, asset: &str, count: usize)
        -> Result<Vec<PriceSample>, CoinstratError>;
}
