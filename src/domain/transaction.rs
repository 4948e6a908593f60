//! Append-only trade records.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }
}

/// A completed ledger mutation. Immutable, ordered by timestamp.
/// `realized_gain_loss` is present on sells only.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub side: TradeSide,
    pub asset: String,
    pub quantity: f64,
    pub price: f64,
    pub fee: f64,
    pub realized_gain_loss: Option<f64>,
    pub timestamp: DateTime<Utc>,
}
