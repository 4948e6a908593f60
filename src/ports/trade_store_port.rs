//! Trade and risk-state persistence port trait.

use chrono::{DateTime, Utc};

use crate::domain::error::CoinstratError;
use crate::domain::transaction::Transaction;

/// Persistence for transactions plus the two bits of per-asset risk state
/// that must survive restarts: the DCA clock and the trailing-stop ratchet.
pub trait TradeStorePort: Send + Sync {
    fn append_transaction(&self, transaction: &Transaction) -> Result<(), CoinstratError>;

    fn last_dca_time(&self, asset: &str) -> Result<Option<DateTime<Utc>>, CoinstratError>;
    fn set_last_dca_time(&self, asset: &str, at: DateTime<Utc>) -> Result<(), CoinstratError>;

    fn trailing_stop_level(&self, asset: &str) -> Result<Option<f64>, CoinstratError>;
    fn set_trailing_stop_level(&self, asset: &str, level: f64) -> Result<(), CoinstratError>;
    /// Remove the ratchet after a position closes so the next position
    /// starts fresh.
    fn clear_trailing_stop(&self, asset: &str) -> Result<(), CoinstratError>;
}
