//! In-memory market data and trade store.
//!
//! Backs tests and ephemeral runs where nothing needs to survive a restart.
//! Implements both store ports behind one mutex per concern, so the same
//! `Arc<MemoryStoreAdapter>` can serve as market data source and trade store
//! at once.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::error::CoinstratError;
use crate::domain::price::{PriceHistory, PriceSample};
use crate::domain::transaction::Transaction;
use crate::ports::{MarketDataPort, TradeStorePort};

pub struct MemoryStoreAdapter {
    capacity: usize,
    histories: Mutex<HashMap<String, PriceHistory>>,
    transactions: Mutex<Vec<Transaction>>,
    dca_times: Mutex<HashMap<String, DateTime<Utc>>>,
    trailing_stops: Mutex<HashMap<String, f64>>,
}

impl MemoryStoreAdapter {
    /// `capacity` bounds the per-asset price history.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            histories: Mutex::new(HashMap::new()),
            transactions: Mutex::new(Vec::new()),
            dca_times: Mutex::new(HashMap::new()),
            trailing_stops: Mutex::new(HashMap::new()),
        }
    }

    /// Snapshot of every recorded transaction, in append order.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.transactions.lock().expect("lock poisoned").clone()
    }
}

impl MarketDataPort for MemoryStoreAdapter {
    fn append_price(
        &self,
        asset: &str,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), CoinstratError> {
        let mut histories = self.histories.lock().expect("lock poisoned");
        histories
            .entry(asset.to_string())
            .or_insert_with(|| PriceHistory::new(self.capacity))
            .push(PriceSample::new(asset, price, timestamp));
        Ok(())
    }

    fn recent_prices(&self, asset: &str, count: usize) -> Result<Vec<PriceSample>, CoinstratError> {
        let histories = self.histories.lock().expect("lock poisoned");
        Ok(histories
            .get(asset)
            .map(|h| h.recent(count))
            .unwrap_or_default())
    }
}

impl TradeStorePort for MemoryStoreAdapter {
    fn append_transaction(&self, transaction: &Transaction) -> Result<(), CoinstratError> {
        self.transactions
            .lock()
            .expect("lock poisoned")
            .push(transaction.clone());
        Ok(())
    }

    fn last_dca_time(&self, asset: &str) -> Result<Option<DateTime<Utc>>, CoinstratError> {
        Ok(self.dca_times.lock().expect("lock poisoned").get(asset).copied())
    }

    fn set_last_dca_time(&self, asset: &str, at: DateTime<Utc>) -> Result<(), CoinstratError> {
        self.dca_times
            .lock()
            .expect("lock poisoned")
            .insert(asset.to_string(), at);
        Ok(())
    }

    fn trailing_stop_level(&self, asset: &str) -> Result<Option<f64>, CoinstratError> {
        Ok(self
            .trailing_stops
            .lock()
            .expect("lock poisoned")
            .get(asset)
            .copied())
    }

    fn set_trailing_stop_level(&self, asset: &str, level: f64) -> Result<(), CoinstratError> {
        self.trailing_stops
            .lock()
            .expect("lock poisoned")
            .insert(asset.to_string(), level);
        Ok(())
    }

    fn clear_trailing_stop(&self, asset: &str) -> Result<(), CoinstratError> {
        self.trailing_stops
            .lock()
            .expect("lock poisoned")
            .remove(asset);
        Ok(())
    }
}
