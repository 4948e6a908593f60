//! Shared helpers for integration tests.

use chrono::{DateTime, TimeZone, Utc};
use coinstrat::adapters::memory_store::MemoryStoreAdapter;
use coinstrat::domain::ledger::{LedgerLimits, PortfolioLedger};
use coinstrat::domain::price::PriceSample;
use coinstrat::domain::strategy::StrategyConfig;
use coinstrat::domain::engine::StrategyDecisionEngine;
use coinstrat::ports::MarketDataPort;
use std::sync::{Arc, Mutex};

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn samples(asset: &str, prices: &[f64]) -> Vec<PriceSample> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| PriceSample::new(asset, p, ts(i as i64 * 3600)))
        .collect()
}

/// Flat history then a crash: fires every oversold entry condition at once.
pub fn crash_series(len: usize) -> Vec<f64> {
    let mut prices = vec![100.0; len - 1];
    prices.push(50.0);
    prices
}

pub fn engine_with_prices(
    prices: &[f64],
    balance: f64,
    limits: LedgerLimits,
    config: StrategyConfig,
) -> (StrategyDecisionEngine, Arc<MemoryStoreAdapter>) {
    let store = Arc::new(MemoryStoreAdapter::new(512));
    for (i, &price) in prices.iter().enumerate() {
        store.append_price("BTC", price, ts(i as i64 * 60)).unwrap();
    }
    let ledger = Arc::new(Mutex::new(PortfolioLedger::new(balance, limits)));
    let engine = StrategyDecisionEngine::new(
        vec!["BTC".to_string()],
        config,
        ledger,
        store.clone(),
        store.clone(),
    );
    (engine, store)
}
