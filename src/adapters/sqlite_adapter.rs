//! SQLite persistence adapter.
//!
//! Durable counterpart to the in-memory store: prices, transactions, DCA
//! timestamps and trailing stop levels all live in one database file, so a
//! restarted engine resumes with its ratchets and purchase schedule intact.
//! `rusqlite::Connection` is not `Sync`, hence the mutex.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use crate::domain::error::CoinstratError;
use crate::domain::price::PriceSample;
use crate::domain::transaction::{TradeSide, Transaction};
use crate::ports::{MarketDataPort, TradeStorePort};

pub struct SqliteAdapter {
    conn: Mutex<Connection>,
}

fn store_err(e: rusqlite::Error) -> CoinstratError {
    CoinstratError::Store {
        reason: e.to_string(),
    }
}

impl SqliteAdapter {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CoinstratError> {
        Self::from_connection(Connection::open(path).map_err(store_err)?)
    }

    pub fn open_in_memory() -> Result<Self, CoinstratError> {
        Self::from_connection(Connection::open_in_memory().map_err(store_err)?)
    }

    fn from_connection(conn: Connection) -> Result<Self, CoinstratError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS prices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                asset TEXT NOT NULL,
                price REAL NOT NULL,
                ts INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_prices_asset_ts ON prices (asset, ts);
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                side TEXT NOT NULL,
                asset TEXT NOT NULL,
                quantity REAL NOT NULL,
                price REAL NOT NULL,
                fee REAL NOT NULL,
                realized_gain_loss REAL,
                ts INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS dca_state (
                asset TEXT PRIMARY KEY,
                last_ts INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS trailing_stops (
                asset TEXT PRIMARY KEY,
                level REAL NOT NULL
            );",
        )
        .map_err(store_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// All recorded transactions in append order.
    pub fn transactions(&self) -> Result<Vec<Transaction>, CoinstratError> {
        let conn = self.conn.lock().expect("connection lock poisoned");
        let mut stmt = conn
            .prepare(
                "SELECT side, asset, quantity, price, fee, realized_gain_loss, ts
                 FROM transactions ORDER BY id",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map([], |row| {
                let side: String = row.get(0)?;
                let secs: i64 = row.get(6)?;
                Ok(Transaction {
                    side: if side == "SELL" {
                        TradeSide::Sell
                    } else {
                        TradeSide::Buy
                    },
                    asset: row.get(1)?,
                    quantity: row.get(2)?,
                    price: row.get(3)?,
                    fee: row.get(4)?,
                    realized_gain_loss: row.get(5)?,
                    timestamp: Utc.timestamp_opt(secs, 0).single().unwrap_or_default(),
                })
            })
            .map_err(store_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(store_err)
    }
}

impl MarketDataPort for SqliteAdapter {
    fn append_price(
        &self,
        asset: &str,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), CoinstratError> {
        let conn = self.conn.lock().expect("connection lock poisoned");
        conn.execute(
            "INSERT INTO prices (asset, price, ts) VALUES (?1, ?2, ?3)",
            params![asset, price, timestamp.timestamp()],
        )
        .map_err(store_err)?;
        Ok(())
    }

    fn recent_prices(&self, asset: &str, count: usize) -> Result<Vec<PriceSample>, CoinstratError> {
        let conn = self.conn.lock().expect("connection lock poisoned");
        let mut stmt = conn
            .prepare(
                "SELECT price, ts FROM prices WHERE asset = ?1
                 ORDER BY ts DESC, id DESC LIMIT ?2",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![asset, count as i64], |row| {
                let price: f64 = row.get(0)?;
                let secs: i64 = row.get(1)?;
                Ok((price, secs))
            })
            .map_err(store_err)?;

        let mut samples = Vec::new();
        for row in rows {
            let (price, secs) = row.map_err(store_err)?;
            let timestamp =
                Utc.timestamp_opt(secs, 0)
                    .single()
                    .ok_or_else(|| CoinstratError::Store {
                        reason: format!("timestamp out of range: {}", secs),
                    })?;
            samples.push(PriceSample::new(asset, price, timestamp));
        }
        // Query returns newest first; callers want chronological order.
        samples.reverse();
        Ok(samples)
    }
}

impl TradeStorePort for SqliteAdapter {
    fn append_transaction(&self, transaction: &Transaction) -> Result<(), CoinstratError> {
        let conn = self.conn.lock().expect("connection lock poisoned");
        conn.execute(
            "INSERT INTO transactions
             (side, asset, quantity, price, fee, realized_gain_loss, ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                transaction.side.as_str(),
                transaction.asset,
                transaction.quantity,
                transaction.price,
                transaction.fee,
                transaction.realized_gain_loss,
                transaction.timestamp.timestamp(),
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    fn last_dca_time(&self, asset: &str) -> Result<Option<DateTime<Utc>>, CoinstratError> {
        let conn = self.conn.lock().expect("connection lock poisoned");
        let secs: Option<i64> = conn
            .query_row(
                "SELECT last_ts FROM dca_state WHERE asset = ?1",
                params![asset],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_err)?;
        match secs {
            None => Ok(None),
            Some(secs) => Utc
                .timestamp_opt(secs, 0)
                .single()
                .map(Some)
                .ok_or_else(|| CoinstratError::Store {
                    reason: format!("timestamp out of range: {}", secs),
                }),
        }
    }

    fn set_last_dca_time(&self, asset: &str, at: DateTime<Utc>) -> Result<(), CoinstratError> {
        let conn = self.conn.lock().expect("connection lock poisoned");
        conn.execute(
            "INSERT INTO dca_state (asset, last_ts) VALUES (?1, ?2)
             ON CONFLICT(asset) DO UPDATE SET last_ts = excluded.last_ts",
            params![asset, at.timestamp()],
        )
        .map_err(store_err)?;
        Ok(())
    }

    fn trailing_stop_level(&self, asset: &str) -> Result<Option<f64>, CoinstratError> {
        let conn = self.conn.lock().expect("connection lock poisoned");
        conn.query_row(
            "SELECT level FROM trailing_stops WHERE asset = ?1",
            params![asset],
            |row| row.get(0),
        )
        .optional()
        .map_err(store_err)
    }

    fn set_trailing_stop_level(&self, asset: &str, level: f64) -> Result<(), CoinstratError> {
        let conn = self.conn.lock().expect("connection lock poisoned");
        conn.execute(
            "INSERT INTO trailing_stops (asset, level) VALUES (?1, ?2)
             ON CONFLICT(asset) DO UPDATE SET level = excluded.level",
            params![asset, level],
        )
        .map_err(store_err)?;
        Ok(())
    }

    fn clear_trailing_stop(&self, asset: &str) -> Result<(), CoinstratError> {
        let conn = self.conn.lock().expect("connection lock poisoned");
        conn.execute(
            "DELETE FROM trailing_stops WHERE asset = ?1",
            params![asset],
        )
        .map_err(store_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn prices_round_trip_in_order() {
        let store = SqliteAdapter::open_in_memory().unwrap();
        store.append_price("BTC", 102.0, ts(120)).unwrap();
        store.append_price("BTC", 100.0, ts(0)).unwrap();
        store.append_price("BTC", 101.0, ts(60)).unwrap();
        store.append_price("ETH", 10.0, ts(0)).unwrap();

        let samples = store.recent_prices("BTC", 10).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].price, 100.0);
        assert_eq!(samples[2].price, 102.0);

        let limited = store.recent_prices("BTC", 2).unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].price, 101.0);
    }

    #[test]
    fn transactions_round_trip() {
        let store = SqliteAdapter::open_in_memory().unwrap();
        let tx = Transaction {
            side: TradeSide::Sell,
            asset: "BTC".to_string(),
            quantity: 2.0,
            price: 150.0,
            fee: 0.3,
            realized_gain_loss: Some(100.0),
            timestamp: ts(60),
        };
        store.append_transaction(&tx).unwrap();

        let stored = store.transactions().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].side, TradeSide::Sell);
        assert_eq!(stored[0].realized_gain_loss, Some(100.0));
        assert_eq!(stored[0].timestamp, ts(60));
    }

    #[test]
    fn dca_state_upserts() {
        let store = SqliteAdapter::open_in_memory().unwrap();
        assert_eq!(store.last_dca_time("BTC").unwrap(), None);
        store.set_last_dca_time("BTC", ts(100)).unwrap();
        store.set_last_dca_time("BTC", ts(200)).unwrap();
        assert_eq!(store.last_dca_time("BTC").unwrap(), Some(ts(200)));
    }

    #[test]
    fn trailing_stop_upserts_and_clears() {
        let store = SqliteAdapter::open_in_memory().unwrap();
        store.set_trailing_stop_level("BTC", 95.0).unwrap();
        store.set_trailing_stop_level("BTC", 97.0).unwrap();
        assert_eq!(store.trailing_stop_level("BTC").unwrap(), Some(97.0));
        store.clear_trailing_stop("BTC").unwrap();
        assert_eq!(store.trailing_stop_level("BTC").unwrap(), None);
    }
}
