//! CSV historical price adapter.
//!
//! One file per asset named `<ASSET>.csv`, columns `timestamp,price` with a
//! header row. Timestamps are Unix seconds. Rows come back sorted ascending
//! regardless of file order; backtests depend on that.

use crate::domain::error::CoinstratError;
use crate::domain::price::PriceSample;
use chrono::{TimeZone, Utc};
use std::fs;
use std::path::PathBuf;

pub struct CsvPriceAdapter {
    base_path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, asset: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", asset))
    }

    pub fn load_prices(&self, asset: &str) -> Result<Vec<PriceSample>, CoinstratError> {
        let path = self.csv_path(asset);
        let content = fs::read_to_string(&path).map_err(|e| CoinstratError::Store {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut samples = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| CoinstratError::Store {
                reason: format!("CSV parse error: {}", e),
            })?;

            let secs: i64 = record
                .get(0)
                .ok_or_else(|| CoinstratError::Store {
                    reason: "missing timestamp column".into(),
                })?
                .trim()
                .parse()
                .map_err(|e| CoinstratError::Store {
                    reason: format!("invalid timestamp value: {}", e),
                })?;
            let timestamp =
                Utc.timestamp_opt(secs, 0)
                    .single()
                    .ok_or_else(|| CoinstratError::Store {
                        reason: format!("timestamp out of range: {}", secs),
                    })?;

            let price: f64 = record
                .get(1)
                .ok_or_else(|| CoinstratError::Store {
                    reason: "missing price column".into(),
                })?
                .trim()
                .parse()
                .map_err(|e| CoinstratError::Store {
                    reason: format!("invalid price value: {}", e),
                })?;
            if !price.is_finite() || price <= 0.0 {
                return Err(CoinstratError::Store {
                    reason: format!("non-positive price: {}", price),
                });
            }

            samples.push(PriceSample::new(asset, price, timestamp));
        }

        samples.sort_by_key(|s| s.timestamp);
        Ok(samples)
    }

    /// Assets with a data file present, sorted.
    pub fn list_assets(&self) -> Result<Vec<String>, CoinstratError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| CoinstratError::Store {
            reason: format!("failed to read directory {}: {}", self.base_path.display(), e),
        })?;

        let mut assets = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CoinstratError::Store {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(asset) = name_str.strip_suffix(".csv") {
                assets.push(asset.to_string());
            }
        }

        assets.sort();
        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        // Rows deliberately out of order.
        let csv_content = "timestamp,price\n\
            1700000120,102.5\n\
            1700000000,100.0\n\
            1700000060,101.0\n";
        fs::write(path.join("BTC.csv"), csv_content).unwrap();
        fs::write(path.join("ETH.csv"), "timestamp,price\n").unwrap();

        (dir, path)
    }

    #[test]
    fn load_prices_sorts_ascending() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvPriceAdapter::new(path);

        let samples = adapter.load_prices("BTC").unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].price, 100.0);
        assert_eq!(samples[2].price, 102.5);
        assert!(samples[0].timestamp < samples[1].timestamp);
    }

    #[test]
    fn load_prices_errors_for_missing_file() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvPriceAdapter::new(path);
        assert!(adapter.load_prices("XYZ").is_err());
    }

    #[test]
    fn load_prices_rejects_bad_rows() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("BTC.csv"),
            "timestamp,price\n1700000000,not_a_price\n",
        )
        .unwrap();
        let adapter = CsvPriceAdapter::new(dir.path().to_path_buf());
        assert!(adapter.load_prices("BTC").is_err());
    }

    #[test]
    fn load_prices_rejects_non_positive_price() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("BTC.csv"),
            "timestamp,price\n1700000000,-5.0\n",
        )
        .unwrap();
        let adapter = CsvPriceAdapter::new(dir.path().to_path_buf());
        assert!(adapter.load_prices("BTC").is_err());
    }

    #[test]
    fn list_assets_returns_sorted_names() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvPriceAdapter::new(path);
        assert_eq!(adapter.list_assets().unwrap(), vec!["BTC", "ETH"]);
    }
}
