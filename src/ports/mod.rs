//! Port traits for external collaborators.

pub mod config_port;
pub mod market_data_port;
pub mod predictor_port;
pub mod trade_store_port;

pub use config_port::ConfigPort;
pub use market_data_port::MarketDataPort;
pub use predictor_port::PricePredictorPort;
pub use trade_store_port::TradeStorePort;
