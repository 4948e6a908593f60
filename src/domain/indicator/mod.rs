//! Technical indicators over price sequences.
//!
//! All functions are pure: an ordered `&[f64]` in, a scalar or tuple out.
//! Live data is frequently sparse at startup, so everything except EMA and
//! MACD degrades to a neutral value on short input instead of failing.
//! Sequences are chronological ascending unless a function says otherwise.

pub mod atr;
pub mod bollinger;
pub mod change;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod volatility;

pub use atr::atr;
pub use bollinger::bollinger_bands;
pub use change::price_change_percent;
pub use ema::{ema, ema_series};
pub use macd::{macd, MacdOutput};
pub use rsi::rsi;
pub use sma::sma;
pub use volatility::volatility;

use crate::domain::error::CoinstratError;

/// Default RSI lookback.
pub const DEFAULT_RSI_PERIODS: usize = 14;

/// Default Bollinger band width in standard deviations.
pub const DEFAULT_BOLLINGER_MULTIPLIER: f64 = 2.0;

/// Every indicator reading for one asset at one evaluation instant.
///
/// This is the structured value handed to reporting layers and to the
/// optional price predictor; it carries no formatted text.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub price: f64,
    pub sma: f64,
    pub ema: f64,
    pub rsi: f64,
    pub macd_value: f64,
    pub macd_short: usize,
    pub macd_long: usize,
    pub macd_signal: usize,
    pub bollinger_upper: f64,
    pub bollinger_middle: f64,
    pub bollinger_lower: f64,
    pub atr: f64,
    pub volatility: f64,
    pub price_change_pct: f64,
}

impl IndicatorSnapshot {
    /// Training/prediction pathways must never see NaN or infinity.
    pub fn validate_finite(&self) -> Result<(), CoinstratError> {
        let fields = [
            ("price", self.price),
            ("sma", self.sma),
            ("ema", self.ema),
            ("rsi", self.rsi),
            ("macd_value", self.macd_value),
            ("bollinger_upper", self.bollinger_upper),
            ("bollinger_middle", self.bollinger_middle),
            ("bollinger_lower", self.bollinger_lower),
            ("atr", self.atr),
            ("volatility", self.volatility),
            ("price_change_pct", self.price_change_pct),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(CoinstratError::NonFinite {
                    context: format!("indicator snapshot field {name}"),
                });
            }
        }
        Ok(())
    }
}
