//! Strategy parameters and policy toggles.

use crate::domain::indicator::{DEFAULT_BOLLINGER_MULTIPLIER, DEFAULT_RSI_PERIODS};

/// Confidence a signal-based exit needs before it may realize a loss under
/// [`SellPolicy::ConfidentLossOnly`].
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 90.0;

/// What the signal-based exit does when the position is under water.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SellPolicy {
    /// Sell unconditionally whenever the exit signal fires.
    #[default]
    Always,
    /// Suppress selling at a loss unless signal confidence reaches
    /// [`HIGH_CONFIDENCE_THRESHOLD`].
    ConfidentLossOnly,
}

impl SellPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "always" => Some(SellPolicy::Always),
            "confident_loss_only" | "confident-loss-only" => Some(SellPolicy::ConfidentLossOnly),
            _ => None,
        }
    }
}

/// Tunable strategy parameters, one instance per engine.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    /// Window length for SMA/EMA/Bollinger/ATR/volatility and the data gate.
    pub periods: usize,
    pub rsi_periods: usize,
    pub bollinger_multiplier: f64,
    /// Loss ratio at which the position is dumped, e.g. -0.05. Adjusted by
    /// volatility before comparison.
    pub stop_loss: f64,
    /// Gain ratio at which profits are taken, e.g. 0.10. Volatility-adjusted.
    pub profit_taking: f64,
    /// Trailing stop distance as a fraction of price, e.g. 0.05.
    pub trailing_stop_pct: f64,
    /// Seconds between dollar-cost-average purchases.
    pub dca_interval_secs: i64,
    /// Fiat amount per dollar-cost-average purchase.
    pub dca_amount: f64,
    pub sell_policy: SellPolicy,
    /// Estimated flat fee subtracted when computing the P&L ratio.
    pub fee_estimate: f64,
    /// When true, ticks whose sample span falls outside
    /// `timeframe_secs ± timeframe_buffer_secs` are skipped.
    pub check_timeframe: bool,
    pub timeframe_secs: i64,
    pub timeframe_buffer_secs: i64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            periods: 20,
            rsi_periods: DEFAULT_RSI_PERIODS,
            bollinger_multiplier: DEFAULT_BOLLINGER_MULTIPLIER,
            stop_loss: -0.05,
            profit_taking: 0.10,
            trailing_stop_pct: 0.05,
            dca_interval_secs: 24 * 60 * 60,
            dca_amount: 0.0,
            sell_policy: SellPolicy::Always,
            fee_estimate: 0.0,
            check_timeframe: false,
            timeframe_secs: 0,
            timeframe_buffer_secs: 0,
        }
    }
}

impl StrategyConfig {
    /// Stop-loss threshold widened by current volatility.
    pub fn adjusted_stop_loss(&self, volatility: f64) -> f64 {
        self.stop_loss * (1.0 + volatility)
    }

    /// Profit-taking threshold widened by current volatility.
    pub fn adjusted_profit_taking(&self, volatility: f64) -> f64 {
        self.profit_taking * (1.0 + volatility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sell_policy_parse() {
        assert_eq!(SellPolicy::parse("always"), Some(SellPolicy::Always));
        assert_eq!(
            SellPolicy::parse("confident_loss_only"),
            Some(SellPolicy::ConfidentLossOnly)
        );
        assert_eq!(
            SellPolicy::parse("Confident-Loss-Only"),
            Some(SellPolicy::ConfidentLossOnly)
        );
        assert_eq!(SellPolicy::parse("never"), None);
    }

    #[test]
    fn volatility_widens_thresholds() {
        let config = StrategyConfig::default();
        assert_relative_eq!(config.adjusted_stop_loss(0.0), -0.05);
        assert_relative_eq!(config.adjusted_stop_loss(0.2), -0.06);
        assert_relative_eq!(config.adjusted_profit_taking(0.2), 0.12);
    }
}
