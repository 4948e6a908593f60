//! Backtest simulator.
//!
//! Replays one asset's historical samples chronologically through the same
//! indicator set as live operation, but with a reduced decision rule: only
//! the signal-based entry and exit conditions, no trailing stop, DCA, or
//! volatility-adjusted layering. Trades go against an isolated ledger, so a
//! backtest can never touch live portfolio state. Single-threaded and
//! deterministic.

use std::collections::HashMap;

use crate::domain::indicator::{
    atr, bollinger_bands, ema, macd, rsi, sma, DEFAULT_BOLLINGER_MULTIPLIER,
    DEFAULT_RSI_PERIODS,
};
use crate::domain::ledger::{LedgerLimits, PortfolioLedger, TradeOutcome};
use crate::domain::price::PriceSample;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_balance: f64,
    /// Sliding window length; also the indicator period.
    pub periods: usize,
    pub rsi_periods: usize,
    pub bollinger_multiplier: f64,
    pub fee_pct: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_balance: 10_000.0,
            periods: 20,
            rsi_periods: DEFAULT_RSI_PERIODS,
            bollinger_multiplier: DEFAULT_BOLLINGER_MULTIPLIER,
            fee_pct: 0.0,
        }
    }
}

/// Aggregate performance of one backtest run.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub asset: String,
    pub initial_balance: f64,
    /// Cash plus any open position marked to the final price.
    pub final_balance: f64,
    pub total_return_pct: f64,
    pub total_realized_gain_loss: f64,
    pub transactions: usize,
}

/// Replay `samples` (chronological ascending) for `asset`.
///
/// Fewer samples than the window length means zero evaluation steps; the
/// result then reports the untouched starting balance.
pub fn run_backtest(
    asset: &str,
    samples: &[PriceSample],
    config: &BacktestConfig,
) -> BacktestResult {
    let limits = LedgerLimits {
        fee_pct: config.fee_pct,
        ..LedgerLimits::default()
    };
    let mut ledger = PortfolioLedger::new(config.initial_balance, limits);
    let mut realized_total = 0.0;
    let mut transactions = 0usize;

    if config.periods > 0 && samples.len() >= config.periods {
        for end in config.periods..=samples.len() {
            let window = &samples[end - config.periods..end];
            let step = evaluate_window(asset, window, config, &mut ledger);
            realized_total += step.realized;
            transactions += step.transactions;
        }
    }

    let mut final_prices = HashMap::new();
    if let Some(last) = samples.last() {
        final_prices.insert(asset.to_string(), last.price);
    }
    let final_balance = ledger.total_value(&final_prices);
    let total_return_pct = if config.initial_balance > 0.0 {
        (final_balance - config.initial_balance) / config.initial_balance * 100.0
    } else {
        0.0
    };

    BacktestResult {
        asset: asset.to_string(),
        initial_balance: config.initial_balance,
        final_balance,
        total_return_pct,
        total_realized_gain_loss: realized_total,
        transactions,
    }
}

struct StepOutcome {
    realized: f64,
    transactions: usize,
}

fn evaluate_window(
    asset: &str,
    window: &[PriceSample],
    config: &BacktestConfig,
    ledger: &mut PortfolioLedger,
) -> StepOutcome {
    let mut outcome = StepOutcome {
        realized: 0.0,
        transactions: 0,
    };

    let prices: Vec<f64> = window.iter().map(|s| s.price).collect();
    let last = window.last().expect("window is never empty");
    let price = last.price;

    let sma_value = sma(&prices, config.periods);
    let Ok(ema_value) = ema(&prices, config.periods) else {
        return outcome;
    };
    let Ok(macd_output) = macd(&prices) else {
        return outcome;
    };
    let rsi_value = rsi(&prices, config.rsi_periods);
    let (upper, _, lower) =
        bollinger_bands(&prices, config.periods, config.bollinger_multiplier);
    let atr_value = atr(&prices, &prices, &prices, config.periods);

    let oversold = rsi_value < 30.0
        && price < sma_value
        && price < ema_value
        && macd_output.value < 0.0
        && price < lower
        && atr_value > 0.0;
    if oversold {
        if let TradeOutcome::Executed(_) = ledger.buy(asset, None, price, last.timestamp) {
            outcome.transactions += 1;
        }
    }

    let overbought = ledger.quantity_held(asset) > 0.0
        && rsi_value > 70.0
        && price > sma_value
        && price > ema_value
        && macd_output.value > 0.0
        && price > upper
        && atr_value > 0.0;
    if overbought {
        if let TradeOutcome::Executed(fill) = ledger.sell(asset, price, last.timestamp) {
            outcome.realized += fill
                .transaction
                .realized_gain_loss
                .expect("sell fills carry realized P&L");
            outcome.transactions += 1;
        }
    }

    StepOutcome {
        realized: outcome.realized,
        transactions: outcome.transactions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_600_000_000 + secs, 0).unwrap()
    }

    fn series(prices: &[f64]) -> Vec<PriceSample> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| PriceSample::new("BTC", p, ts(i as i64 * 3600)))
            .collect()
    }

    fn small_config() -> BacktestConfig {
        BacktestConfig {
            periods: 10,
            rsi_periods: 5,
            ..BacktestConfig::default()
        }
    }

    #[test]
    fn short_series_leaves_balance_untouched() {
        let samples = series(&[100.0, 101.0, 102.0]);
        let result = run_backtest("BTC", &samples, &small_config());
        assert_relative_eq!(result.final_balance, 10_000.0);
        assert_eq!(result.transactions, 0);
        assert_relative_eq!(result.total_return_pct, 0.0);
    }

    #[test]
    fn flat_series_never_trades() {
        let samples = series(&[100.0; 50]);
        let result = run_backtest("BTC", &samples, &small_config());
        assert_eq!(result.transactions, 0);
        assert_relative_eq!(result.total_realized_gain_loss, 0.0);
    }

    #[test]
    fn crash_and_spike_completes_round_trip() {
        // Flat, crash to an oversold extreme, recover flat, spike to an
        // overbought extreme: one buy at 50, one sell at 160.
        let mut prices = vec![100.0; 9];
        prices.push(50.0);
        prices.extend(vec![100.0; 9]);
        prices.push(160.0);
        let samples = series(&prices);

        let result = run_backtest("BTC", &samples, &small_config());

        assert_eq!(result.transactions, 2);
        // 10% of 10000 at price 50 -> 20 units; sold at 160.
        assert_relative_eq!(result.total_realized_gain_loss, 20.0 * 110.0);
        assert_relative_eq!(result.final_balance, 12_200.0);
        assert_relative_eq!(result.total_return_pct, 22.0);
        assert_relative_eq!(result.initial_balance, 10_000.0);
    }

    #[test]
    fn open_position_marked_to_market() {
        // Crash triggers a buy; no overbought extreme follows, so the
        // position stays open and the final value marks it at the last price.
        let mut prices = vec![100.0; 9];
        prices.push(50.0);
        prices.extend(vec![60.0; 5]);
        let samples = series(&prices);

        let result = run_backtest("BTC", &samples, &small_config());

        assert_eq!(result.transactions, 1);
        assert_relative_eq!(result.total_realized_gain_loss, 0.0);
        // Bought 20 units at 50 (cost 1000); marked at 60 -> 1200.
        assert_relative_eq!(result.final_balance, 9_000.0 + 1_200.0);
    }

    #[test]
    fn backtest_is_deterministic() {
        let mut prices = vec![100.0; 9];
        prices.push(50.0);
        prices.extend(vec![100.0; 9]);
        prices.push(160.0);
        let samples = series(&prices);

        let first = run_backtest("BTC", &samples, &small_config());
        let second = run_backtest("BTC", &samples, &small_config());
        assert_eq!(first, second);
    }
}
