//! Configuration validation and construction.
//!
//! Every field is checked before anything runs; bad values surface as
//! `ConfigInvalid` with the section and key spelled out.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::CoinstratError;
use crate::domain::indicator::{DEFAULT_BOLLINGER_MULTIPLIER, DEFAULT_RSI_PERIODS};
use crate::domain::ledger::{LedgerLimits, DEFAULT_BUY_FRACTION};
use crate::domain::strategy::{SellPolicy, StrategyConfig};
use crate::ports::config_port::ConfigPort;

fn invalid(section: &str, key: &str, reason: &str) -> CoinstratError {
    CoinstratError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_portfolio_config(config: &dyn ConfigPort) -> Result<(), CoinstratError> {
    let balance = config.get_double("portfolio", "initial_balance", 0.0);
    if balance <= 0.0 {
        return Err(invalid(
            "portfolio",
            "initial_balance",
            "initial_balance must be positive",
        ));
    }

    let cap = config.get_double("portfolio", "max_investment_per_asset", f64::INFINITY);
    if cap <= 0.0 {
        return Err(invalid(
            "portfolio",
            "max_investment_per_asset",
            "max_investment_per_asset must be positive",
        ));
    }

    let fee = config.get_double("portfolio", "fee_pct", 0.0);
    if !(0.0..100.0).contains(&fee) {
        return Err(invalid(
            "portfolio",
            "fee_pct",
            "fee_pct must be in [0, 100)",
        ));
    }

    let fraction = config.get_double("portfolio", "buy_fraction", DEFAULT_BUY_FRACTION);
    if !(0.0..=1.0).contains(&fraction) || fraction == 0.0 {
        return Err(invalid(
            "portfolio",
            "buy_fraction",
            "buy_fraction must be in (0, 1]",
        ));
    }

    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), CoinstratError> {
    let periods = config.get_int("strategy", "periods", 20);
    if periods < 2 {
        return Err(invalid("strategy", "periods", "periods must be at least 2"));
    }

    let rsi_periods = config.get_int("strategy", "rsi_periods", DEFAULT_RSI_PERIODS as i64);
    if rsi_periods < 1 {
        return Err(invalid(
            "strategy",
            "rsi_periods",
            "rsi_periods must be positive",
        ));
    }

    let stop_loss = config.get_double("strategy", "stop_loss", -0.05);
    if stop_loss >= 0.0 {
        return Err(invalid(
            "strategy",
            "stop_loss",
            "stop_loss must be negative",
        ));
    }

    let profit_taking = config.get_double("strategy", "profit_taking", 0.10);
    if profit_taking <= 0.0 {
        return Err(invalid(
            "strategy",
            "profit_taking",
            "profit_taking must be positive",
        ));
    }

    let trailing = config.get_double("strategy", "trailing_stop_pct", 0.05);
    if !(0.0..1.0).contains(&trailing) {
        return Err(invalid(
            "strategy",
            "trailing_stop_pct",
            "trailing_stop_pct must be in [0, 1)",
        ));
    }

    let dca_amount = config.get_double("strategy", "dca_amount", 0.0);
    if dca_amount < 0.0 {
        return Err(invalid(
            "strategy",
            "dca_amount",
            "dca_amount must be non-negative",
        ));
    }

    let dca_interval = config.get_int("strategy", "dca_interval_secs", 86_400);
    if dca_interval <= 0 {
        return Err(invalid(
            "strategy",
            "dca_interval_secs",
            "dca_interval_secs must be positive",
        ));
    }

    if let Some(policy) = config.get_string("strategy", "sell_policy") {
        if SellPolicy::parse(&policy).is_none() {
            return Err(invalid(
                "strategy",
                "sell_policy",
                "sell_policy must be 'always' or 'confident_loss_only'",
            ));
        }
    }

    if config.get_bool("strategy", "check_timeframe", false) {
        let timeframe = config.get_int("strategy", "timeframe_secs", 0);
        if timeframe <= 0 {
            return Err(invalid(
                "strategy",
                "timeframe_secs",
                "timeframe_secs must be positive when check_timeframe is set",
            ));
        }
        let buffer = config.get_int("strategy", "timeframe_buffer_secs", 0);
        if buffer < 0 {
            return Err(invalid(
                "strategy",
                "timeframe_buffer_secs",
                "timeframe_buffer_secs must be non-negative",
            ));
        }
    }

    Ok(())
}

pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<(), CoinstratError> {
    match config.get_string("engine", "assets") {
        Some(assets) if !parse_assets(&assets).is_empty() => {}
        _ => {
            return Err(CoinstratError::ConfigMissing {
                section: "engine".to_string(),
                key: "assets".to_string(),
            })
        }
    }

    let interval = config.get_int("engine", "tick_interval_secs", 60);
    if interval <= 0 {
        return Err(invalid(
            "engine",
            "tick_interval_secs",
            "tick_interval_secs must be positive",
        ));
    }

    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), CoinstratError> {
    let balance = config.get_double("backtest", "initial_balance", 10_000.0);
    if balance <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_balance",
            "initial_balance must be positive",
        ));
    }

    let periods = config.get_int("backtest", "periods", 20);
    if periods < 2 {
        return Err(invalid("backtest", "periods", "periods must be at least 2"));
    }

    Ok(())
}

/// Comma-separated asset list, trimmed, empties dropped.
pub fn parse_assets(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn build_ledger_limits(config: &dyn ConfigPort) -> LedgerLimits {
    LedgerLimits {
        max_investment_per_asset: config.get_double(
            "portfolio",
            "max_investment_per_asset",
            f64::INFINITY,
        ),
        fee_pct: config.get_double("portfolio", "fee_pct", 0.0),
        buy_fraction: config.get_double("portfolio", "buy_fraction", DEFAULT_BUY_FRACTION),
    }
}

pub fn build_strategy_config(config: &dyn ConfigPort) -> StrategyConfig {
    let defaults = StrategyConfig::default();
    let sell_policy = config
        .get_string("strategy", "sell_policy")
        .and_then(|s| SellPolicy::parse(&s))
        .unwrap_or_default();

    StrategyConfig {
        periods: config.get_int("strategy", "periods", defaults.periods as i64) as usize,
        rsi_periods: config.get_int("strategy", "rsi_periods", defaults.rsi_periods as i64)
            as usize,
        bollinger_multiplier: config.get_double(
            "strategy",
            "bollinger_multiplier",
            DEFAULT_BOLLINGER_MULTIPLIER,
        ),
        stop_loss: config.get_double("strategy", "stop_loss", defaults.stop_loss),
        profit_taking: config.get_double("strategy", "profit_taking", defaults.profit_taking),
        trailing_stop_pct: config.get_double(
            "strategy",
            "trailing_stop_pct",
            defaults.trailing_stop_pct,
        ),
        dca_interval_secs: config.get_int(
            "strategy",
            "dca_interval_secs",
            defaults.dca_interval_secs,
        ),
        dca_amount: config.get_double("strategy", "dca_amount", defaults.dca_amount),
        sell_policy,
        fee_estimate: config.get_double("strategy", "fee_estimate", defaults.fee_estimate),
        check_timeframe: config.get_bool("strategy", "check_timeframe", false),
        timeframe_secs: config.get_int("strategy", "timeframe_secs", 0),
        timeframe_buffer_secs: config.get_int("strategy", "timeframe_buffer_secs", 0),
    }
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> BacktestConfig {
    let defaults = BacktestConfig::default();
    BacktestConfig {
        initial_balance: config.get_double(
            "backtest",
            "initial_balance",
            defaults.initial_balance,
        ),
        periods: config.get_int("backtest", "periods", defaults.periods as i64) as usize,
        rsi_periods: config.get_int("backtest", "rsi_periods", defaults.rsi_periods as i64)
            as usize,
        bollinger_multiplier: config.get_double(
            "backtest",
            "bollinger_multiplier",
            defaults.bollinger_multiplier,
        ),
        fee_pct: config.get_double("backtest", "fee_pct", defaults.fee_pct),
    }
}
