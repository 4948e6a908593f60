//! Moving Average Convergence Divergence with an internal period optimizer.
//!
//! Rather than using fixed 12/26/9 periods, every call searches the grid
//! short ∈ [5,15], long ∈ [20,30], signal ∈ [5,15] for the triple that
//! maximizes a toy crossover P&L over the given prices: enter when the MACD
//! line crosses above its signal line, exit on the cross-under, sum
//! `exit - entry` over all round trips. The search order is fixed (short
//! ascending, then long, then signal) and ties keep the first-found maximum,
//! so results are reproducible run to run.
//!
//! The grid is evaluated as a concurrent reduction: rayon maps each cell to
//! a local `(score, index)` candidate and a final reduction picks the global
//! maximum, preferring the smaller grid index on equal scores. That is
//! bit-identical to a sequential strictly-greater scan without any shared
//! lock.

use rayon::prelude::*;

use super::ema::ema_series;
use crate::domain::error::CoinstratError;

pub const SHORT_PERIOD_RANGE: std::ops::RangeInclusive<usize> = 5..=15;
pub const LONG_PERIOD_RANGE: std::ops::RangeInclusive<usize> = 20..=30;
pub const SIGNAL_PERIOD_RANGE: std::ops::RangeInclusive<usize> = 5..=15;

/// MACD reading produced with the optimizer's best periods.
///
/// `value` is the gap between the last MACD line point and the last signal
/// line point; positive means short-term momentum is above its own average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdOutput {
    pub value: f64,
    pub short: usize,
    pub long: usize,
    pub signal: usize,
}

/// Compute MACD over `prices` with optimized periods.
///
/// Fails with `InvalidInput` on an empty sequence (EMA seeding needs at
/// least one price).
pub fn macd(prices: &[f64]) -> Result<MacdOutput, CoinstratError> {
    let (short, long, signal) = optimize_periods(prices)?;
    let value = macd_value(prices, short, long, signal)?;
    Ok(MacdOutput {
        value,
        short,
        long,
        signal,
    })
}

/// Last MACD-line minus last signal-line value for fixed periods.
pub fn macd_value(
    prices: &[f64],
    short: usize,
    long: usize,
    signal: usize,
) -> Result<f64, CoinstratError> {
    let (macd_line, signal_line) = macd_lines(prices, short, long, signal)?;
    let last_macd = *macd_line.last().expect("macd line mirrors input length");
    let last_signal = *signal_line.last().expect("signal line mirrors input length");
    Ok(last_macd - last_signal)
}

/// Full MACD and signal line series. Both have one point per input price
/// because the EMAs are seeded with the first value.
fn macd_lines(
    prices: &[f64],
    short: usize,
    long: usize,
    signal: usize,
) -> Result<(Vec<f64>, Vec<f64>), CoinstratError> {
    let short_ema = ema_series(prices, short)?;
    let long_ema = ema_series(prices, long)?;
    let macd_line: Vec<f64> = short_ema
        .iter()
        .zip(long_ema.iter())
        .map(|(s, l)| s - l)
        .collect();
    let signal_line = ema_series(&macd_line, signal)?;
    Ok((macd_line, signal_line))
}

/// Search the period grid for the best-scoring `(short, long, signal)`.
pub fn optimize_periods(prices: &[f64]) -> Result<(usize, usize, usize), CoinstratError> {
    if prices.is_empty() {
        return Err(CoinstratError::InvalidInput {
            reason: "macd requires a non-empty price sequence".into(),
        });
    }

    let mut grid = Vec::new();
    for short in SHORT_PERIOD_RANGE {
        for long in LONG_PERIOD_RANGE {
            if short >= long {
                continue;
            }
            for signal in SIGNAL_PERIOD_RANGE {
                grid.push((short, long, signal));
            }
        }
    }

    let best = grid
        .par_iter()
        .enumerate()
        .map(|(index, &(short, long, signal))| {
            let score = crossover_pnl(prices, short, long, signal);
            (score, index)
        })
        .reduce(
            || (f64::NEG_INFINITY, usize::MAX),
            |a, b| {
                // Higher score wins; on a tie the earlier grid cell wins,
                // matching the sequential first-found-maximum rule.
                if b.0 > a.0 || (b.0 == a.0 && b.1 < a.1) {
                    b
                } else {
                    a
                }
            },
        );

    let (_, index) = best;
    Ok(grid[index])
}

/// Toy backtest metric: long-only MACD/signal crossover P&L.
fn crossover_pnl(prices: &[f64], short: usize, long: usize, signal: usize) -> f64 {
    let Ok((macd_line, signal_line)) = macd_lines(prices, short, long, signal) else {
        return f64::NEG_INFINITY;
    };

    let mut pnl = 0.0;
    let mut entry: Option<f64> = None;
    for i in 0..prices.len() {
        let above = macd_line[i] > signal_line[i];
        match entry {
            None if above => entry = Some(prices[i]),
            Some(entry_price) if !above => {
                pnl += prices[i] - entry_price;
                entry = None;
            }
            _ => {}
        }
    }
    pnl
}
