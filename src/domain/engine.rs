//! Strategy decision engine.
//!
//! One evaluation tick walks every tracked asset through a fixed policy
//! chain: data gates, stop-loss/profit-taking, trailing stop, dollar-cost
//! averaging, then signal-based entry and exit. Rules run independently;
//! several may act in the same tick, and a sell simply leaves zero holdings
//! for the rules after it. The tick's output is a [`CycleReport`] of
//! structured per-asset results for whatever presentation layer cares.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::domain::indicator::{
    atr, bollinger_bands, ema, macd, price_change_percent, rsi, sma, volatility,
    IndicatorSnapshot,
};
use crate::domain::ledger::{PortfolioLedger, TradeOutcome};
use crate::domain::price::PriceSample;
use crate::domain::strategy::{SellPolicy, StrategyConfig, HIGH_CONFIDENCE_THRESHOLD};
use crate::ports::{MarketDataPort, PricePredictorPort, TradeStorePort};

/// Why decision logic was skipped for an asset this tick.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoPrices,
    InsufficientData { have: usize, need: usize },
    TimeframeOutOfRange {
        spanned_secs: i64,
        expected_secs: i64,
        buffer_secs: i64,
    },
}

/// Which rule in the chain produced an action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionTrigger {
    StopLoss { pnl_ratio: f64, threshold: f64 },
    ProfitTaking { pnl_ratio: f64, threshold: f64 },
    TrailingStop { level: f64 },
    DollarCostAverage,
    EntrySignal { confidence: f64 },
    ExitSignal { confidence: f64 },
}

/// One rule firing and what the ledger did with it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRecord {
    pub trigger: ActionTrigger,
    pub outcome: TradeOutcome,
}

/// Everything that happened for one asset in one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetReport {
    pub asset: String,
    pub snapshot: Option<IndicatorSnapshot>,
    pub skip: Option<SkipReason>,
    pub actions: Vec<ActionRecord>,
    pub predicted_price: Option<f64>,
    /// Informational notes: predictor failures, store write problems,
    /// suppressed exits. Never load-bearing.
    pub notes: Vec<String>,
}

impl AssetReport {
    fn new(asset: &str) -> Self {
        Self {
            asset: asset.to_string(),
            snapshot: None,
            skip: None,
            actions: Vec::new(),
            predicted_price: None,
            notes: Vec::new(),
        }
    }
}

/// One full pass over all tracked assets.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub assets: Vec<AssetReport>,
}

pub struct StrategyDecisionEngine {
    assets: Vec<String>,
    config: StrategyConfig,
    ledger: Arc<Mutex<PortfolioLedger>>,
    market: Arc<dyn MarketDataPort>,
    store: Arc<dyn TradeStorePort>,
    predictor: Option<Arc<dyn PricePredictorPort>>,
}

impl StrategyDecisionEngine {
    pub fn new(
        assets: Vec<String>,
        config: StrategyConfig,
        ledger: Arc<Mutex<PortfolioLedger>>,
        market: Arc<dyn MarketDataPort>,
        store: Arc<dyn TradeStorePort>,
    ) -> Self {
        Self {
            assets,
            config,
            ledger,
            market,
            store,
            predictor: None,
        }
    }

    pub fn with_predictor(mut self, predictor: Arc<dyn PricePredictorPort>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn ledger(&self) -> Arc<Mutex<PortfolioLedger>> {
        Arc::clone(&self.ledger)
    }

    /// Evaluate all assets now.
    pub fn run_cycle(&self) -> CycleReport {
        self.run_cycle_at(Utc::now())
    }

    /// Evaluate all assets as of `now`. Separated from [`run_cycle`] so tests
    /// and replays control the clock.
    ///
    /// [`run_cycle`]: StrategyDecisionEngine::run_cycle
    pub fn run_cycle_at(&self, now: DateTime<Utc>) -> CycleReport {
        debug!(assets = self.assets.len(), "evaluation tick");
        let assets = self
            .assets
            .iter()
            .map(|asset| self.evaluate_asset(asset, now))
            .collect();
        CycleReport {
            started_at: now,
            assets,
        }
    }

    fn evaluate_asset(&self, asset: &str, now: DateTime<Utc>) -> AssetReport {
        let mut report = AssetReport::new(asset);

        let samples = match self.market.recent_prices(asset, self.config.periods) {
            Ok(samples) => samples,
            Err(err) => {
                warn!(asset, error = %err, "price fetch failed");
                report.notes.push(format!("price fetch failed: {err}"));
                report.skip = Some(SkipReason::NoPrices);
                return report;
            }
        };

        if samples.is_empty() {
            report.skip = Some(SkipReason::NoPrices);
            return report;
        }

        // Indicators are reported whenever any data exists, even when the
        // gates below skip the decision logic.
        let snapshot = self.build_snapshot(&samples);
        let price = snapshot.price;
        let vol = snapshot.volatility;
        report.snapshot = Some(snapshot);

        let need = self.config.periods.max(2);
        if samples.len() < need {
            report.skip = Some(SkipReason::InsufficientData {
                have: samples.len(),
                need,
            });
            debug!(asset, have = samples.len(), need, "insufficient data, skipping");
            self.run_predictor(&mut report);
            return report;
        }

        if self.config.check_timeframe {
            let spanned = (samples[samples.len() - 1].timestamp - samples[0].timestamp)
                .num_seconds();
            let expected = self.config.timeframe_secs;
            let buffer = self.config.timeframe_buffer_secs;
            if spanned < expected - buffer || spanned > expected + buffer {
                report.skip = Some(SkipReason::TimeframeOutOfRange {
                    spanned_secs: spanned,
                    expected_secs: expected,
                    buffer_secs: buffer,
                });
                debug!(asset, spanned, expected, "timeframe out of range, skipping");
                self.run_predictor(&mut report);
                return report;
            }
        }

        // Single lock for the whole chain: the rules read and mutate
        // balance, holdings and cost basis as one unit.
        {
            let mut ledger = self.ledger.lock().expect("ledger lock poisoned");

            self.check_stop_loss(&mut ledger, asset, price, vol, now, &mut report);
            self.check_trailing_stop(&mut ledger, asset, price, now, &mut report);
            self.check_dca(&mut ledger, asset, price, now, &mut report);
            self.check_entry_signal(&mut ledger, asset, price, now, &mut report);
            self.check_exit_signal(&mut ledger, asset, price, now, &mut report);
        }

        self.run_predictor(&mut report);
        report
    }

    fn build_snapshot(&self, samples: &[PriceSample]) -> IndicatorSnapshot {
        let prices: Vec<f64> = samples.iter().map(|s| s.price).collect();
        let periods = self.config.periods;
        let price = *prices.last().expect("samples are non-empty");

        // EMA and MACD only fail on empty input, which cannot happen here.
        let ema_value = ema(&prices, periods).unwrap_or(price);
        let macd_output = macd(&prices).ok();
        let (upper, middle, lower) =
            bollinger_bands(&prices, periods, self.config.bollinger_multiplier);

        let mut newest_first = prices.clone();
        newest_first.reverse();

        IndicatorSnapshot {
            price,
            sma: sma(&prices, periods),
            ema: ema_value,
            rsi: rsi(&prices, self.config.rsi_periods),
            macd_value: macd_output.map(|m| m.value).unwrap_or(0.0),
            macd_short: macd_output.map(|m| m.short).unwrap_or(0),
            macd_long: macd_output.map(|m| m.long).unwrap_or(0),
            macd_signal: macd_output.map(|m| m.signal).unwrap_or(0),
            bollinger_upper: upper,
            bollinger_middle: middle,
            bollinger_lower: lower,
            atr: atr(&prices, &prices, &prices, periods),
            volatility: volatility(&prices, periods),
            price_change_pct: price_change_percent(&newest_first),
        }
    }

    /// Stop-loss and profit-taking on the open position, thresholds widened
    /// by current volatility.
    fn check_stop_loss(
        &self,
        ledger: &mut PortfolioLedger,
        asset: &str,
        price: f64,
        vol: f64,
        now: DateTime<Utc>,
        report: &mut AssetReport,
    ) {
        let quantity = ledger.quantity_held(asset);
        let invested = ledger.invested(asset);
        if quantity <= 0.0 || invested <= 0.0 {
            return;
        }

        let current_value = quantity * price;
        let pnl_ratio = (current_value - invested - self.config.fee_estimate) / invested;
        let stop = self.config.adjusted_stop_loss(vol);
        let take = self.config.adjusted_profit_taking(vol);

        let trigger = if pnl_ratio <= stop {
            Some(ActionTrigger::StopLoss {
                pnl_ratio,
                threshold: stop,
            })
        } else if pnl_ratio >= take {
            Some(ActionTrigger::ProfitTaking {
                pnl_ratio,
                threshold: take,
            })
        } else {
            None
        };

        if let Some(trigger) = trigger {
            let outcome = ledger.sell(asset, price, now);
            info!(asset, pnl_ratio, ?trigger, "risk exit");
            self.record_action(asset, trigger, outcome, report);
            self.reset_trailing_stop(asset, report);
        }
    }

    /// Trailing stop ratchet: the stored level only ever rises while the
    /// position is held, and a touch from above closes it.
    fn check_trailing_stop(
        &self,
        ledger: &mut PortfolioLedger,
        asset: &str,
        price: f64,
        now: DateTime<Utc>,
        report: &mut AssetReport,
    ) {
        if ledger.quantity_held(asset) <= 0.0 {
            return;
        }

        let stored = match self.store.trailing_stop_level(asset) {
            Ok(level) => level,
            Err(err) => {
                report.notes.push(format!("trailing stop read failed: {err}"));
                return;
            }
        };

        let candidate = price * (1.0 - self.config.trailing_stop_pct);
        let level = match stored {
            None => {
                self.persist_trailing_level(asset, candidate, report);
                candidate
            }
            Some(level) if candidate > level => {
                self.persist_trailing_level(asset, candidate, report);
                candidate
            }
            Some(level) => level,
        };

        if price <= level {
            let outcome = ledger.sell(asset, price, now);
            info!(asset, level, price, "trailing stop hit");
            self.record_action(asset, ActionTrigger::TrailingStop { level }, outcome, report);
            self.reset_trailing_stop(asset, report);
        }
    }

    /// Dollar-cost averaging: a fixed fiat purchase once per interval.
    fn check_dca(
        &self,
        ledger: &mut PortfolioLedger,
        asset: &str,
        price: f64,
        now: DateTime<Utc>,
        report: &mut AssetReport,
    ) {
        if self.config.dca_amount <= 0.0 {
            return;
        }

        let last = match self.store.last_dca_time(asset) {
            Ok(last) => last,
            Err(err) => {
                report.notes.push(format!("dca state read failed: {err}"));
                return;
            }
        };

        let due = match last {
            None => true,
            Some(last) => (now - last).num_seconds() >= self.config.dca_interval_secs,
        };
        if !due {
            return;
        }

        let quantity = self.config.dca_amount / price;
        let outcome = ledger.buy(asset, Some(quantity), price, now);
        if outcome.is_executed() {
            if let Err(err) = self.store.set_last_dca_time(asset, now) {
                warn!(asset, error = %err, "dca state write failed");
                report.notes.push(format!("dca state write failed: {err}"));
            }
            info!(asset, quantity, price, "dca purchase");
        }
        self.record_action(asset, ActionTrigger::DollarCostAverage, outcome, report);
    }

    /// Oversold entry: every condition must hold at once.
    fn check_entry_signal(
        &self,
        ledger: &mut PortfolioLedger,
        asset: &str,
        price: f64,
        now: DateTime<Utc>,
        report: &mut AssetReport,
    ) {
        let Some(snapshot) = &report.snapshot else {
            return;
        };

        let oversold = snapshot.rsi < 30.0
            && price < snapshot.sma
            && price < snapshot.ema
            && snapshot.macd_value < 0.0
            && price < snapshot.bollinger_lower
            && snapshot.atr > 0.0;
        if !oversold {
            return;
        }

        let confidence = (30.0 - snapshot.rsi) / 30.0 * 100.0;
        let outcome = ledger.buy(asset, None, price, now);
        info!(asset, confidence, price, "entry signal");
        self.record_action(asset, ActionTrigger::EntrySignal { confidence }, outcome, report);
    }

    /// Overbought exit, subject to the configured sell policy.
    fn check_exit_signal(
        &self,
        ledger: &mut PortfolioLedger,
        asset: &str,
        price: f64,
        now: DateTime<Utc>,
        report: &mut AssetReport,
    ) {
        let quantity = ledger.quantity_held(asset);
        if quantity <= 0.0 {
            return;
        }
        let Some(snapshot) = &report.snapshot else {
            return;
        };

        let overbought = snapshot.rsi > 70.0
            && price > snapshot.sma
            && price > snapshot.ema
            && snapshot.macd_value > 0.0
            && price > snapshot.bollinger_upper
            && snapshot.atr > 0.0;
        if !overbought {
            return;
        }

        let confidence = (snapshot.rsi - 70.0) / 30.0 * 100.0;

        if self.config.sell_policy == SellPolicy::ConfidentLossOnly {
            let basis = ledger.cost_basis(asset);
            let at_loss = basis.total_quantity > 0.0 && price < basis.average_cost();
            if at_loss && confidence < HIGH_CONFIDENCE_THRESHOLD {
                report.notes.push(format!(
                    "exit signal suppressed at a loss (confidence {confidence:.1})"
                ));
                return;
            }
        }

        let outcome = ledger.sell(asset, price, now);
        info!(asset, confidence, price, "exit signal");
        self.record_action(asset, ActionTrigger::ExitSignal { confidence }, outcome, report);
        self.reset_trailing_stop(asset, report);
    }

    fn run_predictor(&self, report: &mut AssetReport) {
        let Some(predictor) = &self.predictor else {
            return;
        };
        let Some(snapshot) = &report.snapshot else {
            return;
        };

        // Non-finite readings abort the prediction path outright.
        let result = snapshot
            .validate_finite()
            .and_then(|()| predictor.predict_price(snapshot));
        match result {
            Ok(predicted) => report.predicted_price = Some(predicted),
            Err(err) => {
                debug!(asset = %report.asset, error = %err, "prediction unavailable");
                report.notes.push(format!("prediction unavailable: {err}"));
            }
        }
    }

    fn record_action(
        &self,
        asset: &str,
        trigger: ActionTrigger,
        outcome: TradeOutcome,
        report: &mut AssetReport,
    ) {
        if let TradeOutcome::Executed(fill) = &outcome {
            if let Err(err) = self.store.append_transaction(&fill.transaction) {
                warn!(asset, error = %err, "transaction append failed");
                report.notes.push(format!("transaction append failed: {err}"));
            }
        }
        report.actions.push(ActionRecord { trigger, outcome });
    }

    fn reset_trailing_stop(&self, asset: &str, report: &mut AssetReport) {
        if let Err(err) = self.store.clear_trailing_stop(asset) {
            report.notes.push(format!("trailing stop clear failed: {err}"));
        }
    }

    fn persist_trailing_level(&self, asset: &str, level: f64, report: &mut AssetReport) {
        if let Err(err) = self.store.set_trailing_stop_level(asset, level) {
            warn!(asset, error = %err, "trailing stop write failed");
            report.notes.push(format!("trailing stop write failed: {err}"));
        }
    }
}
