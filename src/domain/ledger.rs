//! Portfolio ledger: cash balance, holdings, weighted-average cost basis.
//!
//! The ledger is the single place portfolio state mutates. The decision
//! engine and backtester call [`PortfolioLedger::buy`] / [`PortfolioLedger::sell`]
//! and never touch the fields directly. Refused or empty operations come back
//! as structured [`TradeOutcome`] values, not errors, so callers can report
//! them without string parsing.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::transaction::{TradeSide, Transaction};

/// Fraction of the balance a default-sized buy commits.
pub const DEFAULT_BUY_FRACTION: f64 = 0.10;

/// Aggregate cost basis for one asset. Average entry price is
/// `total_cost / total_quantity`; `total_quantity == 0` implies
/// `total_cost == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CostBasis {
    pub total_quantity: f64,
    pub total_cost: f64,
}

impl CostBasis {
    pub fn average_cost(&self) -> f64 {
        assert!(
            self.total_quantity > 0.0,
            "average_cost on empty cost basis"
        );
        self.total_cost / self.total_quantity
    }
}

/// Limits and fees applied by the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerLimits {
    /// Per-asset cap on cumulative buy cost. Buys that would push past it
    /// are refused whole; there are no partial fills.
    pub max_investment_per_asset: f64,
    /// Flat percentage fee on trade value, both sides.
    pub fee_pct: f64,
    /// Balance fraction used when a buy quantity is not given.
    pub buy_fraction: f64,
}

impl Default for LedgerLimits {
    fn default() -> Self {
        Self {
            max_investment_per_asset: f64::INFINITY,
            fee_pct: 0.0,
            buy_fraction: DEFAULT_BUY_FRACTION,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefusalReason {
    InsufficientBalance { required: f64, available: f64 },
    ExposureCapExceeded { invested: f64, cost: f64, cap: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    NoHoldings,
}

/// A filled trade plus the balance it left behind.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeFill {
    pub transaction: Transaction,
    pub balance_after: f64,
}

/// Outcome of a buy or sell request.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeOutcome {
    Executed(TradeFill),
    Refused(RefusalReason),
    NoOp(NoOpReason),
}

impl TradeOutcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, TradeOutcome::Executed(_))
    }
}

#[derive(Debug, Clone)]
pub struct PortfolioLedger {
    balance: f64,
    holdings: HashMap<String, f64>,
    cost_basis: HashMap<String, CostBasis>,
    initial_investment: HashMap<String, f64>,
    limits: LedgerLimits,
}

impl PortfolioLedger {
    pub fn new(starting_balance: f64, limits: LedgerLimits) -> Self {
        Self {
            balance: starting_balance,
            holdings: HashMap::new(),
            cost_basis: HashMap::new(),
            initial_investment: HashMap::new(),
            limits,
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn quantity_held(&self, asset: &str) -> f64 {
        self.holdings.get(asset).copied().unwrap_or(0.0)
    }

    pub fn cost_basis(&self, asset: &str) -> CostBasis {
        self.cost_basis.get(asset).copied().unwrap_or_default()
    }

    /// Cumulative buy cost for the open position; caps exposure and anchors
    /// the P&L ratio in the decision engine.
    pub fn invested(&self, asset: &str) -> f64 {
        self.initial_investment.get(asset).copied().unwrap_or(0.0)
    }

    pub fn limits(&self) -> &LedgerLimits {
        &self.limits
    }

    /// Cash plus holdings marked to the given prices. Assets without a price
    /// are valued at zero.
    pub fn total_value(&self, prices: &HashMap<String, f64>) -> f64 {
        let position_value: f64 = self
            .holdings
            .iter()
            .filter_map(|(asset, qty)| prices.get(asset).map(|price| qty * price))
            .sum();
        self.balance + position_value
    }

    /// Buy `quantity` of `asset` at `price`. With `quantity == None` the
    /// ledger sizes the order at `buy_fraction` of the balance.
    pub fn buy(
        &mut self,
        asset: &str,
        quantity: Option<f64>,
        price: f64,
        now: DateTime<Utc>,
    ) -> TradeOutcome {
        let quantity =
            quantity.unwrap_or_else(|| self.balance * self.limits.buy_fraction / price);
        let cost = quantity * price;
        let fee = cost * self.limits.fee_pct / 100.0;

        let invested = self.invested(asset);
        if invested + cost > self.limits.max_investment_per_asset {
            return TradeOutcome::Refused(RefusalReason::ExposureCapExceeded {
                invested,
                cost,
                cap: self.limits.max_investment_per_asset,
            });
        }

        if self.balance < cost + fee {
            return TradeOutcome::Refused(RefusalReason::InsufficientBalance {
                required: cost + fee,
                available: self.balance,
            });
        }

        self.balance -= cost + fee;
        *self.holdings.entry(asset.to_string()).or_insert(0.0) += quantity;
        let basis = self.cost_basis.entry(asset.to_string()).or_default();
        basis.total_quantity += quantity;
        basis.total_cost += cost;
        *self
            .initial_investment
            .entry(asset.to_string())
            .or_insert(0.0) += cost;

        TradeOutcome::Executed(TradeFill {
            transaction: Transaction {
                side: TradeSide::Buy,
                asset: asset.to_string(),
                quantity,
                price,
                fee,
                realized_gain_loss: None,
                timestamp: now,
            },
            balance_after: self.balance,
        })
    }

    /// Sell the entire held quantity of `asset` at `price`. Partial sells
    /// are not supported.
    pub fn sell(&mut self, asset: &str, price: f64, now: DateTime<Utc>) -> TradeOutcome {
        let quantity = self.quantity_held(asset);
        if quantity == 0.0 {
            return TradeOutcome::NoOp(NoOpReason::NoHoldings);
        }

        let basis = self.cost_basis(asset);
        assert!(
            basis.total_quantity > 0.0,
            "held quantity without cost basis for {asset}"
        );
        let avg_cost = basis.average_cost();

        let proceeds = quantity * price;
        let fee = proceeds * self.limits.fee_pct / 100.0;
        let realized = proceeds - avg_cost * quantity;

        self.balance += proceeds - fee;
        self.holdings.remove(asset);
        // Whole-position sell: the aggregates drain to exactly zero rather
        // than carrying float residue.
        self.cost_basis.remove(asset);
        self.initial_investment.remove(asset);

        TradeOutcome::Executed(TradeFill {
            transaction: Transaction {
                side: TradeSide::Sell,
                asset: asset.to_string(),
                quantity,
                price,
                fee,
                realized_gain_loss: Some(realized),
                timestamp: now,
            },
            balance_after: self.balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn ledger(balance: f64) -> PortfolioLedger {
        PortfolioLedger::new(balance, LedgerLimits::default())
    }

    #[test]
    fn buy_debits_balance_and_credits_holdings() {
        let mut ledger = ledger(10_000.0);
        let outcome = ledger.buy("BTC", Some(10.0), 100.0, now());

        assert!(outcome.is_executed());
        assert_relative_eq!(ledger.balance(), 9_000.0);
        assert_relative_eq!(ledger.quantity_held("BTC"), 10.0);
        let basis = ledger.cost_basis("BTC");
        assert_relative_eq!(basis.total_quantity, 10.0);
        assert_relative_eq!(basis.total_cost, 1_000.0);
        assert_relative_eq!(ledger.invested("BTC"), 1_000.0);
    }

    #[test]
    fn default_sized_buy_uses_ten_percent() {
        let mut ledger = ledger(10_000.0);
        let outcome = ledger.buy("BTC", None, 100.0, now());

        let TradeOutcome::Executed(fill) = outcome else {
            panic!("expected executed buy");
        };
        assert_relative_eq!(fill.transaction.quantity, 10.0);
        assert_relative_eq!(ledger.balance(), 9_000.0);
    }

    #[test]
    fn insufficient_balance_refused_without_mutation() {
        let mut ledger = ledger(500.0);
        let outcome = ledger.buy("BTC", Some(10.0), 100.0, now());

        assert!(matches!(
            outcome,
            TradeOutcome::Refused(RefusalReason::InsufficientBalance { .. })
        ));
        assert_relative_eq!(ledger.balance(), 500.0);
        assert_eq!(ledger.quantity_held("BTC"), 0.0);
    }

    #[test]
    fn exposure_cap_refused_without_mutation() {
        let limits = LedgerLimits {
            max_investment_per_asset: 1_500.0,
            ..LedgerLimits::default()
        };
        let mut ledger = PortfolioLedger::new(10_000.0, limits);

        assert!(ledger.buy("BTC", Some(10.0), 100.0, now()).is_executed());
        let outcome = ledger.buy("BTC", Some(10.0), 100.0, now());

        assert!(matches!(
            outcome,
            TradeOutcome::Refused(RefusalReason::ExposureCapExceeded { .. })
        ));
        assert_relative_eq!(ledger.balance(), 9_000.0);
        assert_relative_eq!(ledger.quantity_held("BTC"), 10.0);
    }

    #[test]
    fn sell_whole_position_realizes_gain() {
        let mut ledger = ledger(10_000.0);
        ledger.buy("BTC", Some(10.0), 100.0, now());

        let outcome = ledger.sell("BTC", 150.0, now());
        let TradeOutcome::Executed(fill) = outcome else {
            panic!("expected executed sell");
        };

        assert_relative_eq!(fill.transaction.realized_gain_loss.unwrap(), 500.0);
        assert_relative_eq!(ledger.balance(), 10_500.0);
        assert_eq!(ledger.quantity_held("BTC"), 0.0);
        assert_eq!(ledger.cost_basis("BTC"), CostBasis::default());
        assert_eq!(ledger.invested("BTC"), 0.0);
    }

    #[test]
    fn sell_without_holdings_is_noop() {
        let mut ledger = ledger(1_000.0);
        let outcome = ledger.sell("BTC", 100.0, now());
        assert_eq!(outcome, TradeOutcome::NoOp(NoOpReason::NoHoldings));
        assert_relative_eq!(ledger.balance(), 1_000.0);
    }

    #[test]
    fn round_trip_at_same_price_is_neutral() {
        let mut ledger = ledger(10_000.0);
        ledger.buy("ETH", Some(5.0), 200.0, now());
        let outcome = ledger.sell("ETH", 200.0, now());

        let TradeOutcome::Executed(fill) = outcome else {
            panic!("expected executed sell");
        };
        assert_relative_eq!(fill.transaction.realized_gain_loss.unwrap(), 0.0);
        assert_relative_eq!(ledger.balance(), 10_000.0);
    }

    #[test]
    fn weighted_average_cost_across_buys() {
        let mut ledger = ledger(100_000.0);
        ledger.buy("BTC", Some(10.0), 100.0, now());
        ledger.buy("BTC", Some(10.0), 200.0, now());

        let basis = ledger.cost_basis("BTC");
        assert_relative_eq!(basis.average_cost(), 150.0);

        let outcome = ledger.sell("BTC", 150.0, now());
        let TradeOutcome::Executed(fill) = outcome else {
            panic!("expected executed sell");
        };
        assert_relative_eq!(fill.transaction.realized_gain_loss.unwrap(), 0.0);
    }

    #[test]
    fn fee_applied_both_sides() {
        let limits = LedgerLimits {
            fee_pct: 1.0,
            ..LedgerLimits::default()
        };
        let mut ledger = PortfolioLedger::new(10_000.0, limits);

        ledger.buy("BTC", Some(10.0), 100.0, now());
        assert_relative_eq!(ledger.balance(), 10_000.0 - 1_000.0 - 10.0);

        let outcome = ledger.sell("BTC", 100.0, now());
        let TradeOutcome::Executed(fill) = outcome else {
            panic!("expected executed sell");
        };
        assert_relative_eq!(fill.transaction.fee, 10.0);
        // Realized P&L excludes fees; the balance carries them.
        assert_relative_eq!(fill.transaction.realized_gain_loss.unwrap(), 0.0);
        assert_relative_eq!(ledger.balance(), 10_000.0 - 20.0);
    }

    #[test]
    fn total_value_marks_to_market() {
        let mut ledger = ledger(10_000.0);
        ledger.buy("BTC", Some(10.0), 100.0, now());

        let mut prices = HashMap::new();
        prices.insert("BTC".to_string(), 120.0);
        assert_relative_eq!(ledger.total_value(&prices), 9_000.0 + 1_200.0);
    }
}
