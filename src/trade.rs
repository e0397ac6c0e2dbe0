// =============================================================================
// Trade Model — read-only view of a position owned by the execution runtime
// =============================================================================
//
// The routing engine never mutates a trade.  Handlers read the filled orders
// and the price/fee fields to compute profit figures; the routers only read
// `is_short` and `enter_tag`.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::tags::parse_trade_tags;
use crate::types::{OrderSide, TradeDirection};

/// A single filled order of a trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilledOrder {
    pub side: OrderSide,
    /// Average fill price.
    pub average: f64,
    /// Filled base amount.
    pub filled: f64,
}

impl FilledOrder {
    pub fn new(side: OrderSide, average: f64, filled: f64) -> Self {
        Self {
            side,
            average,
            filled,
        }
    }

    /// Quote value of the fill, fees excluded.
    pub fn cost(&self) -> f64 {
        self.average * self.filled
    }
}

/// An open position as supplied by the runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub pair: String,
    pub is_short: bool,
    /// Whitespace separated entry tags, assigned once at entry.
    #[serde(default)]
    pub enter_tag: Option<String>,
    pub open_rate: f64,
    /// Highest rate seen while the trade was open.
    pub max_rate: f64,
    /// Lowest rate seen while the trade was open.
    pub min_rate: f64,
    /// Current open base amount.
    pub amount: f64,
    #[serde(default)]
    pub stake_amount: f64,
    #[serde(default)]
    pub fee_open: f64,
    #[serde(default)]
    pub fee_close: f64,
    #[serde(default)]
    pub orders: Vec<FilledOrder>,
}

/// Aggregate profit of a trade across all of its fills.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ProfitSnapshot {
    /// Absolute profit in quote currency.
    pub stake: f64,
    /// Profit relative to the total entry stake.
    pub total_ratio: f64,
    /// Profit relative to the value of the currently open amount.
    pub current_stake_ratio: f64,
    /// Profit relative to the cost of the first entry.
    pub init_ratio: f64,
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() > f64::EPSILON {
        numerator / denominator
    } else {
        0.0
    }
}

impl Trade {
    pub fn direction(&self) -> TradeDirection {
        TradeDirection::from_is_short(self.is_short)
    }

    pub fn entry_side(&self) -> OrderSide {
        if self.is_short {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        }
    }

    pub fn exit_side(&self) -> OrderSide {
        self.entry_side().opposite()
    }

    /// Filled orders of `side`, in fill order.
    pub fn select_filled_orders(&self, side: OrderSide) -> Vec<FilledOrder> {
        self.orders
            .iter()
            .filter(|o| o.side == side && o.filled > 0.0)
            .cloned()
            .collect()
    }

    /// Parsed entry tags.
    pub fn enter_tags(&self) -> Vec<String> {
        parse_trade_tags(self.enter_tag.as_deref())
    }

    /// Profit across every fill plus the open remainder valued at `exit_rate`.
    pub fn calc_total_profit(
        &self,
        filled_entries: &[FilledOrder],
        filled_exits: &[FilledOrder],
        exit_rate: f64,
    ) -> ProfitSnapshot {
        let entry_fee = if self.is_short { -self.fee_open } else { self.fee_open };
        let exit_fee = if self.is_short { -self.fee_close } else { self.fee_close };

        let total_stake: f64 = filled_entries
            .iter()
            .map(|o| o.cost() * (1.0 + entry_fee))
            .sum();
        let exited: f64 = filled_exits
            .iter()
            .map(|o| o.cost() * (1.0 - exit_fee))
            .sum();
        let current_stake = self.amount * exit_rate * (1.0 - exit_fee);

        // Shorts earn when the buy-back is cheaper than the entry.
        let profit = if self.is_short {
            total_stake - exited - current_stake
        } else {
            exited + current_stake - total_stake
        };

        let init_cost = filled_entries.first().map(FilledOrder::cost).unwrap_or(0.0);

        ProfitSnapshot {
            stake: profit,
            total_ratio: ratio(profit, total_stake),
            current_stake_ratio: ratio(profit, current_stake),
            init_ratio: ratio(profit, init_cost),
        }
    }

    /// Best profit ratio reached while the trade was open.
    pub fn max_profit(&self) -> f64 {
        if self.is_short {
            ratio(self.open_rate - self.min_rate, self.min_rate)
        } else {
            ratio(self.max_rate - self.open_rate, self.open_rate)
        }
    }

    /// Worst loss ratio reached while the trade was open.
    pub fn max_loss(&self) -> f64 {
        if self.is_short {
            ratio(self.max_rate - self.open_rate, self.open_rate)
        } else {
            ratio(self.open_rate - self.min_rate, self.min_rate)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::trade;
    use super::*;

    #[test]
    fn sides_follow_direction() {
        let long = trade(false, "1");
        assert_eq!(long.entry_side(), OrderSide::Buy);
        assert_eq!(long.exit_side(), OrderSide::Sell);
        let short = trade(true, "501");
        assert_eq!(short.entry_side(), OrderSide::Sell);
        assert_eq!(short.exit_side(), OrderSide::Buy);
    }

    #[test]
    fn select_filled_orders_filters_side_and_unfilled() {
        let mut t = trade(false, "1");
        t.orders.push(FilledOrder::new(OrderSide::Buy, 95.0, 0.0));
        t.orders.push(FilledOrder::new(OrderSide::Sell, 105.0, 0.5));
        assert_eq!(t.select_filled_orders(OrderSide::Buy).len(), 1);
        assert_eq!(t.select_filled_orders(OrderSide::Sell).len(), 1);
    }

    #[test]
    fn long_profit_includes_fees() {
        let t = trade(false, "1");
        let entries = t.select_filled_orders(OrderSide::Buy);
        let p = t.calc_total_profit(&entries, &[], 110.0);
        // 110 * 0.999 - 100 * 1.001
        assert!((p.stake - 9.79).abs() < 1e-9);
        assert!((p.total_ratio - 9.79 / 100.1).abs() < 1e-9);
        assert!((p.init_ratio - 0.0979).abs() < 1e-9);
    }

    #[test]
    fn short_profit_when_price_falls() {
        let t = trade(true, "501");
        let entries = t.select_filled_orders(OrderSide::Sell);
        let p = t.calc_total_profit(&entries, &[], 90.0);
        // 100 * 0.999 - 90 * 1.001
        assert!((p.stake - 9.81).abs() < 1e-9);
        assert!(p.init_ratio > 0.0);
    }

    #[test]
    fn no_entries_yields_zero_ratios() {
        let t = trade(false, "1");
        let p = t.calc_total_profit(&[], &[], 100.0);
        assert_eq!(p.total_ratio, 0.0);
        assert_eq!(p.init_ratio, 0.0);
    }

    #[test]
    fn excursions_are_direction_aware() {
        let long = trade(false, "1");
        assert!((long.max_profit() - 0.10).abs() < 1e-9);
        assert!((long.max_loss() - 10.0 / 90.0).abs() < 1e-9);
        let short = trade(true, "501");
        assert!((short.max_profit() - 10.0 / 90.0).abs() < 1e-9);
        assert!((short.max_loss() - 0.10).abs() < 1e-9);
    }

    #[test]
    fn missing_enter_tag_parses_empty() {
        let mut t = trade(false, "");
        t.enter_tag = None;
        assert!(t.enter_tags().is_empty());
    }
}
