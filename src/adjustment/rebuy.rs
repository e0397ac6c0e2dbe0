// =============================================================================
// Long Rebuy — add to a long position after a drawdown
// =============================================================================
//
// With `n` filled entries the n-th rebuy level applies: when both the trade
// and its latest entry are below `thresholds[n-1]`, buy `stakes[n-1]` times
// the first entry's cost.  Once every level is used the handler stays quiet.
// =============================================================================

use tracing::info;

use super::{clamp_stake, slice_profit, AdjustmentContext, AdjustmentHandler, AdjustmentOrder};
use crate::runtime_config::RebuyParams;
use crate::trade::Trade;
use crate::types::TradeDirection;

pub const REBUY_ORDER_TAG: &str = "r";

pub struct RebuyHandler {
    params: RebuyParams,
}

impl RebuyHandler {
    pub fn new(params: RebuyParams) -> Self {
        Self { params }
    }
}

impl AdjustmentHandler for RebuyHandler {
    fn adjust(
        &self,
        trade: &Trade,
        _enter_tags: &[String],
        ctx: &AdjustmentContext,
    ) -> Option<AdjustmentOrder> {
        let entries = trade.select_filled_orders(trade.entry_side());
        let first = entries.first()?;
        let last = entries.last()?;

        let level = entries.len() - 1;
        let stake_multiplier = *self.params.stakes.get(level)?;
        let threshold = *self.params.thresholds.get(level)?;

        let last_entry_profit = slice_profit(TradeDirection::Long, last.average, ctx.current_rate);
        if last_entry_profit >= threshold || ctx.current_profit >= threshold {
            return None;
        }

        let stake = clamp_stake(first.cost() * stake_multiplier, ctx.min_stake, ctx.max_stake)?;

        info!(
            pair = %trade.pair,
            level = level + 1,
            stake,
            rate = ctx.current_rate,
            profit = ctx.current_profit,
            "rebuy"
        );

        Some(AdjustmentOrder::increase(stake, REBUY_ORDER_TAG))
    }
}
