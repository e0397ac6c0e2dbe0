// =============================================================================
// Grind — scale into a losing position, then sell the scale-ins back
// =============================================================================
//
// Grind entries stack on top of the initial entry and are closed last in,
// first out: every filled exit is taken to close the most recent open grind.
//
//   - The newest open grind is up more than `profit_threshold`
//       -> sell it back at the current rate (tag "gx").
//   - The newest open entry is down more than `threshold` and fewer than
//     `max_grinds` grinds are open
//       -> buy `stake` times the first entry's cost (tag "g1").
// =============================================================================

use tracing::info;

use super::{clamp_stake, slice_profit, AdjustmentContext, AdjustmentHandler, AdjustmentOrder};
use crate::runtime_config::GrindParams;
use crate::trade::Trade;
use crate::types::TradeDirection;

pub const GRIND_ENTRY_TAG: &str = "g1";
pub const GRIND_EXIT_TAG: &str = "gx";

pub struct GrindHandler {
    direction: TradeDirection,
    params: GrindParams,
}

impl GrindHandler {
    pub fn new(direction: TradeDirection, params: GrindParams) -> Self {
        Self { direction, params }
    }
}

impl AdjustmentHandler for GrindHandler {
    fn adjust(
        &self,
        trade: &Trade,
        _enter_tags: &[String],
        ctx: &AdjustmentContext,
    ) -> Option<AdjustmentOrder> {
        let entries = trade.select_filled_orders(trade.entry_side());
        let exits = trade.select_filled_orders(trade.exit_side());
        let first = entries.first()?;

        let open_grinds = (entries.len() - 1).saturating_sub(exits.len());
        let newest_open = &entries[open_grinds];
        let newest_profit = slice_profit(self.direction, newest_open.average, ctx.current_rate);

        if open_grinds > 0 && newest_profit > self.params.profit_threshold {
            let stake = newest_open.filled * ctx.current_rate;
            info!(
                pair = %trade.pair,
                direction = %self.direction,
                open_grinds,
                stake,
                profit = newest_profit,
                "grind exit"
            );
            return Some(AdjustmentOrder::reduce(stake, GRIND_EXIT_TAG));
        }

        if open_grinds < self.params.max_grinds && newest_profit < self.params.threshold {
            let stake =
                clamp_stake(first.cost() * self.params.stake, ctx.min_stake, ctx.max_stake)?;
            info!(
                pair = %trade.pair,
                direction = %self.direction,
                open_grinds,
                stake,
                profit = newest_profit,
                "grind entry"
            );
            return Some(AdjustmentOrder::increase(stake, GRIND_ENTRY_TAG));
        }

        None
    }
}
