// =============================================================================
// Position Adjustment Router
// =============================================================================
//
// Selection, in priority order:
//   1. Short trade                        -> short grind, whatever the tags.
//   2. Long with no tags, or with a rebuy
//      tag and only rebuy/grind/unknown
//      tags besides it                    -> long rebuy.
//   3. Any other long trade               -> long grind.
//
// Tag order never matters; rebuy beats grind.
// =============================================================================

use tracing::debug;

use super::{AdjustmentContext, AdjustmentHandlers, AdjustmentOrder, AdjustmentRoute};
use crate::tags::{classify, TagCategory};
use crate::trade::Trade;
use crate::types::TradeDirection;

pub fn select_adjustment_route(direction: TradeDirection, tags: &[String]) -> AdjustmentRoute {
    if direction == TradeDirection::Short {
        return AdjustmentRoute::ShortGrind;
    }

    let categories: Vec<TagCategory> = tags.iter().map(|t| classify(t)).collect();
    let has_rebuy = categories.contains(&TagCategory::Rebuy);
    let rebuy_compatible = categories.iter().all(|c| c.counts_as_rebuy_or_grind());

    if categories.is_empty() || (has_rebuy && rebuy_compatible) {
        AdjustmentRoute::LongRebuy
    } else {
        AdjustmentRoute::LongGrind
    }
}

pub struct PositionAdjustmentRouter {
    handlers: AdjustmentHandlers,
}

impl PositionAdjustmentRouter {
    pub fn new(handlers: AdjustmentHandlers) -> Self {
        Self { handlers }
    }

    /// Dispatch one adjustment tick to the selected handler.
    pub fn route(
        &self,
        trade: &Trade,
        ctx: &AdjustmentContext,
    ) -> (AdjustmentRoute, Option<AdjustmentOrder>) {
        let enter_tags = trade.enter_tags();
        let route = select_adjustment_route(trade.direction(), &enter_tags);
        let order = self.handlers.get(route).adjust(trade, &enter_tags, ctx);

        debug!(
            pair = %trade.pair,
            route = %route,
            tags = ?enter_tags,
            order = ?order,
            "adjustment routed"
        );

        (route, order)
    }
}
