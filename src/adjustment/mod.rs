// =============================================================================
// Position Adjustment Module
// =============================================================================
//
// Routes every adjustment tick of an open trade to exactly one of three
// handlers (long rebuy, long grind, short grind) and ships their default
// implementations.

pub mod grind;
pub mod rebuy;
pub mod router;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::runtime_config::RuntimeConfig;
use crate::trade::Trade;
use crate::types::TradeDirection;

pub use grind::GrindHandler;
pub use rebuy::RebuyHandler;
pub use router::{select_adjustment_route, PositionAdjustmentRouter};

/// The adjustment handler a trade is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AdjustmentRoute {
    LongRebuy,
    LongGrind,
    ShortGrind,
}

impl std::fmt::Display for AdjustmentRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LongRebuy => write!(f, "long_rebuy_adjust_trade_position"),
            Self::LongGrind => write!(f, "long_grind_adjust_trade_position"),
            Self::ShortGrind => write!(f, "short_grind_adjust_trade_position"),
        }
    }
}

/// Market and profit figures supplied by the runtime on an adjustment tick.
/// Forwarded to the selected handler untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdjustmentContext {
    pub current_time: Option<DateTime<Utc>>,
    pub current_rate: f64,
    pub current_profit: f64,
    pub min_stake: Option<f64>,
    pub max_stake: f64,
    pub current_entry_rate: f64,
    pub current_exit_rate: f64,
    pub current_entry_profit: f64,
    pub current_exit_profit: f64,
}

/// Order requested by an adjustment handler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustmentOrder {
    /// Positive adds to the position, negative reduces it.
    pub stake_amount: f64,
    pub order_tag: Option<String>,
}

impl AdjustmentOrder {
    pub fn increase(stake: f64, tag: impl Into<String>) -> Self {
        Self {
            stake_amount: stake.abs(),
            order_tag: Some(tag.into()),
        }
    }

    pub fn reduce(stake: f64, tag: impl Into<String>) -> Self {
        Self {
            stake_amount: -stake.abs(),
            order_tag: Some(tag.into()),
        }
    }
}

pub trait AdjustmentHandler: Send + Sync {
    fn adjust(
        &self,
        trade: &Trade,
        enter_tags: &[String],
        ctx: &AdjustmentContext,
    ) -> Option<AdjustmentOrder>;
}

/// The three adjustment handlers, injected into the router.
#[derive(Clone)]
pub struct AdjustmentHandlers {
    pub long_rebuy: Arc<dyn AdjustmentHandler>,
    pub long_grind: Arc<dyn AdjustmentHandler>,
    pub short_grind: Arc<dyn AdjustmentHandler>,
}

impl AdjustmentHandlers {
    /// Default rebuy/grind handlers configured from `config`.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            long_rebuy: Arc::new(RebuyHandler::new(config.rebuy.clone())),
            long_grind: Arc::new(GrindHandler::new(TradeDirection::Long, config.grind.clone())),
            short_grind: Arc::new(GrindHandler::new(TradeDirection::Short, config.grind.clone())),
        }
    }

    pub fn get(&self, route: AdjustmentRoute) -> &Arc<dyn AdjustmentHandler> {
        match route {
            AdjustmentRoute::LongRebuy => &self.long_rebuy,
            AdjustmentRoute::LongGrind => &self.long_grind,
            AdjustmentRoute::ShortGrind => &self.short_grind,
        }
    }
}

/// Raise `amount` to 1.5x the minimum stake and cap it at `max_stake`.
/// `None` when no valid stake remains.
pub(crate) fn clamp_stake(amount: f64, min_stake: Option<f64>, max_stake: f64) -> Option<f64> {
    let mut amount = amount;
    if let Some(min) = min_stake {
        amount = amount.max(min * 1.5);
    }
    let amount = amount.min(max_stake);
    if amount <= 0.0 || min_stake.is_some_and(|min| amount < min) {
        return None;
    }
    Some(amount)
}

/// Profit of a single fill at `rate`, from the position's point of view.
pub(crate) fn slice_profit(direction: TradeDirection, fill_price: f64, rate: f64) -> f64 {
    if fill_price <= 0.0 {
        return 0.0;
    }
    match direction {
        TradeDirection::Long => (rate - fill_price) / fill_price,
        TradeDirection::Short => (fill_price - rate) / fill_price,
    }
}
