// =============================================================================
// Exit Router — one exit handler per evaluation
// =============================================================================
//
// Per call:
//   1. Fetch the analyzed candles for (pair, timeframe).  Failures propagate
//      and no handler runs.
//   2. Build the ExitContext (recent candles, fills, profit figures).
//   3. Pick the route of the first tag that names a direction-appropriate
//      exit mode, else the direction's normal exit.
//   4. Invoke that handler once and return its signal unchanged.
// =============================================================================

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{ExitContext, ExitHandlers, ExitRoute, ExitSignal, RouterError};
use crate::market_data::{Candle, DataProvider};
use crate::tags::classify;
use crate::trade::Trade;
use crate::types::TradeDirection;

/// Last candle plus the five before it.
pub const RECENT_CANDLES: usize = 6;

/// Choose the exit route for a trade of `direction` carrying `tags`.
pub fn select_exit_route(direction: TradeDirection, tags: &[String]) -> ExitRoute {
    tags.iter()
        .find_map(|tag| classify(tag).exit_route(direction))
        .unwrap_or_else(|| ExitRoute::fallback(direction))
}

pub struct ExitRouter {
    handlers: ExitHandlers,
    timeframe: String,
}

impl ExitRouter {
    pub fn new(handlers: ExitHandlers, timeframe: impl Into<String>) -> Self {
        Self {
            handlers,
            timeframe: timeframe.into(),
        }
    }

    pub fn timeframe(&self) -> &str {
        &self.timeframe
    }

    /// Evaluate the exit of `trade`, returning the route taken and the
    /// handler's signal.
    pub fn route(
        &self,
        provider: &dyn DataProvider,
        pair: &str,
        trade: &Trade,
        current_time: DateTime<Utc>,
        current_rate: f64,
        current_profit: f64,
    ) -> Result<(ExitRoute, ExitSignal), RouterError> {
        let candles = provider.analyzed_candles(pair, &self.timeframe)?;
        let recent = recent_window(pair, candles)?;

        let enter_tags = trade.enter_tags();
        let filled_entries = trade.select_filled_orders(trade.entry_side());
        let filled_exits = trade.select_filled_orders(trade.exit_side());
        let profit = trade.calc_total_profit(&filled_entries, &filled_exits, current_rate);

        let ctx = ExitContext {
            pair,
            trade,
            enter_tags: &enter_tags,
            current_time,
            current_rate,
            current_profit,
            profit,
            max_profit: trade.max_profit(),
            max_loss: trade.max_loss(),
            filled_entries,
            filled_exits,
            recent,
        };

        let route = select_exit_route(trade.direction(), &enter_tags);
        let signal = self.handlers.get(route).evaluate(&ctx);

        debug!(
            pair,
            route = %route,
            tags = ?enter_tags,
            should_exit = signal.should_exit,
            exit_tag = ?signal.tag,
            "exit routed"
        );

        Ok((route, signal))
    }
}

/// Keep the last [`RECENT_CANDLES`] candles, oldest first.
fn recent_window(
    pair: &str,
    mut candles: Vec<Candle>,
) -> Result<[Candle; RECENT_CANDLES], RouterError> {
    let available = candles.len();
    let insufficient = || RouterError::InsufficientHistory {
        pair: pair.to_string(),
        required: RECENT_CANDLES,
        available,
    };
    if available < RECENT_CANDLES {
        return Err(insufficient());
    }
    candles
        .split_off(available - RECENT_CANDLES)
        .try_into()
        .map_err(|_| insufficient())
}
