// =============================================================================
// Mode Exits — default exit handler, one instance per exit route
// =============================================================================
//
// Each mode applies the same three rules with its own thresholds:
//
//   1. Stop-loss doom: profit on the initial stake below -stoploss_doom.
//   2. Trailing: max profit above trailing_start and the trade gave
//      back more than trailing_stop of it.
//   3. Take profit: profit above profit_target while the last three
//      closes move against the position.
//
// Exit tags read `exit_<mode>_<rule>`, e.g. `exit_long_pump_trailing`.
// =============================================================================

use tracing::info;

use super::{ExitContext, ExitHandler, ExitRoute, ExitSignal};
use crate::runtime_config::ExitModeParams;
use crate::types::TradeDirection;

/// Rule that triggered a mode exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StoplossDoom,
    Trailing,
    TakeProfit,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StoplossDoom => write!(f, "stoploss_doom"),
            Self::Trailing => write!(f, "trailing"),
            Self::TakeProfit => write!(f, "take_profit"),
        }
    }
}

pub struct ModeExit {
    route: ExitRoute,
    params: ExitModeParams,
}

impl ModeExit {
    pub fn new(route: ExitRoute, params: ExitModeParams) -> Self {
        Self { route, params }
    }

    pub fn exit_tag(&self, reason: ExitReason) -> String {
        format!("exit_{}_{}", self.route.mode_name(), reason)
    }

    fn check(&self, ctx: &ExitContext<'_>) -> Option<ExitReason> {
        let p = &self.params;
        let profit = ctx.profit.init_ratio;

        if profit < -p.stoploss_doom {
            return Some(ExitReason::StoplossDoom);
        }

        if profit > 0.0
            && ctx.max_profit > p.trailing_start
            && ctx.max_profit - profit > p.trailing_stop
        {
            return Some(ExitReason::Trailing);
        }

        if profit > p.profit_target && self.momentum_fading(ctx) {
            return Some(ExitReason::TakeProfit);
        }

        None
    }

    /// Last three closes moving against the position.
    fn momentum_fading(&self, ctx: &ExitContext<'_>) -> bool {
        let last = ctx.last_candle().close;
        let (Some(prev_1), Some(prev_2)) = (ctx.previous_candle(1), ctx.previous_candle(2)) else {
            return false;
        };
        match self.route.direction() {
            TradeDirection::Long => last < prev_1.close && prev_1.close < prev_2.close,
            TradeDirection::Short => last > prev_1.close && prev_1.close > prev_2.close,
        }
    }
}

impl ExitHandler for ModeExit {
    fn evaluate(&self, ctx: &ExitContext<'_>) -> ExitSignal {
        match self.check(ctx) {
            Some(reason) => {
                let tag = self.exit_tag(reason);
                info!(
                    pair = ctx.pair,
                    mode = self.route.mode_name(),
                    reason = %reason,
                    profit = ctx.profit.init_ratio,
                    max_profit = ctx.max_profit,
                    rate = ctx.current_rate,
                    "exit signal"
                );
                ExitSignal::exit(tag)
            }
            None => ExitSignal::hold(),
        }
    }
}
