// =============================================================================
// Exit Management Module
// =============================================================================
//
// Routes every exit evaluation of an open trade to exactly one exit handler,
// chosen from the trade's entry tags, and ships the default per-mode exit
// handlers.

pub mod handlers;
pub mod router;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::market_data::{Candle, DataError};
use crate::runtime_config::ExitParams;
use crate::trade::{FilledOrder, ProfitSnapshot, Trade};
use crate::types::TradeDirection;

pub use handlers::{ExitReason, ModeExit};
pub use router::{select_exit_route, ExitRouter, RECENT_CANDLES};

// =============================================================================
// Routes & results
// =============================================================================

/// The exit handler a trade is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExitRoute {
    LongNormal,
    LongPump,
    LongQuick,
    ShortNormal,
    ShortPump,
}

impl ExitRoute {
    pub const ALL: [ExitRoute; 5] = [
        Self::LongNormal,
        Self::LongPump,
        Self::LongQuick,
        Self::ShortNormal,
        Self::ShortPump,
    ];

    /// Route used when no tag selects one.
    pub fn fallback(direction: TradeDirection) -> Self {
        match direction {
            TradeDirection::Long => Self::LongNormal,
            TradeDirection::Short => Self::ShortNormal,
        }
    }

    pub fn direction(self) -> TradeDirection {
        match self {
            Self::LongNormal | Self::LongPump | Self::LongQuick => TradeDirection::Long,
            Self::ShortNormal | Self::ShortPump => TradeDirection::Short,
        }
    }

    /// Short mode name used in exit tags, e.g. `long_pump`.
    pub fn mode_name(self) -> &'static str {
        match self {
            Self::LongNormal => "long_normal",
            Self::LongPump => "long_pump",
            Self::LongQuick => "long_quick",
            Self::ShortNormal => "short_normal",
            Self::ShortPump => "short_pump",
        }
    }
}

impl std::fmt::Display for ExitRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LongNormal => write!(f, "long_exit_normal"),
            Self::LongPump => write!(f, "long_exit_pump"),
            Self::LongQuick => write!(f, "long_exit_quick"),
            Self::ShortNormal => write!(f, "short_exit_normal"),
            Self::ShortPump => write!(f, "short_exit_pump"),
        }
    }
}

/// Verdict of an exit handler.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ExitSignal {
    pub should_exit: bool,
    /// Name of the exit rule that fired.
    pub tag: Option<String>,
}

impl ExitSignal {
    pub fn hold() -> Self {
        Self::default()
    }

    pub fn exit(tag: impl Into<String>) -> Self {
        Self {
            should_exit: true,
            tag: Some(tag.into()),
        }
    }

    /// Exit reason as reported to the runtime: `"<tag> ( <enter_tag>)"`.
    pub fn exit_reason(&self, enter_tag: &str) -> Option<String> {
        if !self.should_exit {
            return None;
        }
        self.tag.as_ref().map(|tag| format!("{tag} ( {enter_tag})"))
    }
}

#[derive(Debug, Error)]
pub enum RouterError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("insufficient analyzed history for {pair}: need {required} candles, have {available}")]
    InsufficientHistory {
        pair: String,
        required: usize,
        available: usize,
    },
}

// =============================================================================
// Handler seam
// =============================================================================

/// Everything an exit handler may look at.
#[derive(Debug, Clone)]
pub struct ExitContext<'a> {
    pub pair: &'a str,
    pub trade: &'a Trade,
    pub enter_tags: &'a [String],
    pub current_time: DateTime<Utc>,
    pub current_rate: f64,
    pub current_profit: f64,
    pub profit: ProfitSnapshot,
    pub max_profit: f64,
    pub max_loss: f64,
    pub filled_entries: Vec<FilledOrder>,
    pub filled_exits: Vec<FilledOrder>,
    /// Last analyzed candle and the ones before it, oldest first.
    pub recent: [Candle; RECENT_CANDLES],
}

impl ExitContext<'_> {
    pub fn last_candle(&self) -> &Candle {
        &self.recent[RECENT_CANDLES - 1]
    }

    /// Candle `n` steps before the last one (`n >= 1`).
    pub fn previous_candle(&self, n: usize) -> Option<&Candle> {
        (RECENT_CANDLES - 1)
            .checked_sub(n)
            .and_then(|i| self.recent.get(i))
    }
}

pub trait ExitHandler: Send + Sync {
    fn evaluate(&self, ctx: &ExitContext<'_>) -> ExitSignal;
}

/// One exit handler per route, injected into the [`ExitRouter`].
#[derive(Clone)]
pub struct ExitHandlers {
    pub long_normal: Arc<dyn ExitHandler>,
    pub long_pump: Arc<dyn ExitHandler>,
    pub long_quick: Arc<dyn ExitHandler>,
    pub short_normal: Arc<dyn ExitHandler>,
    pub short_pump: Arc<dyn ExitHandler>,
}

impl ExitHandlers {
    /// Default [`ModeExit`] handlers configured from `params`.
    pub fn from_params(params: &ExitParams) -> Self {
        let mode = |route: ExitRoute| -> Arc<dyn ExitHandler> {
            Arc::new(ModeExit::new(route, params.for_route(route).clone()))
        };
        Self {
            long_normal: mode(ExitRoute::LongNormal),
            long_pump: mode(ExitRoute::LongPump),
            long_quick: mode(ExitRoute::LongQuick),
            short_normal: mode(ExitRoute::ShortNormal),
            short_pump: mode(ExitRoute::ShortPump),
        }
    }

    pub fn get(&self, route: ExitRoute) -> &Arc<dyn ExitHandler> {
        match route {
            ExitRoute::LongNormal => &self.long_normal,
            ExitRoute::LongPump => &self.long_pump,
            ExitRoute::LongQuick => &self.long_quick,
            ExitRoute::ShortNormal => &self.short_normal,
            ExitRoute::ShortPump => &self.short_pump,
        }
    }
}
