// =============================================================================
// Aurora Router — tag-driven position adjustment and exit routing
// =============================================================================
//
// Every open trade carries the entry tags that opened it.  On each tick the
// runtime asks the Strategy what to do; the tags decide which single handler
// answers:
//
//   tags      whitespace-separated tag parsing and the static tag taxonomy
//   adjustment  rebuy / grind routing and the default handlers
//   exit      per-mode exit routing and the default handlers
//   signals   entry-signal flags and their config overlay
// =============================================================================

pub mod adjustment;
pub mod decision_envelope;
pub mod exit;
pub mod market_data;
pub mod runtime_config;
pub mod signals;
pub mod strategy;
pub mod tags;
pub mod trade;
pub mod types;

pub use adjustment::{AdjustmentContext, AdjustmentHandler, AdjustmentOrder, AdjustmentRoute};
pub use exit::{ExitHandler, ExitRoute, ExitSignal, RouterError};
pub use market_data::{Candle, CandleBuffer, CandleKey, DataError, DataProvider};
pub use runtime_config::RuntimeConfig;
pub use signals::{MergeReport, SignalOverlay, SignalParams};
pub use strategy::Strategy;
pub use trade::{FilledOrder, Trade};
pub use types::{OrderSide, TradeDirection};
