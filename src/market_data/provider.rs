//! Data provider seam and its structured error type.
//!
//! The exit router asks a provider for the most recently analyzed candles of
//! a pair.  The execution runtime owns the real implementation; the in-memory
//! [`CandleBuffer`](super::CandleBuffer) is the one shipped with this crate.

use thiserror::Error;

use super::Candle;

/// Failures a data provider may report.  They are propagated unchanged to the
/// caller of the exit evaluation.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no analyzed data for {pair} at {timeframe}")]
    NoData { pair: String, timeframe: String },

    #[error("data provider unavailable: {0}")]
    Unavailable(String),
}

/// Source of analyzed market data, keyed by pair and timeframe.
pub trait DataProvider: Send + Sync {
    /// Most recently analyzed candles, oldest first.
    fn analyzed_candles(&self, pair: &str, timeframe: &str) -> Result<Vec<Candle>, DataError>;
}
