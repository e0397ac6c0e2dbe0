pub mod candle_buffer;
pub mod provider;

// Re-export for convenient access (e.g. `use crate::market_data::Candle`).
pub use candle_buffer::{Candle, CandleBuffer, CandleKey};
pub use provider::{DataError, DataProvider};
