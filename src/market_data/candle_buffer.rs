use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::provider::{DataError, DataProvider};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single analyzed OHLCV candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default = "default_closed")]
    pub is_closed: bool,
}

fn default_closed() -> bool {
    true
}

/// Composite key that identifies a unique candle series.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CandleKey {
    pub pair: String,
    pub timeframe: String,
}

impl CandleKey {
    pub fn new(pair: impl Into<String>, timeframe: impl Into<String>) -> Self {
        Self {
            pair: pair.into(),
            timeframe: timeframe.into(),
        }
    }
}

impl std::fmt::Display for CandleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.pair, self.timeframe)
    }
}

// ---------------------------------------------------------------------------
// CandleBuffer -- thread-safe ring buffer per (pair, timeframe)
// ---------------------------------------------------------------------------

/// Thread-safe ring-buffer holding the most recent analyzed candles per
/// `(pair, timeframe)`.  The live (unclosed) candle is updated in place; once
/// closed it becomes permanent and the ring is trimmed to `max_candles`.
pub struct CandleBuffer {
    buffers: RwLock<HashMap<CandleKey, VecDeque<Candle>>>,
    max_candles: usize,
}

impl CandleBuffer {
    pub fn new(max_candles: usize) -> Self {
        Self {
            buffers: RwLock::new(HashMap::new()),
            max_candles,
        }
    }

    /// Insert or replace the latest candle for the given key.
    ///
    /// * A closed candle replaces an in-progress candle with the same
    ///   `open_time`, is appended, and the ring is trimmed to `max_candles`.
    /// * An in-progress candle replaces the previous in-progress candle with
    ///   the same `open_time`, otherwise it is appended.
    pub fn update(&self, key: CandleKey, candle: Candle) {
        let mut map = self.buffers.write();
        let ring = map
            .entry(key)
            .or_insert_with(|| VecDeque::with_capacity(self.max_candles + 1));

        if let Some(last) = ring.back() {
            if !last.is_closed && last.open_time == candle.open_time {
                ring.pop_back();
            }
        }
        let closed = candle.is_closed;
        ring.push_back(candle);

        if closed {
            while ring.iter().filter(|c| c.is_closed).count() > self.max_candles {
                ring.pop_front();
            }
        }
    }

    /// Append a batch of candles in order.
    pub fn extend(&self, key: &CandleKey, candles: impl IntoIterator<Item = Candle>) {
        for candle in candles {
            self.update(key.clone(), candle);
        }
    }

    /// Return the most recent `count` **closed** candles (oldest-first order).
    pub fn get_closed(&self, key: &CandleKey, count: usize) -> Vec<Candle> {
        let map = self.buffers.read();
        match map.get(key) {
            Some(ring) => {
                let closed: Vec<&Candle> = ring.iter().filter(|c| c.is_closed).collect();
                let start = closed.len().saturating_sub(count);
                closed[start..].iter().map(|c| (*c).clone()).collect()
            }
            None => Vec::new(),
        }
    }

    /// Return the close price of the most recent closed candle, if any.
    pub fn last_close(&self, key: &CandleKey) -> Option<f64> {
        let map = self.buffers.read();
        map.get(key)
            .and_then(|ring| ring.iter().rev().find(|c| c.is_closed).map(|c| c.close))
    }

    /// Total number of candles (including any in-progress candle) stored for a
    /// key.
    pub fn count(&self, key: &CandleKey) -> usize {
        let map = self.buffers.read();
        map.get(key).map_or(0, VecDeque::len)
    }
}

impl DataProvider for CandleBuffer {
    /// Analyzed data is the closed part of the ring.
    fn analyzed_candles(&self, pair: &str, timeframe: &str) -> Result<Vec<Candle>, DataError> {
        let key = CandleKey::new(pair, timeframe);
        let candles = self.get_closed(&key, self.max_candles);
        if candles.is_empty() {
            return Err(DataError::NoData {
                pair: pair.to_string(),
                timeframe: timeframe.to_string(),
            });
        }
        debug!(key = %key, count = candles.len(), "analyzed candles served");
        Ok(candles)
    }
}

#[cfg(test)]
pub(crate) fn sample_candle(open_time: i64, close: f64, is_closed: bool) -> Candle {
    Candle {
        open_time,
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 10.0,
        is_closed,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
