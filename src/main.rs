// =============================================================================
// Aurora Router — Replay Entry Point
// =============================================================================
//
// Replays recorded ticks through a Strategy and prints one JSON line per
// tick with the adjustment order and exit signal:
//
//   aurora-router <replay.json>
//
//   AURORA_CONFIG   runtime config path (default runtime_config.json)
//   AURORA_OVERLAY  optional config fragment with entry-signal flags
// =============================================================================

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use aurora_router::adjustment::AdjustmentContext;
use aurora_router::market_data::{Candle, CandleBuffer, CandleKey};
use aurora_router::runtime_config::RuntimeConfig;
use aurora_router::strategy::Strategy;
use aurora_router::trade::Trade;

/// Closed candles kept per series.
const MAX_CANDLES: usize = 500;

#[derive(Debug, Deserialize)]
struct ReplayFile {
    #[serde(default)]
    candles: Vec<CandleSeries>,
    #[serde(default)]
    ticks: Vec<ReplayTick>,
}

#[derive(Debug, Deserialize)]
struct CandleSeries {
    pair: String,
    candles: Vec<Candle>,
}

#[derive(Debug, Deserialize)]
struct ReplayTick {
    trade: Trade,
    current_time: DateTime<Utc>,
    current_rate: f64,
    current_profit: f64,
    #[serde(default)]
    min_stake: Option<f64>,
    /// Unbounded when absent; the handlers still honour `min_stake`.
    #[serde(default = "default_max_stake")]
    max_stake: f64,
}

fn default_max_stake() -> f64 {
    f64::INFINITY
}

impl ReplayTick {
    fn adjustment_context(&self) -> AdjustmentContext {
        AdjustmentContext {
            current_time: Some(self.current_time),
            current_rate: self.current_rate,
            current_profit: self.current_profit,
            min_stake: self.min_stake,
            max_stake: self.max_stake,
            current_entry_rate: self.current_rate,
            current_exit_rate: self.current_rate,
            current_entry_profit: self.current_profit,
            current_exit_profit: self.current_profit,
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {what} from {}", path.display()))
}

fn main() -> Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(replay_path) = std::env::args().nth(1).map(PathBuf::from) else {
        bail!("usage: aurora-router <replay.json>");
    };

    let config_path =
        std::env::var("AURORA_CONFIG").unwrap_or_else(|_| "runtime_config.json".to_string());
    let config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    // ── 2. Market data ───────────────────────────────────────────────────
    let replay: ReplayFile = read_json(&replay_path, "replay")?;
    let buffer = Arc::new(CandleBuffer::new(MAX_CANDLES));
    for series in replay.candles {
        let key = CandleKey::new(series.pair, config.timeframe.clone());
        buffer.extend(&key, series.candles);
    }

    // ── 3. Strategy ──────────────────────────────────────────────────────
    let strategy = Strategy::new(config, buffer);

    if let Ok(overlay_path) = std::env::var("AURORA_OVERLAY") {
        let fragment: serde_json::Value = read_json(Path::new(&overlay_path), "signal overlay")?;
        let report = strategy.update_signals_from_value(&fragment);
        if !report.ignored.is_empty() {
            warn!(ignored = ?report.ignored, "overlay named unknown entry conditions");
        }
    }

    // ── 4. Replay ────────────────────────────────────────────────────────
    info!(ticks = replay.ticks.len(), "replay started");
    for tick in &replay.ticks {
        let trade = &tick.trade;
        let order = strategy.adjust_trade_position(trade, &tick.adjustment_context());
        let exit = match strategy.custom_exit(
            &trade.pair,
            trade,
            tick.current_time,
            tick.current_rate,
            tick.current_profit,
        ) {
            Ok(signal) => serde_json::to_value(signal).context("failed to serialise exit signal")?,
            Err(e) => {
                warn!(pair = %trade.pair, error = %e, "exit evaluation failed");
                json!({ "error": e.to_string() })
            }
        };

        let line = json!({
            "pair": trade.pair,
            "time": tick.current_time.to_rfc3339(),
            "adjustment": order,
            "exit": exit,
        });
        println!("{line}");
    }

    info!("replay finished");
    Ok(())
}
