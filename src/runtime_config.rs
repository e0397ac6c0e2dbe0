// =============================================================================
// Runtime Configuration — strategy settings with atomic save
// =============================================================================
//
// Central configuration hub for the routing engine: the adjustment switch,
// the analysis timeframe, handler thresholds, and the initial entry-signal
// flags.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::exit::ExitRoute;
use crate::signals::SignalParams;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_timeframe() -> String {
    "5m".to_string()
}

fn default_rebuy_stakes() -> Vec<f64> {
    vec![1.0, 1.0]
}

fn default_rebuy_thresholds() -> Vec<f64> {
    vec![-0.08, -0.10]
}

fn default_grind_stake() -> f64 {
    0.5
}

fn default_grind_threshold() -> f64 {
    -0.03
}

fn default_grind_profit_threshold() -> f64 {
    0.02
}

fn default_max_grinds() -> usize {
    4
}

// =============================================================================
// Adjustment parameters
// =============================================================================

/// Thresholds of the long rebuy handler.  Entry `i` applies when the trade
/// has `i + 1` filled entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebuyParams {
    /// Rebuy stake as a multiple of the first entry's cost.
    #[serde(default = "default_rebuy_stakes")]
    pub stakes: Vec<f64>,

    /// Profit ratio the trade and the latest entry must both be below.
    #[serde(default = "default_rebuy_thresholds")]
    pub thresholds: Vec<f64>,
}

impl Default for RebuyParams {
    fn default() -> Self {
        Self {
            stakes: default_rebuy_stakes(),
            thresholds: default_rebuy_thresholds(),
        }
    }
}

/// Thresholds of the grind handlers (long and short).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrindParams {
    /// Grind stake as a multiple of the first entry's cost.
    #[serde(default = "default_grind_stake")]
    pub stake: f64,

    /// Loss of the latest entry slice that triggers a grind entry.
    #[serde(default = "default_grind_threshold")]
    pub threshold: f64,

    /// Profit of the latest grind entry that triggers selling it back.
    #[serde(default = "default_grind_profit_threshold")]
    pub profit_threshold: f64,

    /// Maximum number of grind entries on top of the initial entry.
    #[serde(default = "default_max_grinds")]
    pub max_grinds: usize,
}

impl Default for GrindParams {
    fn default() -> Self {
        Self {
            stake: default_grind_stake(),
            threshold: default_grind_threshold(),
            profit_threshold: default_grind_profit_threshold(),
            max_grinds: default_max_grinds(),
        }
    }
}

// =============================================================================
// Exit parameters
// =============================================================================

/// Thresholds of one exit mode.  All values are profit ratios.
///
/// Standalone, missing fields take the normal-mode values; inside
/// [`ExitParams`] they take the defaults of their own mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitModeParams {
    pub profit_target: f64,
    pub stoploss_doom: f64,
    pub trailing_start: f64,
    pub trailing_stop: f64,
}

impl Default for ExitModeParams {
    fn default() -> Self {
        Self::normal()
    }
}

impl ExitModeParams {
    fn normal() -> Self {
        Self {
            profit_target: 0.05,
            stoploss_doom: 0.20,
            trailing_start: 0.08,
            trailing_stop: 0.03,
        }
    }

    fn pump() -> Self {
        Self {
            profit_target: 0.04,
            stoploss_doom: 0.20,
            trailing_start: 0.06,
            trailing_stop: 0.02,
        }
    }

    fn quick() -> Self {
        Self {
            profit_target: 0.02,
            stoploss_doom: 0.15,
            trailing_start: 0.04,
            trailing_stop: 0.015,
        }
    }
}

/// Exit-mode thresholds as written in a config file; every field optional.
#[derive(Debug, Default, Deserialize)]
struct ExitModeOverride {
    profit_target: Option<f64>,
    stoploss_doom: Option<f64>,
    trailing_start: Option<f64>,
    trailing_stop: Option<f64>,
}

impl ExitModeOverride {
    fn over(self, base: ExitModeParams) -> ExitModeParams {
        ExitModeParams {
            profit_target: self.profit_target.unwrap_or(base.profit_target),
            stoploss_doom: self.stoploss_doom.unwrap_or(base.stoploss_doom),
            trailing_start: self.trailing_start.unwrap_or(base.trailing_start),
            trailing_stop: self.trailing_stop.unwrap_or(base.trailing_stop),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExitParamsFile {
    long_normal: ExitModeOverride,
    long_pump: ExitModeOverride,
    long_quick: ExitModeOverride,
    short_normal: ExitModeOverride,
    short_pump: ExitModeOverride,
}

impl From<ExitParamsFile> for ExitParams {
    fn from(file: ExitParamsFile) -> Self {
        Self {
            long_normal: file.long_normal.over(ExitModeParams::normal()),
            long_pump: file.long_pump.over(ExitModeParams::pump()),
            long_quick: file.long_quick.over(ExitModeParams::quick()),
            short_normal: file.short_normal.over(ExitModeParams::normal()),
            short_pump: file.short_pump.over(ExitModeParams::pump()),
        }
    }
}

/// Per-route exit thresholds.  A mode named in the config only overrides the
/// fields it lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ExitParamsFile")]
pub struct ExitParams {
    pub long_normal: ExitModeParams,
    pub long_pump: ExitModeParams,
    pub long_quick: ExitModeParams,
    pub short_normal: ExitModeParams,
    pub short_pump: ExitModeParams,
}

impl ExitParams {
    pub fn for_route(&self, route: ExitRoute) -> &ExitModeParams {
        match route {
            ExitRoute::LongNormal => &self.long_normal,
            ExitRoute::LongPump => &self.long_pump,
            ExitRoute::LongQuick => &self.long_quick,
            ExitRoute::ShortNormal => &self.short_normal,
            ExitRoute::ShortPump => &self.short_pump,
        }
    }
}

impl Default for ExitParams {
    fn default() -> Self {
        Self {
            long_normal: ExitModeParams::normal(),
            long_pump: ExitModeParams::pump(),
            long_quick: ExitModeParams::quick(),
            short_normal: ExitModeParams::normal(),
            short_pump: ExitModeParams::pump(),
        }
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration of a routing strategy instance.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Initial state of the position-adjustment switch.
    #[serde(default = "default_true")]
    pub position_adjustment_enable: bool,

    /// Timeframe of the analyzed candles handed to exit handlers.
    #[serde(default = "default_timeframe")]
    pub timeframe: String,

    #[serde(default)]
    pub rebuy: RebuyParams,

    #[serde(default)]
    pub grind: GrindParams,

    #[serde(default)]
    pub exits: ExitParams,

    /// Initial entry-signal flags.  Overlays only flip existing keys.
    #[serde(default)]
    pub signals: SignalParams,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            position_adjustment_enable: true,
            timeframe: default_timeframe(),
            rebuy: RebuyParams::default(),
            grind: GrindParams::default(),
            exits: ExitParams::default(),
            signals: SignalParams::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            timeframe = %config.timeframe,
            position_adjustment = config.position_adjustment_enable,
            long_signals = config.signals.long_entry_signal_params.len(),
            short_signals = config.signals.short_entry_signal_params.len(),
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the configuration to `path` using an atomic write (write to
    /// `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }
}
