use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::TradeDirection;

pub const LONG_SIGNALS_KEY: &str = "long_entry_signal_params";
pub const SHORT_SIGNALS_KEY: &str = "short_entry_signal_params";

/// Long entry conditions and their default state.
const LONG_CONDITIONS: &[(u32, bool)] = &[
    (1, true),
    (2, true),
    (3, true),
    (4, true),
    (5, true),
    (6, true),
    (21, true),
    (41, true),
    (42, true),
    (43, true),
    (44, true),
    (45, true),
    (46, true),
    (61, true),
    (62, false),
    (101, true),
    (102, true),
    (103, true),
    (104, true),
    (120, true),
    (141, true),
    (142, true),
    (143, true),
    (144, true),
    (145, true),
    (161, true),
];

/// Short entry conditions and their default state.
const SHORT_CONDITIONS: &[(u32, bool)] = &[(501, false), (502, false)];

pub fn condition_name(direction: TradeDirection, condition: u32) -> String {
    format!("{direction}_entry_condition_{condition}_enable")
}

fn build(direction: TradeDirection, conditions: &[(u32, bool)]) -> BTreeMap<String, bool> {
    conditions
        .iter()
        .map(|&(condition, enabled)| (condition_name(direction, condition), enabled))
        .collect()
}

fn default_long_signals() -> BTreeMap<String, bool> {
    build(TradeDirection::Long, LONG_CONDITIONS)
}

fn default_short_signals() -> BTreeMap<String, bool> {
    build(TradeDirection::Short, SHORT_CONDITIONS)
}

/// Entry-condition flags, grouped by direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalParams {
    #[serde(default = "default_long_signals")]
    pub long_entry_signal_params: BTreeMap<String, bool>,

    #[serde(default = "default_short_signals")]
    pub short_entry_signal_params: BTreeMap<String, bool>,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            long_entry_signal_params: default_long_signals(),
            short_entry_signal_params: default_short_signals(),
        }
    }
}

impl SignalParams {
    pub fn side(&self, direction: TradeDirection) -> &BTreeMap<String, bool> {
        match direction {
            TradeDirection::Long => &self.long_entry_signal_params,
            TradeDirection::Short => &self.short_entry_signal_params,
        }
    }

    /// `None` when the condition is not configured at all.
    pub fn is_enabled(&self, direction: TradeDirection, condition: &str) -> Option<bool> {
        self.side(direction).get(condition).copied()
    }
}
