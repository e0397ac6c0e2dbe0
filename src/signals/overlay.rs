// =============================================================================
// Signal Overlay — partial, repeatable updates of the entry-signal flags
// =============================================================================
//
// Merge rules:
//   - A side missing from the fragment leaves that side untouched.
//   - A condition missing from the fragment keeps its value.
//   - A condition present in both overwrites the stored value.
//   - A condition the store does not know is ignored (logged and reported);
//     the key set of the store never changes after construction.
//
// Applying the same fragment twice leaves the same state as applying it once.
// =============================================================================

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::params::{SignalParams, LONG_SIGNALS_KEY, SHORT_SIGNALS_KEY};
use crate::types::TradeDirection;

/// A configuration fragment naming some of the entry-signal flags.
///
/// Other top-level keys of a strategy config are ignored when deserialising.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalOverlay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_entry_signal_params: Option<BTreeMap<String, bool>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_entry_signal_params: Option<BTreeMap<String, bool>>,
}

impl SignalOverlay {
    pub fn is_empty(&self) -> bool {
        self.long_entry_signal_params.is_none() && self.short_entry_signal_params.is_none()
    }

    /// Set one long flag, creating the long section if needed.
    pub fn with_long(mut self, condition: impl Into<String>, enabled: bool) -> Self {
        self.long_entry_signal_params
            .get_or_insert_with(BTreeMap::new)
            .insert(condition.into(), enabled);
        self
    }

    /// Set one short flag, creating the short section if needed.
    pub fn with_short(mut self, condition: impl Into<String>, enabled: bool) -> Self {
        self.short_entry_signal_params
            .get_or_insert_with(BTreeMap::new)
            .insert(condition.into(), enabled);
        self
    }

    /// Extract the overlay from a whole strategy config.  Entries whose
    /// value is not a boolean are skipped with a warning.
    pub fn from_config(config: &Value) -> Self {
        Self {
            long_entry_signal_params: section_from_value(config, LONG_SIGNALS_KEY),
            short_entry_signal_params: section_from_value(config, SHORT_SIGNALS_KEY),
        }
    }
}

fn section_from_value(config: &Value, key: &str) -> Option<BTreeMap<String, bool>> {
    let section = config.get(key)?;
    let Some(entries) = section.as_object() else {
        warn!(section = key, "signal section is not an object, ignored");
        return None;
    };

    let flags = entries
        .iter()
        .filter_map(|(name, value)| match value.as_bool() {
            Some(enabled) => Some((name.clone(), enabled)),
            None => {
                warn!(
                    section = key,
                    condition = %name,
                    value = %value,
                    "non-boolean signal flag, ignored"
                );
                None
            }
        })
        .collect();
    Some(flags)
}

/// Outcome of one merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Entries written to the store.
    pub applied: usize,
    /// Entries whose value actually flipped.
    pub changed: usize,
    /// `<section>.<condition>` names the store does not know.
    pub ignored: Vec<String>,
}

impl SignalParams {
    /// Merge `overlay` into these flags in place.
    pub fn merge(&mut self, overlay: &SignalOverlay) -> MergeReport {
        let mut report = MergeReport::default();
        if let Some(long) = &overlay.long_entry_signal_params {
            merge_section(
                &mut self.long_entry_signal_params,
                long,
                LONG_SIGNALS_KEY,
                &mut report,
            );
        }
        if let Some(short) = &overlay.short_entry_signal_params {
            merge_section(
                &mut self.short_entry_signal_params,
                short,
                SHORT_SIGNALS_KEY,
                &mut report,
            );
        }
        report
    }
}

fn merge_section(
    store: &mut BTreeMap<String, bool>,
    fragment: &BTreeMap<String, bool>,
    section: &str,
    report: &mut MergeReport,
) {
    for (name, &enabled) in fragment {
        match store.get_mut(name) {
            Some(slot) => {
                if *slot != enabled {
                    debug!(section, condition = %name, enabled, "entry signal flipped");
                    report.changed += 1;
                }
                *slot = enabled;
                report.applied += 1;
            }
            None => {
                warn!(section, condition = %name, "unknown entry condition in config, ignored");
                report.ignored.push(format!("{section}.{name}"));
            }
        }
    }
}

// =============================================================================
// SignalStore
// =============================================================================

/// Instance-owned entry-signal flags.
///
/// Merges run under the write lock, so readers see either the whole merge or
/// none of it.
#[derive(Debug, Default)]
pub struct SignalStore {
    inner: RwLock<SignalParams>,
}

impl SignalStore {
    pub fn new(params: SignalParams) -> Self {
        Self {
            inner: RwLock::new(params),
        }
    }

    pub fn snapshot(&self) -> SignalParams {
        self.inner.read().clone()
    }

    pub fn is_enabled(&self, direction: TradeDirection, condition: &str) -> Option<bool> {
        self.inner.read().is_enabled(direction, condition)
    }

    pub fn apply(&self, overlay: &SignalOverlay) -> MergeReport {
        if overlay.is_empty() {
            return MergeReport::default();
        }
        let report = self.inner.write().merge(overlay);
        info!(
            applied = report.applied,
            changed = report.changed,
            ignored = report.ignored.len(),
            "entry signals updated from config"
        );
        report
    }
}
