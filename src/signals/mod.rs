// =============================================================================
// Signals Module
// =============================================================================
//
// Entry-signal flags of the strategy and the overlay merge that lets a config
// fragment flip individual flags at runtime:
// - SignalParams: the long/short condition-name -> enabled maps
// - SignalOverlay: a partial fragment of those maps
// - SignalStore: the instance-owned, lock-guarded copy the merge writes to

pub mod overlay;
pub mod params;

pub use overlay::{MergeReport, SignalOverlay, SignalStore};
pub use params::{SignalParams, LONG_SIGNALS_KEY, SHORT_SIGNALS_KEY};
