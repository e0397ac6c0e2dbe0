// =============================================================================
// Entry Tags Module
// =============================================================================
//
// Every position is annotated at entry with one or more numeric tags naming
// the entry condition that fired.  This module turns the raw tag string back
// into tokens and maps each token onto the mode it belongs to, so the routers
// can pick a handler without re-evaluating entry conditions.

pub mod classifier;
pub mod parser;

pub use classifier::{classify, TagCategory, TAG_TABLE};
pub use parser::{parse_tags, parse_trade_tags};
