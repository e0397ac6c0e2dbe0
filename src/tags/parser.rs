// =============================================================================
// Tag Parser — raw `enter_tag` string to ordered tokens
// =============================================================================

/// Split a raw tag string into its tokens, preserving left-to-right order.
///
/// Any run of whitespace separates tokens; empty pieces are dropped.  Tokens
/// are not validated, unknown ones are passed through unchanged.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

/// Parse the tag field of a trade.  A missing tag behaves like an empty one.
pub fn parse_trade_tags(enter_tag: Option<&str>) -> Vec<String> {
    enter_tag.map(parse_tags).unwrap_or_default()
}
