// =============================================================================
// Tag Classifier — static taxonomy of entry tags
// =============================================================================
//
// Tags are grouped in numeric blocks, one block per entry mode:
//
//   Long                         Short
//     1- 13  normal                501-513  normal
//    21- 26  pump                  521-526  pump
//    41- 53  quick                 541-553  quick
//    61- 62  rebuy                     561  rebuy
//    81- 82  high profit               581  high profit
//   101-110  rapid                 601-610  rapid
//       120  grind                     620  grind
//   141-148  top coins             641-648  top coins
//       161  derisk                    661  derisk
//
// Membership is an exact string match against TAG_TABLE.  Nothing here parses
// a tag as a number.
// =============================================================================

use serde::Serialize;

use crate::exit::ExitRoute;
use crate::types::TradeDirection;

/// Category a single entry tag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TagCategory {
    /// Re-enter a long position at a lower price.
    Rebuy,
    /// Partial exits / risk reduction, both directions.
    Grind,
    ExitNormalLong,
    ExitPumpLong,
    ExitQuickLong,
    ExitNormalShort,
    ExitPumpShort,
    /// Known entry mode without a dedicated handler here (high profit, rapid,
    /// top coins, derisk, short quick, short rebuy).
    OtherMode,
    Unknown,
}

impl TagCategory {
    /// Exit route this category selects for a trade of `direction`, if any.
    pub fn exit_route(self, direction: TradeDirection) -> Option<ExitRoute> {
        match (direction, self) {
            (TradeDirection::Long, Self::ExitNormalLong) => Some(ExitRoute::LongNormal),
            (TradeDirection::Long, Self::ExitPumpLong) => Some(ExitRoute::LongPump),
            (TradeDirection::Long, Self::ExitQuickLong) => Some(ExitRoute::LongQuick),
            (TradeDirection::Short, Self::ExitNormalShort) => Some(ExitRoute::ShortNormal),
            (TradeDirection::Short, Self::ExitPumpShort) => Some(ExitRoute::ShortPump),
            _ => None,
        }
    }

    /// Whether a tag of this category keeps a long position eligible for the
    /// rebuy handler.  Unknown tags count as grind.
    pub fn counts_as_rebuy_or_grind(self) -> bool {
        matches!(self, Self::Rebuy | Self::Grind | Self::Unknown)
    }
}

impl std::fmt::Display for TagCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Rebuy => "rebuy",
            Self::Grind => "grind",
            Self::ExitNormalLong => "exit_normal_long",
            Self::ExitPumpLong => "exit_pump_long",
            Self::ExitQuickLong => "exit_quick_long",
            Self::ExitNormalShort => "exit_normal_short",
            Self::ExitPumpShort => "exit_pump_short",
            Self::OtherMode => "other_mode",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Literal tag strings per category.
pub static TAG_TABLE: &[(TagCategory, &[&str])] = &[
    (
        TagCategory::ExitNormalLong,
        &["1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13"],
    ),
    (TagCategory::ExitPumpLong, &["21", "22", "23", "24", "25", "26"]),
    (
        TagCategory::ExitQuickLong,
        &["41", "42", "43", "44", "45", "46", "47", "48", "49", "50", "51", "52", "53"],
    ),
    (TagCategory::Rebuy, &["61", "62"]),
    (TagCategory::Grind, &["120", "620"]),
    (
        TagCategory::ExitNormalShort,
        &[
            "501", "502", "503", "504", "505", "506", "507", "508", "509", "510", "511", "512",
            "513",
        ],
    ),
    (TagCategory::ExitPumpShort, &["521", "522", "523", "524", "525", "526"]),
    (
        TagCategory::OtherMode,
        &[
            // long high profit, rapid, top coins, derisk
            "81", "82", "101", "102", "103", "104", "105", "106", "107", "108", "109", "110",
            "141", "142", "143", "144", "145", "146", "147", "148", "161",
            // short quick, rebuy, high profit, rapid, top coins, derisk
            "541", "542", "543", "544", "545", "546", "547", "548", "549", "550", "551", "552",
            "553", "561", "581", "601", "602", "603", "604", "605", "606", "607", "608", "609",
            "610", "641", "642", "643", "644", "645", "646", "647", "648", "661",
        ],
    ),
];

/// Classify one tag token.
pub fn classify(tag: &str) -> TagCategory {
    TAG_TABLE
        .iter()
        .find(|(_, tags)| tags.contains(&tag))
        .map(|(category, _)| *category)
        .unwrap_or(TagCategory::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn exit_blocks_classify() {
        assert_eq!(classify("1"), TagCategory::ExitNormalLong);
        assert_eq!(classify("6"), TagCategory::ExitNormalLong);
        assert_eq!(classify("21"), TagCategory::ExitPumpLong);
        assert_eq!(classify("41"), TagCategory::ExitQuickLong);
        assert_eq!(classify("501"), TagCategory::ExitNormalShort);
        assert_eq!(classify("521"), TagCategory::ExitPumpShort);
    }

    #[test]
    fn adjustment_blocks_classify() {
        assert_eq!(classify("61"), TagCategory::Rebuy);
        assert_eq!(classify("62"), TagCategory::Rebuy);
        assert_eq!(classify("120"), TagCategory::Grind);
        assert_eq!(classify("620"), TagCategory::Grind);
    }

    #[test]
    fn other_modes_are_known_but_unrouted() {
        for tag in ["81", "101", "141", "161", "541", "561"] {
            assert_eq!(classify(tag), TagCategory::OtherMode, "tag {tag}");
        }
    }

    #[test]
    fn unknown_tokens() {
        assert_eq!(classify("999"), TagCategory::Unknown);
        assert_eq!(classify("500"), TagCategory::Unknown);
        assert_eq!(classify(""), TagCategory::Unknown);
        assert_eq!(classify("61a"), TagCategory::Unknown);
    }

    #[test]
    fn table_has_no_duplicate_tags() {
        let mut seen = HashSet::new();
        for (_, tags) in TAG_TABLE {
            for tag in *tags {
                assert!(seen.insert(*tag), "tag {tag} listed twice");
            }
        }
    }

    #[test]
    fn exit_route_respects_direction() {
        assert_eq!(
            TagCategory::ExitPumpLong.exit_route(TradeDirection::Long),
            Some(ExitRoute::LongPump)
        );
        assert_eq!(TagCategory::ExitPumpLong.exit_route(TradeDirection::Short), None);
        assert_eq!(TagCategory::ExitNormalShort.exit_route(TradeDirection::Long), None);
        assert_eq!(TagCategory::Unknown.exit_route(TradeDirection::Long), None);
    }

    #[test]
    fn unknown_counts_as_grind_for_adjustment() {
        assert!(TagCategory::Unknown.counts_as_rebuy_or_grind());
        assert!(TagCategory::Rebuy.counts_as_rebuy_or_grind());
        assert!(!TagCategory::ExitNormalLong.counts_as_rebuy_or_grind());
        assert!(!TagCategory::OtherMode.counts_as_rebuy_or_grind());
    }
}
