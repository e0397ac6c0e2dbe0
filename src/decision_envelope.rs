// =============================================================================
// Decision Envelope — auditable record of every routing decision
// =============================================================================
//
// Each adjustment or exit evaluation produces exactly one envelope naming the
// single handler that ran (or why none did), so that handler invocations can
// be audited after the fact.
// =============================================================================

use serde::Serialize;

use crate::adjustment::{AdjustmentOrder, AdjustmentRoute};
use crate::exit::{ExitRoute, ExitSignal};
use crate::types::TradeDirection;

/// Which kind of tick produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DecisionKind {
    Adjustment,
    Exit,
}

/// What the selected handler returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecisionOutcome {
    Adjustment { order: Option<AdjustmentOrder> },
    Exit { signal: ExitSignal },
    /// The exit evaluation failed before any handler ran.
    Failed { error: String },
}

/// Complete auditable record of one routing decision.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionEnvelope {
    /// Unique identifier for this decision (UUID v4).
    pub id: String,

    pub pair: String,

    pub direction: TradeDirection,

    /// Entry tags as parsed from the trade.
    pub enter_tags: Vec<String>,

    pub kind: DecisionKind,

    /// Handler that ran, e.g. `long_rebuy_adjust_trade_position`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,

    pub outcome: DecisionOutcome,

    /// ISO 8601 timestamp of when this decision was created.
    pub created_at: String,
}

impl DecisionEnvelope {
    fn new(
        pair: impl Into<String>,
        direction: TradeDirection,
        enter_tags: Vec<String>,
        kind: DecisionKind,
        handler: Option<String>,
        outcome: DecisionOutcome,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            pair: pair.into(),
            direction,
            enter_tags,
            kind,
            handler,
            outcome,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn adjustment(
        pair: impl Into<String>,
        direction: TradeDirection,
        enter_tags: Vec<String>,
        route: AdjustmentRoute,
        order: Option<AdjustmentOrder>,
    ) -> Self {
        Self::new(
            pair,
            direction,
            enter_tags,
            DecisionKind::Adjustment,
            Some(route.to_string()),
            DecisionOutcome::Adjustment { order },
        )
    }

    pub fn exit(
        pair: impl Into<String>,
        direction: TradeDirection,
        enter_tags: Vec<String>,
        route: ExitRoute,
        signal: ExitSignal,
    ) -> Self {
        Self::new(
            pair,
            direction,
            enter_tags,
            DecisionKind::Exit,
            Some(route.to_string()),
            DecisionOutcome::Exit { signal },
        )
    }

    pub fn failed(
        pair: impl Into<String>,
        direction: TradeDirection,
        enter_tags: Vec<String>,
        error: impl Into<String>,
    ) -> Self {
        Self::new(
            pair,
            direction,
            enter_tags,
            DecisionKind::Exit,
            None,
            DecisionOutcome::Failed {
                error: error.into(),
            },
        )
    }
}
