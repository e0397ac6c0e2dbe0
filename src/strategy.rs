// =============================================================================
// Strategy — tag-routed position adjustment and exits
// =============================================================================
//
// The surface the execution runtime calls into:
//
//   adjust_trade_position      every adjustment tick; one adjustment handler
//   custom_exit                every exit tick; one exit handler
//   update_signals_from_config whenever a config fragment arrives
//
// The instance owns its entry-signal flags, its handlers and a short audit
// trail of recent decisions.  Nothing here is process-global.
// =============================================================================

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::adjustment::{
    AdjustmentContext, AdjustmentHandlers, AdjustmentOrder, PositionAdjustmentRouter,
};
use crate::decision_envelope::DecisionEnvelope;
use crate::exit::{ExitHandlers, ExitRouter, ExitSignal, RouterError};
use crate::market_data::DataProvider;
use crate::runtime_config::RuntimeConfig;
use crate::signals::{MergeReport, SignalOverlay, SignalParams, SignalStore};
use crate::trade::Trade;
use crate::types::TradeDirection;

/// Maximum number of recent decisions to retain.
const MAX_RECENT_DECISIONS: usize = 100;

pub struct Strategy {
    config: RuntimeConfig,
    position_adjustment_enabled: AtomicBool,
    signals: SignalStore,
    adjustment: PositionAdjustmentRouter,
    exits: ExitRouter,
    provider: Arc<dyn DataProvider>,
    recent_decisions: RwLock<VecDeque<DecisionEnvelope>>,
}

impl Strategy {
    /// Build a strategy with the default handlers configured from `config`.
    pub fn new(config: RuntimeConfig, provider: Arc<dyn DataProvider>) -> Self {
        let adjustment = AdjustmentHandlers::from_config(&config);
        let exits = ExitHandlers::from_params(&config.exits);
        Self::with_handlers(config, provider, adjustment, exits)
    }

    /// Build a strategy around caller-supplied handlers.
    pub fn with_handlers(
        config: RuntimeConfig,
        provider: Arc<dyn DataProvider>,
        adjustment: AdjustmentHandlers,
        exits: ExitHandlers,
    ) -> Self {
        info!(
            timeframe = %config.timeframe,
            position_adjustment = config.position_adjustment_enable,
            "strategy initialised"
        );
        Self {
            position_adjustment_enabled: AtomicBool::new(config.position_adjustment_enable),
            signals: SignalStore::new(config.signals.clone()),
            adjustment: PositionAdjustmentRouter::new(adjustment),
            exits: ExitRouter::new(exits, config.timeframe.clone()),
            provider,
            recent_decisions: RwLock::new(VecDeque::with_capacity(MAX_RECENT_DECISIONS)),
            config,
        }
    }

    /// Configuration the strategy was built from.  Its `signals` are the
    /// initial flags only; merged flags live in the store, see [`Self::signals`].
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn position_adjustment_enabled(&self) -> bool {
        self.position_adjustment_enabled.load(Ordering::SeqCst)
    }

    pub fn set_position_adjustment_enabled(&self, enabled: bool) {
        self.position_adjustment_enabled.store(enabled, Ordering::SeqCst);
        info!(enabled, "position adjustment switched");
    }

    // -------------------------------------------------------------------------
    // Position adjustment
    // -------------------------------------------------------------------------

    /// Route one adjustment tick.  Returns the order requested by the selected
    /// handler; `None` without running any handler when adjustment is off.
    pub fn adjust_trade_position(
        &self,
        trade: &Trade,
        ctx: &AdjustmentContext,
    ) -> Option<AdjustmentOrder> {
        if !self.position_adjustment_enabled() {
            debug!(pair = %trade.pair, "position adjustment disabled");
            return None;
        }

        let (route, order) = self.adjustment.route(trade, ctx);
        self.record(DecisionEnvelope::adjustment(
            trade.pair.clone(),
            trade.direction(),
            trade.enter_tags(),
            route,
            order.clone(),
        ));
        order
    }

    // -------------------------------------------------------------------------
    // Exits
    // -------------------------------------------------------------------------

    /// Route one exit tick.  Data-provider failures are returned to the
    /// caller; no handler runs in that case.
    pub fn custom_exit(
        &self,
        pair: &str,
        trade: &Trade,
        current_time: DateTime<Utc>,
        current_rate: f64,
        current_profit: f64,
    ) -> Result<ExitSignal, RouterError> {
        let result = self.exits.route(
            self.provider.as_ref(),
            pair,
            trade,
            current_time,
            current_rate,
            current_profit,
        );

        match result {
            Ok((route, signal)) => {
                self.record(DecisionEnvelope::exit(
                    pair,
                    trade.direction(),
                    trade.enter_tags(),
                    route,
                    signal.clone(),
                ));
                Ok(signal)
            }
            Err(e) => {
                warn!(pair, error = %e, "exit evaluation failed");
                self.record(DecisionEnvelope::failed(
                    pair,
                    trade.direction(),
                    trade.enter_tags(),
                    e.to_string(),
                ));
                Err(e)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Entry-signal flags
    // -------------------------------------------------------------------------

    pub fn update_signals_from_config(&self, overlay: &SignalOverlay) -> MergeReport {
        self.signals.apply(overlay)
    }

    /// Merge the signal sections of a whole strategy config.
    pub fn update_signals_from_value(&self, config: &Value) -> MergeReport {
        self.signals.apply(&SignalOverlay::from_config(config))
    }

    pub fn signals(&self) -> SignalParams {
        self.signals.snapshot()
    }

    /// Unknown conditions count as disabled.
    pub fn is_signal_enabled(&self, direction: TradeDirection, condition: &str) -> bool {
        self.signals.is_enabled(direction, condition).unwrap_or(false)
    }

    // -------------------------------------------------------------------------
    // Audit trail
    // -------------------------------------------------------------------------

    /// Recent decisions, oldest first.
    pub fn recent_decisions(&self) -> Vec<DecisionEnvelope> {
        self.recent_decisions.read().iter().cloned().collect()
    }

    fn record(&self, envelope: DecisionEnvelope) {
        let mut decisions = self.recent_decisions.write();
        if decisions.len() >= MAX_RECENT_DECISIONS {
            decisions.pop_front();
        }
        decisions.push_back(envelope);
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjustment::AdjustmentHandler;
    use crate::decision_envelope::DecisionOutcome;
    use crate::exit::{ExitContext, ExitHandler};
    use crate::market_data::candle_buffer::sample_candle;
    use crate::market_data::{Candle, CandleBuffer, CandleKey, DataError};
    use crate::trade::fixtures::trade;
    use chrono::TimeZone;
    use parking_lot::Mutex;

    // ── Test doubles ─────────────────────────────────────────────────────

    /// Arguments one adjustment handler call received.
    struct AdjustCall {
        /// Address of the trade, to check the caller's reference was passed.
        trade: usize,
        pair: String,
        tags: Vec<String>,
        ctx: AdjustmentContext,
    }

    impl AdjustCall {
        fn saw_trade(&self, trade: &Trade) -> bool {
            self.trade == trade as *const Trade as usize && self.pair == trade.pair
        }
    }

    #[derive(Default)]
    struct RecordingAdjustment {
        calls: Mutex<Vec<AdjustCall>>,
    }

    impl AdjustmentHandler for RecordingAdjustment {
        fn adjust(
            &self,
            trade: &Trade,
            enter_tags: &[String],
            ctx: &AdjustmentContext,
        ) -> Option<AdjustmentOrder> {
            self.calls.lock().push(AdjustCall {
                trade: trade as *const Trade as usize,
                pair: trade.pair.clone(),
                tags: enter_tags.to_vec(),
                ctx: ctx.clone(),
            });
            None
        }
    }

    struct RecordingExit {
        name: &'static str,
        calls: Mutex<Vec<(f64, f64)>>,
    }

    impl RecordingExit {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl ExitHandler for RecordingExit {
        fn evaluate(&self, ctx: &ExitContext<'_>) -> ExitSignal {
            self.calls
                .lock()
                .push((ctx.last_candle().close, ctx.current_rate));
            ExitSignal::exit(self.name)
        }
    }

    struct StaticProvider(Vec<Candle>);

    impl DataProvider for StaticProvider {
        fn analyzed_candles(
            &self,
            _pair: &str,
            _timeframe: &str,
        ) -> Result<Vec<Candle>, DataError> {
            Ok(self.0.clone())
        }
    }

    struct FailingProvider;

    impl DataProvider for FailingProvider {
        fn analyzed_candles(
            &self,
            _pair: &str,
            _timeframe: &str,
        ) -> Result<Vec<Candle>, DataError> {
            Err(DataError::Unavailable("exchange offline".to_string()))
        }
    }

    struct Harness {
        strategy: Strategy,
        long_rebuy: Arc<RecordingAdjustment>,
        long_grind: Arc<RecordingAdjustment>,
        short_grind: Arc<RecordingAdjustment>,
        exits: Vec<Arc<RecordingExit>>,
    }

    impl Harness {
        fn with_provider(provider: Arc<dyn DataProvider>) -> Self {
            let long_rebuy = Arc::new(RecordingAdjustment::default());
            let long_grind = Arc::new(RecordingAdjustment::default());
            let short_grind = Arc::new(RecordingAdjustment::default());
            let exits: Vec<Arc<RecordingExit>> = [
                "long_exit_normal",
                "long_exit_pump",
                "long_exit_quick",
                "short_exit_normal",
                "short_exit_pump",
            ]
            .into_iter()
            .map(|name| Arc::new(RecordingExit::new(name)))
            .collect();

            let adjustment = AdjustmentHandlers {
                long_rebuy: long_rebuy.clone(),
                long_grind: long_grind.clone(),
                short_grind: short_grind.clone(),
            };
            let exit_handlers = ExitHandlers {
                long_normal: exits[0].clone(),
                long_pump: exits[1].clone(),
                long_quick: exits[2].clone(),
                short_normal: exits[3].clone(),
                short_pump: exits[4].clone(),
            };

            let strategy = Strategy::with_handlers(
                RuntimeConfig::default(),
                provider,
                adjustment,
                exit_handlers,
            );

            Self {
                strategy,
                long_rebuy,
                long_grind,
                short_grind,
                exits,
            }
        }

        fn new() -> Self {
            let closes = [105.0, 104.0, 103.0, 102.0, 101.0, 100.0];
            let candles = closes
                .iter()
                .enumerate()
                .map(|(i, &c)| sample_candle(i as i64, c, true))
                .collect();
            Self::with_provider(Arc::new(StaticProvider(candles)))
        }

        fn adjustment_calls(&self) -> [usize; 3] {
            [
                self.long_rebuy.calls.lock().len(),
                self.long_grind.calls.lock().len(),
                self.short_grind.calls.lock().len(),
            ]
        }

        fn exit_calls(&self) -> Vec<(&'static str, usize)> {
            self.exits
                .iter()
                .map(|h| (h.name, h.calls.lock().len()))
                .collect()
        }
    }

    fn tick_context() -> AdjustmentContext {
        AdjustmentContext {
            current_time: None,
            current_rate: 0.0,
            current_profit: 0.0,
            min_stake: None,
            max_stake: 10.0,
            current_entry_rate: 0.0,
            current_exit_rate: 0.0,
            current_entry_profit: 0.0,
            current_exit_profit: 0.0,
        }
    }

    fn exit_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()
    }

    // ── Adjustment routing ───────────────────────────────────────────────

    #[test]
    fn adjustment_calls_exactly_the_expected_handler() {
        let cases: &[(bool, &str, usize)] = &[
            // Rebuy and grind only tags
            (false, "61", 0),
            (false, "120", 1),
            // Other tags
            (true, "620", 2),
            (false, "161", 1),
            (false, "6", 1),
            (false, "81", 1),
            (false, "41", 1),
            (false, "101", 1),
            (false, "141", 1),
            (false, "999", 1),
            // Rebuy + grind tags
            (false, "61 120", 0),
            (false, "120 61", 0),
            // (Rebuy or grind) + other tags
            (false, "120 6", 1),
            (false, "61 6", 1),
            // No tags
            (false, "", 0),
        ];

        for &(is_short, tags, expected) in cases {
            let h = Harness::new();
            let t = trade(is_short, tags);
            let ctx = tick_context();

            assert_eq!(h.strategy.adjust_trade_position(&t, &ctx), None);

            let mut expected_calls = [0; 3];
            expected_calls[expected] = 1;
            assert_eq!(h.adjustment_calls(), expected_calls, "tags {tags:?} short={is_short}");

            let handler = match expected {
                0 => &h.long_rebuy,
                1 => &h.long_grind,
                _ => &h.short_grind,
            };
            let calls = handler.calls.lock();
            assert!(calls[0].saw_trade(&t), "tags {tags:?}");
            assert_eq!(calls[0].tags, t.enter_tags());
            assert_eq!(calls[0].ctx, ctx);
        }
    }

    #[test]
    fn missing_enter_tag_rebuys() {
        let h = Harness::new();
        let mut t = trade(false, "");
        t.enter_tag = None;
        h.strategy.adjust_trade_position(&t, &tick_context());
        assert_eq!(h.adjustment_calls(), [1, 0, 0]);
    }

    #[test]
    fn context_is_forwarded_verbatim() {
        let h = Harness::new();
        let ctx = AdjustmentContext {
            current_time: Some(exit_time()),
            current_rate: 101.5,
            current_profit: -0.031,
            min_stake: Some(5.0),
            max_stake: 250.0,
            current_entry_rate: 101.4,
            current_exit_rate: 101.6,
            current_entry_profit: -0.032,
            current_exit_profit: -0.030,
        };
        let t = trade(false, "120");
        h.strategy.adjust_trade_position(&t, &ctx);
        let calls = h.long_grind.calls.lock();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].saw_trade(&t));
        assert_eq!(calls[0].ctx, ctx);
        assert_eq!(calls[0].tags, vec!["120".to_string()]);
    }

    #[test]
    fn disabled_adjustment_runs_no_handler() {
        let h = Harness::new();
        h.strategy.set_position_adjustment_enabled(false);
        for tags in ["61", "120", ""] {
            let order = h
                .strategy
                .adjust_trade_position(&trade(false, tags), &tick_context());
            assert_eq!(order, None);
        }
        assert_eq!(h.strategy.adjust_trade_position(&trade(true, "620"), &tick_context()), None);
        assert_eq!(h.adjustment_calls(), [0, 0, 0]);
        assert!(h.strategy.recent_decisions().is_empty());

        h.strategy.set_position_adjustment_enabled(true);
        h.strategy.adjust_trade_position(&trade(false, "61"), &tick_context());
        assert_eq!(h.adjustment_calls(), [1, 0, 0]);
    }

    // ── Exit routing ─────────────────────────────────────────────────────

    #[test]
    fn exit_calls_exactly_the_expected_handler() {
        let cases: &[(bool, &str, &str)] = &[
            (false, "1", "long_exit_normal"),
            (false, "21", "long_exit_pump"),
            (false, "41", "long_exit_quick"),
            (true, "500", "short_exit_normal"),
            (true, "521", "short_exit_pump"),
            (false, "999", "long_exit_normal"),
        ];

        for &(is_short, tags, expected) in cases {
            let h = Harness::new();
            let t = trade(is_short, tags);
            let signal = h
                .strategy
                .custom_exit("BTC/USDT", &t, exit_time(), 105.0, 0.05)
                .unwrap();

            assert_eq!(signal, ExitSignal::exit(expected), "tags {tags:?}");
            for (name, count) in h.exit_calls() {
                let want = usize::from(name == expected);
                assert_eq!(count, want, "handler {name} for tags {tags:?}");
            }
        }
    }

    #[test]
    fn exit_handler_sees_latest_candle_and_rate() {
        let h = Harness::new();
        h.strategy
            .custom_exit("BTC/USDT", &trade(false, "21"), exit_time(), 105.0, 0.05)
            .unwrap();
        let calls = h.exits[1].calls.lock();
        assert_eq!(calls.as_slice(), &[(100.0, 105.0)]);
    }

    #[test]
    fn provider_failure_propagates_without_handler() {
        let h = Harness::with_provider(Arc::new(FailingProvider));
        let err = h
            .strategy
            .custom_exit("BTC/USDT", &trade(false, "1"), exit_time(), 105.0, 0.05)
            .unwrap_err();
        assert!(matches!(err, RouterError::Data(DataError::Unavailable(_))));
        assert!(h.exit_calls().iter().all(|(_, count)| *count == 0));

        let decisions = h.strategy.recent_decisions();
        assert_eq!(decisions.len(), 1);
        assert!(matches!(decisions[0].outcome, DecisionOutcome::Failed { .. }));
    }

    #[test]
    fn short_history_propagates_without_handler() {
        let candles = (0..3).map(|i| sample_candle(i, 100.0, true)).collect();
        let h = Harness::with_provider(Arc::new(StaticProvider(candles)));
        let err = h
            .strategy
            .custom_exit("BTC/USDT", &trade(false, "1"), exit_time(), 105.0, 0.05)
            .unwrap_err();
        assert!(matches!(
            err,
            RouterError::InsufficientHistory { available: 3, .. }
        ));
        assert!(h.exit_calls().iter().all(|(_, count)| *count == 0));
    }

    // ── Signal flags ─────────────────────────────────────────────────────

    #[test]
    fn update_signals_from_config_merges_partially() {
        const L1: &str = "long_entry_condition_1_enable";
        const L2: &str = "long_entry_condition_2_enable";
        const S501: &str = "short_entry_condition_501_enable";

        let h = Harness::new();
        let before = h.strategy.signals();
        assert_eq!(before.long_entry_signal_params.get(L2), Some(&true));
        assert_eq!(before.short_entry_signal_params.get(S501), Some(&false));

        let report = h.strategy.update_signals_from_value(&serde_json::json!({
            "long_entry_signal_params": { L1: false, L2: false },
            "short_entry_signal_params": { S501: true }
        }));
        assert_eq!(report.applied, 3);
        assert_eq!(report.changed, 3);
        assert!(!h.strategy.is_signal_enabled(TradeDirection::Long, L1));

        let report = h
            .strategy
            .update_signals_from_config(&SignalOverlay::default().with_long(L1, true));
        assert_eq!(report.changed, 1);

        let mut expected = before.clone();
        expected.long_entry_signal_params.insert(L2.to_string(), false);
        expected.short_entry_signal_params.insert(S501.to_string(), true);
        assert_eq!(h.strategy.signals(), expected);

        // The stored config keeps the initial flags.
        assert_eq!(h.strategy.config().signals, before);
    }

    #[test]
    fn unknown_condition_reads_disabled() {
        let h = Harness::new();
        assert!(!h
            .strategy
            .is_signal_enabled(TradeDirection::Short, "short_entry_condition_999_enable"));
    }

    // ── Default handlers & audit trail ───────────────────────────────────

    #[test]
    fn default_handlers_route_end_to_end() {
        let buffer = Arc::new(CandleBuffer::new(50));
        let key = CandleKey::new("BTC/USDT", "5m");
        buffer.extend(
            &key,
            [110.0, 109.0, 108.0, 107.0, 106.0, 105.0]
                .into_iter()
                .enumerate()
                .map(|(i, c)| sample_candle(i as i64 * 300_000, c, true)),
        );
        let strategy = Strategy::new(RuntimeConfig::default(), buffer);

        // Rebuy tag, 10% down: first rebuy level.
        let ctx = AdjustmentContext {
            current_rate: 90.0,
            current_profit: -0.10,
            max_stake: 1_000.0,
            ..AdjustmentContext::default()
        };
        let order = strategy.adjust_trade_position(&trade(false, "61"), &ctx);
        assert_eq!(order, Some(AdjustmentOrder::increase(100.0, "r")));

        // Pump tag at its high with falling closes: take profit.
        let mut pump = trade(false, "21");
        pump.max_rate = 105.0;
        let signal = strategy
            .custom_exit("BTC/USDT", &pump, exit_time(), 105.0, 0.05)
            .unwrap();
        assert_eq!(signal.tag.as_deref(), Some("exit_long_pump_take_profit"));
        assert_eq!(
            signal.exit_reason("21").as_deref(),
            Some("exit_long_pump_take_profit ( 21)")
        );

        let decisions = strategy.recent_decisions();
        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[0].handler.as_deref(), Some("long_rebuy_adjust_trade_position"));
        assert_eq!(decisions[1].handler.as_deref(), Some("long_exit_pump"));
    }

    #[test]
    fn audit_trail_is_bounded() {
        let h = Harness::new();
        for _ in 0..(MAX_RECENT_DECISIONS + 5) {
            h.strategy.adjust_trade_position(&trade(false, "120"), &tick_context());
        }
        assert_eq!(h.strategy.recent_decisions().len(), MAX_RECENT_DECISIONS);
    }
}
