// =============================================================================
// Signal Engine — tick ingestion to published signals
// =============================================================================
//
// Pipeline per evaluated market:
//   1. Append quotes to the bounded price history
//   2. Compute the indicator snapshot            -> `indicators` event
//   3. Roll the EMA crossover state forward
//   4. Run the rule evaluator                    -> `signal` event
//   5. If the session enables AI and allows the market, dispatch the
//      augmentation task
//      (`ai_signal` / `ai_fallback` arrive later, on their own)
//
// Steps 1-4 run synchronously on the caller's thread; nothing can interleave
// with a market mid-evaluation.  The engine owns all per-market state.
// =============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::ai::{AiAugmenter, AugmentationRequest, InferenceClient};
use crate::events::{EngineEvent, EventPublisher};
use crate::indicators::{IndicatorPeriods, IndicatorValues};
use crate::market_data::PriceHistory;
use crate::runtime_config::{EngineConfig, SessionConfig};
use crate::signals::{evaluator, CrossoverTracker, EvaluationPolicy};
use crate::types::{Signal, Tick};

/// Introspection snapshot: tracked markets and their history lengths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub markets: BTreeMap<String, usize>,
}

pub struct SignalEngine {
    history: PriceHistory,
    crossovers: CrossoverTracker,
    periods: IndicatorPeriods,
    policy: EvaluationPolicy,
    publisher: Arc<EventPublisher>,
    augmenter: Option<AiAugmenter>,
    feature_version: String,
}

impl SignalEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            history: PriceHistory::new(config.history_capacity),
            crossovers: CrossoverTracker::new(),
            periods: IndicatorPeriods::from(config),
            policy: EvaluationPolicy {
                default_min_confidence: config.default_min_confidence,
                expiry_secs: config.signal_expiry_secs,
            },
            publisher: Arc::new(EventPublisher::new(config.event_channel_capacity)),
            augmenter: None,
            feature_version: config.ai.feature_version.clone(),
        }
    }

    /// Attach the inference collaborator used when a session enables AI.
    pub fn with_inference(mut self, client: Arc<dyn InferenceClient>) -> Self {
        self.augmenter = Some(AiAugmenter::new(
            client,
            Arc::clone(&self.publisher),
            self.feature_version.clone(),
            self.policy.expiry_secs,
        ));
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.publisher.subscribe()
    }

    pub fn publisher(&self) -> &Arc<EventPublisher> {
        &self.publisher
    }

    /// Ingest a single tick.
    pub fn process_tick(&mut self, tick: &Tick, session: &SessionConfig) -> Option<Signal> {
        self.generate_signal(std::slice::from_ref(tick), session)
    }

    /// Ingest a batch of ticks.  Quotes are appended per market in arrival
    /// order, then each market in the batch is evaluated once, in order of
    /// first appearance.  Returns the highest-confidence signal produced
    /// (the earliest one on ties), or `None` for an empty batch.
    pub fn generate_signal(&mut self, ticks: &[Tick], session: &SessionConfig) -> Option<Signal> {
        if ticks.is_empty() {
            debug!("empty tick batch");
            return None;
        }

        let mut batches: Vec<(&str, Vec<f64>)> = Vec::new();
        for tick in ticks {
            if !tick.quote.is_finite() {
                debug!(market = %tick.market, quote = tick.quote, "skipping non-finite quote");
                continue;
            }
            match batches.iter_mut().find(|(m, _)| *m == tick.market) {
                Some((_, prices)) => prices.push(tick.quote),
                None => batches.push((tick.market.as_str(), vec![tick.quote])),
            }
        }

        let mut best: Option<Signal> = None;
        for (market, prices) in batches {
            self.history.append(market, &prices);
            if let Some(signal) = self.evaluate_market(market, session) {
                if best.as_ref().map_or(true, |b| signal.confidence > b.confidence) {
                    best = Some(signal);
                }
            }
        }
        best
    }

    /// Forget all state for `market`.
    pub fn clear_market(&mut self, market: &str) {
        let had_history = self.history.clear(market);
        let had_ema = self.crossovers.clear(market);
        if had_history || had_ema {
            info!(market = %market, "market state cleared");
        }
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            markets: self.history.sizes(),
        }
    }

    fn evaluate_market(&mut self, market: &str, session: &SessionConfig) -> Option<Signal> {
        let window = self.history.window(market);
        let values = IndicatorValues::compute(&window, &self.periods);
        let crossover = self.crossovers.observe(market, values.ema_fast, values.ema_slow);

        debug!(
            market = %market,
            history = window.len(),
            rsi = values.rsi,
            ema_fast = values.ema_fast,
            ema_slow = values.ema_slow,
            volatility = values.volatility,
            "indicators computed"
        );
        self.publisher.publish(EngineEvent::Indicators {
            market: market.to_string(),
            values,
        });

        let signal = evaluator::evaluate(market, &values, &crossover, session, &self.policy, Utc::now());
        if let Some(signal) = &signal {
            info!(
                market = %market,
                signal_type = %signal.signal_type,
                reason = %signal.reason,
                confidence = signal.confidence,
                "signal emitted"
            );
            self.publisher.publish(EngineEvent::Signal(signal.clone()));
        }

        if session.use_ai && session.allows_market(market) {
            self.dispatch_ai(market, values, session);
        }

        signal
    }

    fn dispatch_ai(&self, market: &str, values: IndicatorValues, session: &SessionConfig) {
        let Some(augmenter) = &self.augmenter else {
            warn!(market = %market, "AI requested but no inference client configured");
            self.publisher.publish(EngineEvent::AiFallback {
                market: market.to_string(),
                reason: "inference client not configured".to_string(),
            });
            return;
        };

        augmenter.dispatch(AugmentationRequest {
            market: market.to_string(),
            session_id: session.session_id().to_string(),
            indicators: values,
            min_confidence: session.ai_min_confidence_or(self.policy.default_min_confidence),
        });
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::InferenceResponse;
    use crate::events::EventKind;
    use crate::types::SignalType;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::time::Duration;

    fn engine() -> SignalEngine {
        SignalEngine::new(&EngineConfig::default())
    }

    fn ticks(market: &str, prices: &[f64]) -> Vec<Tick> {
        prices.iter().map(|&p| Tick::new(market, p)).collect()
    }

    fn drain(rx: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    struct FailingClient;

    #[async_trait]
    impl InferenceClient for FailingClient {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn infer(
            &self,
            _indicators: &IndicatorValues,
            _market: &str,
            _session_id: &str,
        ) -> Result<Option<InferenceResponse>> {
            Err(anyhow!("service unavailable"))
        }
    }

    struct SlowCallClient;

    #[async_trait]
    impl InferenceClient for SlowCallClient {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn infer(
            &self,
            _indicators: &IndicatorValues,
            _market: &str,
            _session_id: &str,
        ) -> Result<Option<InferenceResponse>> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(Some(InferenceResponse {
                signal_bias: Some(SignalType::Call),
                confidence: 0.9,
                regime: Some("TRENDING".into()),
                model_version: Some("slow_v1".into()),
                reason: Some("ML_SIGNAL_CALL".into()),
            }))
        }
    }

    #[test]
    fn empty_batch_returns_none() {
        let mut engine = engine();
        assert!(engine.generate_signal(&[], &SessionConfig::default()).is_none());
        assert!(engine.stats().markets.is_empty());
    }

    #[test]
    fn non_finite_quotes_are_skipped() {
        let mut engine = engine();
        let batch = vec![Tick::new("R_100", f64::NAN), Tick::new("R_100", f64::INFINITY)];
        assert!(engine.generate_signal(&batch, &SessionConfig::default()).is_none());
        assert_eq!(engine.stats().markets.get("R_100"), None);
    }

    #[test]
    fn downtrend_yields_rsi_oversold_call() {
        let mut engine = engine();
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - 2.0 * i as f64).collect();
        let session = SessionConfig {
            min_confidence: Some(0.6),
            ..Default::default()
        };

        let signal = engine.generate_signal(&ticks("R_100", &prices), &session).unwrap();
        assert_eq!(signal.signal_type, SignalType::Call);
        assert_eq!(signal.reason, "RSI_OVERSOLD");
        assert!(signal.confidence >= 0.6);
        assert!(signal.confidence <= 1.0);
    }

    #[test]
    fn first_evaluation_never_reports_crossover() {
        // A fresh market whose single snapshot has fast far above slow.
        let mut engine = engine();
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let signal = engine.generate_signal(&ticks("R_100", &prices), &SessionConfig::default());
        assert!(signal.map_or(true, |s| !s.reason.starts_with("EMA_CROSS")));
    }

    #[test]
    fn rising_prices_emit_ema_cross_up() {
        let mut engine = engine();
        let session = SessionConfig::default();

        // Establish fast < slow with a downtrend in one batch.
        let down: Vec<f64> = (0..30).map(|i| 130.0 - i as f64).collect();
        engine.generate_signal(&ticks("R_100", &down), &session);

        let mut price = 101.0;
        let mut crossed = None;
        for _ in 0..40 {
            price += 2.0;
            if let Some(s) = engine.process_tick(&Tick::new("R_100", price), &session) {
                if s.reason == "EMA_CROSS_UP" {
                    crossed = Some(s);
                    break;
                }
            }
        }

        let signal = crossed.expect("EMA_CROSS_UP within 40 rising ticks");
        assert_eq!(signal.signal_type, SignalType::Call);
        assert!(signal.confidence >= 0.6);
        let technicals = signal.metadata.unwrap().technicals;
        assert!(technicals.ema_fast > technicals.ema_slow);
    }

    #[test]
    fn falling_prices_emit_ema_cross_down() {
        let mut engine = engine();
        let session = SessionConfig::default();

        let up: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        engine.generate_signal(&ticks("R_100", &up), &session);

        let mut price = 129.0;
        let mut crossed = None;
        for _ in 0..40 {
            price -= 2.0;
            if let Some(s) = engine.process_tick(&Tick::new("R_100", price), &session) {
                if s.reason == "EMA_CROSS_DOWN" {
                    crossed = Some(s);
                    break;
                }
            }
        }

        let signal = crossed.expect("EMA_CROSS_DOWN within 40 falling ticks");
        assert_eq!(signal.signal_type, SignalType::Put);
        let technicals = signal.metadata.unwrap().technicals;
        assert!(technicals.ema_fast < technicals.ema_slow);
    }

    #[test]
    fn excluded_market_never_signals() {
        let mut engine = engine();
        let session = SessionConfig {
            allowed_markets: Some(vec!["R_50".into()]),
            ..Default::default()
        };
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - 2.0 * i as f64).collect();
        assert!(engine.generate_signal(&ticks("R_100", &prices), &session).is_none());
        // History is still tracked for the excluded market.
        assert_eq!(engine.stats().markets.get("R_100"), Some(&15));
    }

    #[tokio::test]
    async fn excluded_market_skips_ai_augmentation() {
        let mut engine = engine().with_inference(Arc::new(SlowCallClient));
        let mut rx = engine.subscribe();
        let session = SessionConfig {
            allowed_markets: Some(vec!["R_50".into()]),
            use_ai: true,
            ..Default::default()
        };

        assert!(engine.process_tick(&Tick::new("R_100", 100.0), &session).is_none());

        tokio::time::sleep(Duration::from_millis(150)).await;
        let kinds: Vec<EventKind> = drain(&mut rx).iter().map(EngineEvent::kind).collect();
        assert_eq!(kinds, vec![EventKind::Indicators]);
        assert_eq!(engine.publisher().published(EventKind::AiSignal), 0);
        assert_eq!(engine.publisher().published(EventKind::AiFallback), 0);
        assert_eq!(engine.stats().markets.get("R_100"), Some(&1));
    }

    #[test]
    fn history_is_capped_per_market() {
        let mut engine = engine();
        let prices: Vec<f64> = (0..150).map(|i| 100.0 + (i % 7) as f64).collect();
        engine.generate_signal(&ticks("R_100", &prices), &SessionConfig::default());
        engine.process_tick(&Tick::new("R_25", 10.0), &SessionConfig::default());

        let stats = engine.stats();
        assert_eq!(stats.markets.get("R_100"), Some(&100));
        assert_eq!(stats.markets.get("R_25"), Some(&1));
    }

    #[test]
    fn clear_market_resets_state() {
        let mut engine = engine();
        engine.generate_signal(&ticks("R_100", &[1.0, 2.0, 3.0]), &SessionConfig::default());
        engine.clear_market("R_100");
        assert!(engine.stats().markets.is_empty());
    }

    #[test]
    fn indicators_published_even_without_signal() {
        let mut engine = engine();
        let mut rx = engine.subscribe();
        let signal = engine.process_tick(&Tick::new("R_100", 100.0), &SessionConfig::default());
        assert!(signal.is_none());

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), EventKind::Indicators);
        assert_eq!(events[0].market(), "R_100");
    }

    #[test]
    fn batch_evaluates_each_market_once_and_returns_strongest() {
        let mut engine = engine();
        let mut rx = engine.subscribe();

        // R_10 mildly oversold (filtered by gate), R_100 strongly oversold.
        let mut batch = ticks("R_100", &(0..15).map(|i| 100.0 - 2.0 * i as f64).collect::<Vec<_>>());
        batch.insert(0, Tick::new("R_10", 50.0));

        let signal = engine.generate_signal(&batch, &SessionConfig::default()).unwrap();
        assert_eq!(signal.market, "R_100");

        let events = drain(&mut rx);
        let indicator_markets: Vec<&str> = events
            .iter()
            .filter(|e| e.kind() == EventKind::Indicators)
            .map(|e| e.market())
            .collect();
        assert_eq!(indicator_markets, vec!["R_10", "R_100"]);
        assert_eq!(
            events.iter().filter(|e| e.kind() == EventKind::Signal).count(),
            1
        );
    }

    #[test]
    fn ai_without_client_falls_back_synchronously() {
        let mut engine = engine();
        let mut rx = engine.subscribe();
        let session = SessionConfig {
            use_ai: true,
            ..Default::default()
        };
        engine.process_tick(&Tick::new("R_100", 100.0), &session);

        let kinds: Vec<EventKind> = drain(&mut rx).iter().map(EngineEvent::kind).collect();
        assert_eq!(kinds, vec![EventKind::Indicators, EventKind::AiFallback]);
    }

    #[tokio::test]
    async fn failing_ai_does_not_affect_rule_signal() {
        let mut engine = engine().with_inference(Arc::new(FailingClient));
        let mut rx = engine.subscribe();
        let session = SessionConfig {
            use_ai: true,
            ai_session_id: Some("sess-42".into()),
            ..Default::default()
        };
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - 2.0 * i as f64).collect();

        let signal = engine.generate_signal(&ticks("R_100", &prices), &session).unwrap();
        assert_eq!(signal.reason, "RSI_OVERSOLD");

        // The rule-based events are already published before the AI task runs.
        let first = drain(&mut rx);
        let kinds: Vec<EventKind> = first.iter().map(EngineEvent::kind).collect();
        assert_eq!(kinds, vec![EventKind::Indicators, EventKind::Signal]);
        assert_eq!(first[1], EngineEvent::Signal(signal));

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("AI outcome within 1s")
            .unwrap();
        match event {
            EngineEvent::AiFallback { market, reason } => {
                assert_eq!(market, "R_100");
                assert!(reason.contains("service unavailable"));
            }
            other => panic!("unexpected event {other:?}"),
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(drain(&mut rx).is_empty());
        assert_eq!(engine.publisher().published(EventKind::AiSignal), 0);
        assert_eq!(engine.publisher().published(EventKind::AiFallback), 1);
    }

    #[tokio::test]
    async fn slow_ai_signal_arrives_after_primary_return() {
        let mut engine = engine().with_inference(Arc::new(SlowCallClient));
        let mut rx = engine.subscribe();
        let session = SessionConfig {
            use_ai: true,
            ..Default::default()
        };

        let started = std::time::Instant::now();
        engine.process_tick(&Tick::new("R_100", 100.0), &session);
        assert!(started.elapsed() < Duration::from_millis(50));

        let mut ai_signal = None;
        while ai_signal.is_none() {
            let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .expect("event within 1s")
                .unwrap();
            if let EngineEvent::AiSignal { signal, inference } = event {
                assert_eq!(inference.model_version.as_deref(), Some("slow_v1"));
                ai_signal = Some(signal);
            }
        }

        let signal = ai_signal.unwrap();
        assert_eq!(signal.signal_type, SignalType::Call);
        let meta = signal.metadata.unwrap();
        assert_eq!(meta.feature_version.as_deref(), Some("v1"));
        assert_eq!(meta.technicals.ema_fast, 100.0);
    }
}
