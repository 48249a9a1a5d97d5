// =============================================================================
// Signal Evaluator — rule engine over an indicator snapshot
// =============================================================================
//
// Rules, in order (later matches override earlier ones):
//   1. RSI < 30                -> CALL  conf = (30 - rsi) / 30 * 0.8 + 0.2
//   2. RSI > 70                -> PUT   conf = (rsi - 70) / 30 * 0.8 + 0.2
//   3. bullish EMA crossover   -> CALL  conf = min(0.95, 0.7 + |momentum| * 2)
//   4. bearish EMA crossover   -> PUT   conf = min(0.95, 0.7 + |momentum| * 2)
//   5. volatility > 0.02       -> conf *= 0.9
//   6. gate: allow-list, min confidence
//   7. clamp to [0, 1]
// =============================================================================

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::indicators::IndicatorValues;
use crate::runtime_config::SessionConfig;
use crate::signals::EmaCrossover;
use crate::types::{Signal, SignalMetadata, SignalType};

pub const RSI_OVERSOLD: f64 = 30.0;
pub const RSI_OVERBOUGHT: f64 = 70.0;
pub const HIGH_VOLATILITY: f64 = 0.02;
pub const VOLATILITY_DAMPENING: f64 = 0.9;
pub const CROSSOVER_BASE_CONFIDENCE: f64 = 0.7;
pub const CROSSOVER_MAX_CONFIDENCE: f64 = 0.95;

/// Rule that produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalReason {
    RsiOversold,
    RsiOverbought,
    EmaCrossUp,
    EmaCrossDown,
}

impl SignalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RsiOversold => "RSI_OVERSOLD",
            Self::RsiOverbought => "RSI_OVERBOUGHT",
            Self::EmaCrossUp => "EMA_CROSS_UP",
            Self::EmaCrossDown => "EMA_CROSS_DOWN",
        }
    }

    pub fn direction(&self) -> SignalType {
        match self {
            Self::RsiOversold | Self::EmaCrossUp => SignalType::Call,
            Self::RsiOverbought | Self::EmaCrossDown => SignalType::Put,
        }
    }
}

impl std::fmt::Display for SignalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy parameters the evaluator needs beyond the session.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationPolicy {
    pub default_min_confidence: f64,
    pub expiry_secs: i64,
}

impl Default for EvaluationPolicy {
    fn default() -> Self {
        Self {
            default_min_confidence: 0.6,
            expiry_secs: 60,
        }
    }
}

/// Pick the winning rule and its raw (pre-dampening) confidence.
pub fn candidate(values: &IndicatorValues, crossover: &EmaCrossover) -> Option<(SignalReason, f64)> {
    let mut picked = None;

    if values.rsi < RSI_OVERSOLD {
        picked = Some((
            SignalReason::RsiOversold,
            (RSI_OVERSOLD - values.rsi) / 30.0 * 0.8 + 0.2,
        ));
    } else if values.rsi > RSI_OVERBOUGHT {
        picked = Some((
            SignalReason::RsiOverbought,
            (values.rsi - RSI_OVERBOUGHT) / 30.0 * 0.8 + 0.2,
        ));
    }

    let cross_confidence =
        (CROSSOVER_BASE_CONFIDENCE + values.momentum.abs() * 2.0).min(CROSSOVER_MAX_CONFIDENCE);
    if crossover.is_bullish() {
        picked = Some((SignalReason::EmaCrossUp, cross_confidence));
    } else if crossover.is_bearish() {
        picked = Some((SignalReason::EmaCrossDown, cross_confidence));
    }

    picked
}

/// Evaluate one market's snapshot into a signal, or `None` when no rule
/// fires or the session policy rejects the result.
pub fn evaluate(
    market: &str,
    values: &IndicatorValues,
    crossover: &EmaCrossover,
    session: &SessionConfig,
    policy: &EvaluationPolicy,
    now: DateTime<Utc>,
) -> Option<Signal> {
    if !session.allows_market(market) {
        debug!(market = %market, "market not in allow-list");
        return None;
    }

    let (reason, mut confidence) = candidate(values, crossover)?;

    if values.volatility > HIGH_VOLATILITY {
        confidence *= VOLATILITY_DAMPENING;
    }

    let min_confidence = session.min_confidence_or(policy.default_min_confidence);
    if !confidence.is_finite() || confidence < min_confidence {
        debug!(
            market = %market,
            reason = %reason,
            confidence,
            min_confidence,
            "signal below confidence gate"
        );
        return None;
    }

    let signal = Signal::new(
        reason.direction(),
        confidence,
        reason.as_str(),
        market,
        now,
        policy.expiry_secs,
    )
    .with_metadata(SignalMetadata::technicals(*values));

    Some(signal)
}
