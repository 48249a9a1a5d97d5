// =============================================================================
// Shared types used across the signal engine
// =============================================================================

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::ai::InferenceResponse;
use crate::indicators::IndicatorValues;

/// One observed price update for a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub market: String,
    pub quote: f64,
    /// Feed timestamp (epoch seconds), when the source supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<i64>,
}

impl Tick {
    pub fn new(market: impl Into<String>, quote: f64) -> Self {
        Self {
            market: market.into(),
            quote,
            epoch: None,
        }
    }
}

/// Direction of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Call,
    Put,
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "CALL"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

/// Audit payload attached to every emitted signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMetadata {
    /// Indicator snapshot that produced the signal.
    pub technicals: IndicatorValues,
    /// Raw inference response (AI signals only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_inference: Option<InferenceResponse>,
    /// Feature-set version used for inference (AI signals only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_version: Option<String>,
}

impl SignalMetadata {
    pub fn technicals(values: IndicatorValues) -> Self {
        Self {
            technicals: values,
            ai_inference: None,
            feature_version: None,
        }
    }
}

/// A directional trading signal.  Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    /// Always within [0, 1].
    pub confidence: f64,
    pub reason: String,
    pub market: String,
    /// ISO 8601 creation time.
    pub timestamp: String,
    /// ISO 8601 expiry time.
    pub expiry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SignalMetadata>,
}

impl Signal {
    /// Build a signal stamped at `now`, expiring `expiry_secs` later.
    /// Confidence is clamped to [0, 1]; NaN becomes 0.
    pub fn new(
        signal_type: SignalType,
        confidence: f64,
        reason: impl Into<String>,
        market: impl Into<String>,
        now: DateTime<Utc>,
        expiry_secs: i64,
    ) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            signal_type,
            confidence,
            reason: reason.into(),
            market: market.into(),
            timestamp: now.to_rfc3339(),
            expiry: (now + Duration::seconds(expiry_secs)).to_rfc3339(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: SignalMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
