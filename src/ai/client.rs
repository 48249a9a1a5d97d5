// =============================================================================
// Inference Client — contract with the external AI layer
// =============================================================================
//
// The inference service receives a numeric feature vector for one market and
// answers with a directional bias and a confidence.  It never sees balances,
// tokens or session state beyond the opaque session identifier.
//
//   POST {endpoint}/infer
//   { "market": "R_100", "session_id": "...", "strategy_version": "rules_v1",
//     "features": { "rsi": .., "ema_fast": .., "ema_slow": .., "volatility": ..,
//                   "momentum": .., "atr": .. } }
//
//   200 { "signal_bias": "CALL", "confidence": 0.72, "regime": "TRENDING",
//         "model_version": "...", "reason": "..." }
// =============================================================================

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::indicators::IndicatorValues;
use crate::runtime_config::AiConfig;
use crate::types::{Signal, SignalType};

/// Reason used when the service does not name one.
pub const DEFAULT_AI_REASON: &str = "AI_INFERENCE";

/// Response body of the inference service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
    /// Directional bias.  Absent means the model has no opinion.
    #[serde(default)]
    pub signal_bias: Option<SignalType>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Anything that can turn an indicator snapshot into an inference response.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Request an inference.  `Ok(None)` means the service answered without
    /// a usable payload.
    async fn infer(
        &self,
        indicators: &IndicatorValues,
        market: &str,
        session_id: &str,
    ) -> Result<Option<InferenceResponse>>;

    /// Convert a response into a signal, or `None` when it carries no
    /// direction or a non-finite confidence.
    fn to_signal(
        &self,
        response: &InferenceResponse,
        market: &str,
        now: DateTime<Utc>,
        expiry_secs: i64,
    ) -> Option<Signal> {
        let bias = response.signal_bias?;
        if !response.confidence.is_finite() {
            return None;
        }
        let reason = response
            .reason
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_AI_REASON);
        Some(Signal::new(
            bias,
            response.confidence,
            reason,
            market,
            now,
            expiry_secs,
        ))
    }
}

// =============================================================================
// HTTP implementation
// =============================================================================

#[derive(Serialize)]
struct FeatureVector {
    rsi: f64,
    ema_fast: f64,
    ema_slow: f64,
    volatility: f64,
    momentum: f64,
    atr: f64,
}

impl From<&IndicatorValues> for FeatureVector {
    fn from(v: &IndicatorValues) -> Self {
        Self {
            rsi: v.rsi,
            ema_fast: v.ema_fast,
            ema_slow: v.ema_slow,
            volatility: v.volatility,
            momentum: v.momentum,
            atr: v.atr,
        }
    }
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    market: &'a str,
    session_id: &'a str,
    strategy_version: &'a str,
    features: FeatureVector,
}

/// Inference client speaking JSON over HTTP.
#[derive(Clone)]
pub struct HttpInferenceClient {
    base_url: String,
    strategy_version: String,
    client: reqwest::Client,
}

impl HttpInferenceClient {
    /// Build a client for `base_url`.  The request timeout is the service's
    /// latency bound; the engine itself never times out an inference.
    pub fn new(
        base_url: impl Into<String>,
        strategy_version: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            bail!("inference endpoint is empty");
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build inference HTTP client")?;

        debug!(base_url = %base_url, "HttpInferenceClient initialised");

        Ok(Self {
            base_url,
            strategy_version: strategy_version.into(),
            client,
        })
    }

    /// Build from config.  Returns `Ok(None)` when no endpoint is configured.
    pub fn from_config(config: &AiConfig) -> Result<Option<Self>> {
        let Some(endpoint) = config.endpoint.as_deref() else {
            return Ok(None);
        };
        Self::new(
            endpoint,
            config.strategy_version.clone(),
            Duration::from_millis(config.request_timeout_ms),
        )
        .map(Some)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /health.  `Ok(true)` when the service answers 2xx.
    pub async fn health(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;
        Ok(resp.status().is_success())
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    fn name(&self) -> &'static str {
        "http"
    }

    #[instrument(skip(self, indicators), name = "inference::infer")]
    async fn infer(
        &self,
        indicators: &IndicatorValues,
        market: &str,
        session_id: &str,
    ) -> Result<Option<InferenceResponse>> {
        let url = format!("{}/infer", self.base_url);
        let body = InferenceRequest {
            market,
            session_id,
            strategy_version: &self.strategy_version,
            features: FeatureVector::from(indicators),
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {url} failed"))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("inference service returned {status}: {text}");
        }

        let response: Option<InferenceResponse> = resp
            .json()
            .await
            .context("malformed inference response")?;

        debug!(market = %market, has_response = response.is_some(), "inference completed");
        Ok(response)
    }
}
