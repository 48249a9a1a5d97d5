// =============================================================================
// AI Augmentation Pipeline — best-effort, non-blocking second opinion
// =============================================================================
//
// Each dispatch spawns one task that forwards an indicator snapshot to the
// inference client and terminates in exactly one event:
//   ai_signal    response converted, gated, and published with the raw payload
//   ai_fallback  inference error, empty/neutral response, or below the gate
//
// Dispatch returns immediately.  Tasks are never awaited, retried or
// cancelled, and they only read the snapshot they were handed.
// =============================================================================

use std::sync::Arc;

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::ai::{InferenceClient, InferenceResponse};
use crate::events::{EngineEvent, EventPublisher};
use crate::indicators::IndicatorValues;
use crate::types::{Signal, SignalMetadata};

/// One augmentation job.
#[derive(Debug, Clone)]
pub struct AugmentationRequest {
    pub market: String,
    pub session_id: String,
    pub indicators: IndicatorValues,
    pub min_confidence: f64,
}

pub struct AiAugmenter {
    client: Arc<dyn InferenceClient>,
    publisher: Arc<EventPublisher>,
    feature_version: String,
    expiry_secs: i64,
}

impl AiAugmenter {
    pub fn new(
        client: Arc<dyn InferenceClient>,
        publisher: Arc<EventPublisher>,
        feature_version: impl Into<String>,
        expiry_secs: i64,
    ) -> Self {
        Self {
            client,
            publisher,
            feature_version: feature_version.into(),
            expiry_secs,
        }
    }

    /// Spawn the augmentation task on the current tokio runtime.
    ///
    /// Without a runtime an `ai_fallback` is published synchronously and
    /// `None` is returned.
    pub fn dispatch(&self, request: AugmentationRequest) -> Option<JoinHandle<()>> {
        let Ok(handle) = Handle::try_current() else {
            warn!(market = %request.market, "AI dispatch skipped: no async runtime");
            self.publisher.publish(EngineEvent::AiFallback {
                market: request.market,
                reason: "no async runtime available".to_string(),
            });
            return None;
        };

        debug!(
            market = %request.market,
            client = self.client.name(),
            "dispatching AI augmentation"
        );

        let client = Arc::clone(&self.client);
        let publisher = Arc::clone(&self.publisher);
        let feature_version = self.feature_version.clone();
        let expiry_secs = self.expiry_secs;

        Some(handle.spawn(async move {
            let market = request.market.clone();
            let event = match augment(client.as_ref(), request, &feature_version, expiry_secs).await {
                Ok((signal, inference)) => {
                    info!(
                        market = %signal.market,
                        signal_type = %signal.signal_type,
                        confidence = signal.confidence,
                        "AI signal emitted"
                    );
                    EngineEvent::AiSignal { signal, inference }
                }
                Err(reason) => {
                    warn!(market = %market, reason = %reason, "AI augmentation fell back");
                    EngineEvent::AiFallback { market, reason }
                }
            };
            publisher.publish(event);
        }))
    }
}

/// Run one inference and turn it into a gated signal, or a fallback reason.
async fn augment(
    client: &dyn InferenceClient,
    request: AugmentationRequest,
    feature_version: &str,
    expiry_secs: i64,
) -> Result<(Signal, InferenceResponse), String> {
    let AugmentationRequest {
        market,
        session_id,
        indicators,
        min_confidence,
    } = request;

    let response = client
        .infer(&indicators, &market, &session_id)
        .await
        .map_err(|e| format!("inference failed: {e:#}"))?
        .ok_or_else(|| "inference returned no response".to_string())?;

    let signal = client
        .to_signal(&response, &market, Utc::now(), expiry_secs)
        .ok_or_else(|| "inference response has no convertible signal".to_string())?;

    if signal.confidence < min_confidence {
        return Err(format!(
            "AI confidence {:.3} below threshold {:.3}",
            signal.confidence, min_confidence
        ));
    }

    let signal = signal.with_metadata(SignalMetadata {
        technicals: indicators,
        ai_inference: Some(response.clone()),
        feature_version: Some(feature_version.to_string()),
    });

    Ok((signal, response))
}
