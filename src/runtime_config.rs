// =============================================================================
// Runtime Configuration — engine settings and per-call session policy
// =============================================================================
//
// `EngineConfig` holds the process-wide tunables (indicator periods, history
// capacity, AI client settings).  It is loaded from JSON and persisted with an
// atomic tmp + rename so a crash never leaves a half-written file.  All
// fields carry `#[serde(default)]` so that adding new fields never breaks
// loading an older config file.
//
// `SessionConfig` is the policy object a caller supplies with every
// evaluation: allowed markets, confidence gates and the AI toggle.  The
// engine only ever reads it.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Environment variable overriding [`AiConfig::endpoint`].
pub const ENV_AI_ENDPOINT: &str = "TRADERMIND_AI_ENDPOINT";
/// Environment variable overriding [`EngineConfig::default_min_confidence`].
pub const ENV_MIN_CONFIDENCE: &str = "TRADERMIND_MIN_CONFIDENCE";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_history_capacity() -> usize {
    100
}

fn default_ema_fast_period() -> usize {
    9
}

fn default_ema_slow_period() -> usize {
    21
}

fn default_sma_fast_period() -> usize {
    10
}

fn default_sma_slow_period() -> usize {
    20
}

fn default_rsi_period() -> usize {
    14
}

fn default_atr_period() -> usize {
    14
}

fn default_signal_expiry_secs() -> i64 {
    60
}

fn default_min_confidence() -> f64 {
    0.6
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_strategy_version() -> String {
    "rules_v1".to_string()
}

fn default_feature_version() -> String {
    "v1".to_string()
}

// =============================================================================
// AiConfig
// =============================================================================

/// Settings for the external inference collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Base URL of the inference service, e.g. `http://localhost:8000`.
    /// `None` leaves the engine without an inference client.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Per-request latency bound enforced by the HTTP client.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Strategy identifier forwarded with every inference request.
    #[serde(default = "default_strategy_version")]
    pub strategy_version: String,

    /// Feature-set version stamped on AI signal metadata.
    #[serde(default = "default_feature_version")]
    pub feature_version: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            request_timeout_ms: default_request_timeout_ms(),
            strategy_version: default_strategy_version(),
            feature_version: default_feature_version(),
        }
    }
}

// =============================================================================
// EngineConfig
// =============================================================================

/// Top-level configuration for the signal engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    // --- Price history -------------------------------------------------------

    /// Maximum number of prices retained per market.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    // --- Indicator periods ---------------------------------------------------

    #[serde(default = "default_ema_fast_period")]
    pub ema_fast_period: usize,

    #[serde(default = "default_ema_slow_period")]
    pub ema_slow_period: usize,

    #[serde(default = "default_sma_fast_period")]
    pub sma_fast_period: usize,

    #[serde(default = "default_sma_slow_period")]
    pub sma_slow_period: usize,

    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    #[serde(default = "default_atr_period")]
    pub atr_period: usize,

    // --- Signal policy -------------------------------------------------------

    /// Seconds between a signal's timestamp and its expiry.
    #[serde(default = "default_signal_expiry_secs")]
    pub signal_expiry_secs: i64,

    /// Confidence gate used when the session does not supply one.
    #[serde(default = "default_min_confidence")]
    pub default_min_confidence: f64,

    // --- Events --------------------------------------------------------------

    /// Buffer size of the broadcast channel behind the event publisher.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    // --- AI augmentation -----------------------------------------------------

    #[serde(default)]
    pub ai: AiConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            ema_fast_period: default_ema_fast_period(),
            ema_slow_period: default_ema_slow_period(),
            sma_fast_period: default_sma_fast_period(),
            sma_slow_period: default_sma_slow_period(),
            rsi_period: default_rsi_period(),
            atr_period: default_atr_period(),
            signal_expiry_secs: default_signal_expiry_secs(),
            default_min_confidence: default_min_confidence(),
            event_channel_capacity: default_event_channel_capacity(),
            ai: AiConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", path.display()))?;

        info!(
            path = %path.display(),
            history_capacity = config.history_capacity,
            ai_endpoint = ?config.ai.endpoint,
            "engine config loaded"
        );

        Ok(config)
    }

    /// Persist the configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise engine config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "engine config saved (atomic)");
        Ok(())
    }

    /// Apply environment overrides on top of the loaded values.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_AI_ENDPOINT).ok(),
            std::env::var(ENV_MIN_CONFIDENCE).ok(),
        );
    }

    fn apply_overrides(&mut self, endpoint: Option<String>, min_confidence: Option<String>) {
        if let Some(endpoint) = endpoint {
            let endpoint = endpoint.trim();
            self.ai.endpoint = (!endpoint.is_empty()).then(|| endpoint.to_string());
        }

        if let Some(raw) = min_confidence {
            match raw.trim().parse::<f64>() {
                Ok(v) if (0.0..=1.0).contains(&v) => self.default_min_confidence = v,
                _ => warn!(value = %raw, "ignoring invalid {ENV_MIN_CONFIDENCE}"),
            }
        }
    }
}

// =============================================================================
// SessionConfig
// =============================================================================

/// Policy supplied by the caller with every evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Markets allowed to produce signals. `None` or empty allows all.
    #[serde(default)]
    pub allowed_markets: Option<Vec<String>>,

    /// Minimum confidence for rule-based signals. `None` uses the engine
    /// default.
    #[serde(default)]
    pub min_confidence: Option<f64>,

    /// Dispatch the AI augmentation path for each evaluation.
    #[serde(default)]
    pub use_ai: bool,

    /// Session identifier forwarded to the inference service.
    #[serde(default)]
    pub ai_session_id: Option<String>,

    /// Minimum confidence for AI signals. `None` follows `min_confidence`.
    #[serde(default)]
    pub ai_min_confidence: Option<f64>,
}

impl SessionConfig {
    /// Whether `market` passes the allow-list.
    pub fn allows_market(&self, market: &str) -> bool {
        match &self.allowed_markets {
            Some(list) if !list.is_empty() => list.iter().any(|m| m == market),
            _ => true,
        }
    }

    /// Effective rule-based gate.
    pub fn min_confidence_or(&self, default: f64) -> f64 {
        self.min_confidence.unwrap_or(default)
    }

    /// Effective AI gate.
    pub fn ai_min_confidence_or(&self, default: f64) -> f64 {
        self.ai_min_confidence
            .unwrap_or_else(|| self.min_confidence_or(default))
    }

    /// Session identifier, or an empty string when none was supplied.
    pub fn session_id(&self) -> &str {
        self.ai_session_id.as_deref().unwrap_or_default()
    }
}
