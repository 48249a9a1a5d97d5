// =============================================================================
// Event Publisher — typed pub/sub over a tokio broadcast channel
// =============================================================================
//
// Four event kinds leave the engine:
//   signal       rule-based result
//   indicators   every computed snapshot, signal or not
//   ai_signal    augmented result + raw inference payload
//   ai_fallback  augmentation failure reason
//
// Publication order is the order results were computed.  AI events arrive
// whenever their task finishes and are unordered relative to the rest.
// =============================================================================

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::ai::InferenceResponse;
use crate::indicators::IndicatorValues;
use crate::types::Signal;

// ============================================================================
// Event
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    Signal(Signal),
    Indicators {
        market: String,
        values: IndicatorValues,
    },
    AiSignal {
        signal: Signal,
        inference: InferenceResponse,
    },
    AiFallback {
        market: String,
        reason: String,
    },
}

/// Discriminant of [`EngineEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Signal,
    Indicators,
    AiSignal,
    AiFallback,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signal => "signal",
            Self::Indicators => "indicators",
            Self::AiSignal => "ai_signal",
            Self::AiFallback => "ai_fallback",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Signal(_) => EventKind::Signal,
            Self::Indicators { .. } => EventKind::Indicators,
            Self::AiSignal { .. } => EventKind::AiSignal,
            Self::AiFallback { .. } => EventKind::AiFallback,
        }
    }

    pub fn market(&self) -> &str {
        match self {
            Self::Signal(signal) | Self::AiSignal { signal, .. } => &signal.market,
            Self::Indicators { market, .. } | Self::AiFallback { market, .. } => market,
        }
    }
}

// ============================================================================
// Publisher
// ============================================================================

/// Multi-subscriber fan-out for engine events.  Shared via `Arc` between the
/// engine and its AI tasks.
pub struct EventPublisher {
    tx: broadcast::Sender<EngineEvent>,
    published: RwLock<HashMap<EventKind, u64>>,
}

impl EventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            published: RwLock::new(HashMap::new()),
        }
    }

    /// New receiver that sees every event published from now on.
    ///
    /// The channel is bounded by `event_channel_capacity`.  A receiver that
    /// falls further behind than that loses the oldest events: its next
    /// `recv` returns `RecvError::Lagged(n)` and then resumes from the
    /// oldest event still buffered.  Publishing never blocks on slow
    /// subscribers.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish to all current subscribers.  Having none is not an error.
    pub fn publish(&self, event: EngineEvent) {
        let kind = event.kind();
        *self.published.write().entry(kind).or_insert(0) += 1;

        if let Err(e) = self.tx.send(event) {
            debug!(kind = %kind, market = %e.0.market(), "event dropped: no subscribers");
        }
    }

    /// Number of events of `kind` published so far.
    pub fn published(&self, kind: EventKind) -> u64 {
        self.published.read().get(&kind).copied().unwrap_or(0)
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(1024)
    }
}
