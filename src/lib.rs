// =============================================================================
// TraderMind Signal Engine
// =============================================================================
//
// Turns a stream of price ticks into CALL / PUT signals from classic
// technical indicators, with an optional non-blocking AI second opinion.
// =============================================================================

pub mod ai;
pub mod engine;
pub mod events;
pub mod indicators;
pub mod market_data;
pub mod runtime_config;
pub mod signals;
pub mod types;

pub use engine::{EngineStats, SignalEngine};
pub use events::{EngineEvent, EventKind, EventPublisher};
pub use indicators::IndicatorValues;
pub use runtime_config::{EngineConfig, SessionConfig};
pub use types::{Signal, SignalType, Tick};
