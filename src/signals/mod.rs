// =============================================================================
// Signals Module
// =============================================================================
//
// Rule-based decision layer of the engine:
// - EMA crossover state per market (previous vs. current pair)
// - Signal evaluation (RSI extremes, crossovers, volatility dampening, gates)

pub mod crossover;
pub mod evaluator;

pub use crossover::{CrossoverTracker, EmaCrossover};
pub use evaluator::{evaluate, EvaluationPolicy, SignalReason};
