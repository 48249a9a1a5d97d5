// =============================================================================
// EMA Crossover Tracker — previous vs. current fast/slow EMA per market
// =============================================================================

use std::collections::HashMap;

/// Fast/slow EMA pair before and after the latest computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmaCrossover {
    pub prev_fast: f64,
    pub prev_slow: f64,
    pub curr_fast: f64,
    pub curr_slow: f64,
}

impl EmaCrossover {
    /// Fast EMA moved from at-or-below the slow EMA to above it.
    pub fn is_bullish(&self) -> bool {
        self.prev_fast <= self.prev_slow && self.curr_fast > self.curr_slow
    }

    /// Fast EMA moved from at-or-above the slow EMA to below it.
    pub fn is_bearish(&self) -> bool {
        self.prev_fast >= self.prev_slow && self.curr_fast < self.curr_slow
    }
}

#[derive(Debug, Clone, Copy)]
struct EmaState {
    fast: f64,
    slow: f64,
}

/// Remembers the last EMA pair per market so each evaluation can compare
/// against the one before it.
#[derive(Debug, Default)]
pub struct CrossoverTracker {
    states: HashMap<String, EmaState>,
}

impl CrossoverTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the freshly computed pair for `market` and return it alongside
    /// the previous one.  The first observation of a market is its own
    /// previous value, so it can never report a crossover.
    pub fn observe(&mut self, market: &str, fast: f64, slow: f64) -> EmaCrossover {
        let current = EmaState { fast, slow };
        let previous = self
            .states
            .insert(market.to_string(), current)
            .unwrap_or(current);

        EmaCrossover {
            prev_fast: previous.fast,
            prev_slow: previous.slow,
            curr_fast: fast,
            curr_slow: slow,
        }
    }

    pub fn clear(&mut self, market: &str) -> bool {
        self.states.remove(market).is_some()
    }

    pub fn is_tracking(&self, market: &str) -> bool {
        self.states.contains_key(market)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_never_crosses() {
        let mut tracker = CrossoverTracker::new();
        let x = tracker.observe("R_100", 105.0, 100.0);
        assert_eq!(x.prev_fast, 105.0);
        assert_eq!(x.prev_slow, 100.0);
        assert!(!x.is_bullish());
        assert!(!x.is_bearish());
    }

    #[test]
    fn detects_bullish_cross() {
        let mut tracker = CrossoverTracker::new();
        tracker.observe("R_100", 99.0, 100.0);
        let x = tracker.observe("R_100", 101.0, 100.0);
        assert!(x.is_bullish());
        assert!(!x.is_bearish());
    }

    #[test]
    fn detects_bearish_cross() {
        let mut tracker = CrossoverTracker::new();
        tracker.observe("R_100", 101.0, 100.0);
        let x = tracker.observe("R_100", 99.0, 100.0);
        assert!(x.is_bearish());
        assert!(!x.is_bullish());
    }

    #[test]
    fn cross_fires_once_then_rolls_forward() {
        let mut tracker = CrossoverTracker::new();
        tracker.observe("R_100", 99.0, 100.0);
        assert!(tracker.observe("R_100", 101.0, 100.0).is_bullish());
        assert!(!tracker.observe("R_100", 102.0, 100.0).is_bullish());
    }

    #[test]
    fn touching_from_equal_counts_as_cross() {
        let mut tracker = CrossoverTracker::new();
        tracker.observe("R_100", 100.0, 100.0);
        assert!(tracker.observe("R_100", 100.5, 100.0).is_bullish());
    }

    #[test]
    fn markets_do_not_share_state() {
        let mut tracker = CrossoverTracker::new();
        tracker.observe("A", 99.0, 100.0);
        let b = tracker.observe("B", 101.0, 100.0);
        assert!(!b.is_bullish());
    }

    #[test]
    fn clear_resets_seeding() {
        let mut tracker = CrossoverTracker::new();
        tracker.observe("R_100", 99.0, 100.0);
        assert!(tracker.clear("R_100"));
        assert!(!tracker.is_tracking("R_100"));
        assert!(!tracker.observe("R_100", 101.0, 100.0).is_bullish());
    }
}
