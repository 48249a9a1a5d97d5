use std::collections::{BTreeMap, HashMap, VecDeque};

// ---------------------------------------------------------------------------
// PriceHistory -- bounded ring buffer per market
// ---------------------------------------------------------------------------

/// Ring-buffer of the most recent quotes per market symbol.  Oldest quotes
/// are evicted first once a market holds `capacity` entries.
///
/// Markets are created implicitly on first append and are fully independent
/// of each other.
#[derive(Debug)]
pub struct PriceHistory {
    windows: HashMap<String, VecDeque<f64>>,
    capacity: usize,
}

impl PriceHistory {
    /// Create a store that retains at most `capacity` prices per market.
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            windows: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `prices` (oldest first) to `market`'s window and trim to
    /// capacity.
    pub fn append(&mut self, market: &str, prices: &[f64]) {
        let capacity = self.capacity;
        let ring = self
            .windows
            .entry(market.to_string())
            .or_insert_with(|| VecDeque::with_capacity(capacity + 1));

        ring.extend(prices.iter().copied());
        while ring.len() > capacity {
            ring.pop_front();
        }
    }

    /// Drop all state for `market`.  Returns whether the market was tracked.
    pub fn clear(&mut self, market: &str) -> bool {
        self.windows.remove(market).is_some()
    }

    /// Live window length for `market` (0 when unknown).
    pub fn size_of(&self, market: &str) -> usize {
        self.windows.get(market).map_or(0, VecDeque::len)
    }

    /// Contiguous copy of `market`'s window, oldest first.
    pub fn window(&self, market: &str) -> Vec<f64> {
        self.windows
            .get(market)
            .map(|ring| ring.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Most recent price for `market`, if any.
    pub fn last(&self, market: &str) -> Option<f64> {
        self.windows.get(market).and_then(|ring| ring.back().copied())
    }

    /// Tracked markets and their window lengths, sorted by market.
    pub fn sizes(&self) -> BTreeMap<String, usize> {
        self.windows
            .iter()
            .map(|(market, ring)| (market.clone(), ring.len()))
            .collect()
    }
}

impl Default for PriceHistory {
    fn default() -> Self {
        Self::new(100)
    }
}
