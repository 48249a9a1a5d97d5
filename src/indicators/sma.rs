// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// Arithmetic mean of the last `period` prices.
//
// Short windows degrade to the most recent price (a single-point average)
// instead of failing, so the snapshot is always defined.
// =============================================================================

/// Mean of the last `period` prices in `prices`.
///
/// # Edge cases
/// - empty input => 0.0
/// - `period == 0` or `prices.len() < period` => the most recent price
pub fn calculate_sma(prices: &[f64], period: usize) -> f64 {
    let Some(&last) = prices.last() else {
        return 0.0;
    };
    if period == 0 || prices.len() < period {
        return last;
    }

    let window = &prices[prices.len() - period..];
    window.iter().sum::<f64>() / period as f64
}
