// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_t      = (price_t - EMA_{t-1}) * multiplier + EMA_{t-1}
//
// The very first EMA value is seeded with the SMA of the first `period` prices.
// =============================================================================

/// Compute the latest EMA value for `prices` with look-back `period`.
///
/// # Edge cases
/// - empty input => 0.0
/// - `period == 0` or `prices.len() < period` => the most recent price
/// - A non-finite step leaves the last finite EMA in place.
pub fn calculate_ema(prices: &[f64], period: usize) -> f64 {
    let Some(&last) = prices.last() else {
        return 0.0;
    };
    if period == 0 || prices.len() < period {
        return last;
    }

    let multiplier = 2.0 / (period + 1) as f64;

    // Seed: SMA of the first `period` values.
    let mut ema = prices[..period].iter().sum::<f64>() / period as f64;
    if !ema.is_finite() {
        return last;
    }

    for &price in &prices[period..] {
        let next = (price - ema) * multiplier + ema;
        if !next.is_finite() {
            break;
        }
        ema = next;
    }

    ema
}
