// =============================================================================
// Volatility — coefficient of variation
// =============================================================================
//
// Population standard deviation of the last 20 prices divided by their mean.
// Scale-free, so values are comparable across markets (0.02 == 2%).
// =============================================================================

/// Maximum number of trailing prices the measure looks at.
pub const VOLATILITY_WINDOW: usize = 20;

/// Minimum history before a non-zero value is reported.
pub const VOLATILITY_MIN_HISTORY: usize = 10;

/// Coefficient of variation over the last [`VOLATILITY_WINDOW`] prices
/// (or fewer, once at least [`VOLATILITY_MIN_HISTORY`] are available).
///
/// # Edge cases
/// - fewer than [`VOLATILITY_MIN_HISTORY`] prices => 0.0
/// - zero mean or a non-finite result => 0.0
/// - a negative mean yields a negative ratio
pub fn calculate_volatility(prices: &[f64]) -> f64 {
    if prices.len() < VOLATILITY_MIN_HISTORY {
        return 0.0;
    }

    let window = &prices[prices.len().saturating_sub(VOLATILITY_WINDOW)..];
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return 0.0;
    }

    let variance = window.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
    let cv = variance.sqrt() / mean;

    if cv.is_finite() {
        cv
    } else {
        0.0
    }
}
