// =============================================================================
// Average True Range (ATR) — single quote stream approximation
// =============================================================================
//
// Only one quote per tick is available (no high / low / close triple), so the
// true range of a step is taken as the absolute quote-to-quote change:
//
//   TR_t = |price_t - price_{t-1}|
//   ATR  = mean of the last `period` TR values
//
// Default period: 14
// =============================================================================

/// Default ATR look-back.
pub const DEFAULT_ATR_PERIOD: usize = 14;

/// Average absolute price change over the last `period` steps.
///
/// # Edge cases
/// - `period == 0` or fewer than `period + 1` prices => 0.0
/// - non-finite result => 0.0
pub fn calculate_atr(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return 0.0;
    }

    let tail = &prices[prices.len() - (period + 1)..];
    let total: f64 = tail.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    let atr = total / period as f64;

    if atr.is_finite() {
        atr
    } else {
        0.0
    }
}
