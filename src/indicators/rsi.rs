// =============================================================================
// Relative Strength Index (RSI) — simple average over the trailing window
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1 — Take the last `period` deltas between consecutive prices.
// Step 2 — Sum gains and absolute losses separately, divide each by `period`.
// Step 3 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// Thresholds:  RSI > 70 => OVERBOUGHT,  RSI < 30 => OVERSOLD.
// =============================================================================

/// Default RSI look-back.
pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Value reported when there is not enough history.
pub const NEUTRAL_RSI: f64 = 50.0;

/// Compute the current RSI over the last `period` price changes.
///
/// # Edge cases
/// - `period == 0` or `prices.len() < period + 1` => 50.0 (neutral)
/// - average loss of zero => exactly 100.0, even for a flat window
/// - non-finite result => 50.0
pub fn calculate_rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return NEUTRAL_RSI;
    }

    let tail = &prices[prices.len() - (period + 1)..];
    let (gains, losses) = tail.windows(2).fold((0.0_f64, 0.0_f64), |(g, l), w| {
        let delta = w[1] - w[0];
        if delta > 0.0 {
            (g + delta, l)
        } else {
            (g, l + delta.abs())
        }
    });

    let period_f = period as f64;
    rsi_from_averages(gains / period_f, losses / period_f)
}

// =============================================================================
// Internal helpers
// =============================================================================

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    let rsi = 100.0 - 100.0 / (1.0 + rs);

    if rsi.is_finite() {
        rsi.clamp(0.0, 100.0)
    } else {
        NEUTRAL_RSI
    }
}
