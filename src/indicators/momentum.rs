// =============================================================================
// Momentum — fractional change over a fixed look-back
// =============================================================================
//
//   momentum = (price_now - price_{n ago}) / price_{n ago}
//
// Expressed as a fraction (0.01 == +1%), not a percentage.
// =============================================================================

/// Number of prices the momentum look-back spans.
pub const MOMENTUM_LOOKBACK: usize = 10;

/// Fractional change between the latest price and the price
/// [`MOMENTUM_LOOKBACK`] entries back (inclusive of the latest).
///
/// # Edge cases
/// - fewer than [`MOMENTUM_LOOKBACK`] prices => 0.0
/// - a zero reference price falls back to the current price as denominator
/// - both zero, or a non-finite result => 0.0
pub fn calculate_momentum(prices: &[f64]) -> f64 {
    if prices.len() < MOMENTUM_LOOKBACK {
        return 0.0;
    }

    let current = prices[prices.len() - 1];
    let reference = prices[prices.len() - MOMENTUM_LOOKBACK];
    let denominator = if reference != 0.0 { reference } else { current };
    if denominator == 0.0 {
        return 0.0;
    }

    let momentum = (current - reference) / denominator;
    if momentum.is_finite() {
        momentum
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn momentum_insufficient_data() {
        assert_eq!(calculate_momentum(&[1.0; 9]), 0.0);
        assert_eq!(calculate_momentum(&[]), 0.0);
    }

    #[test]
    fn momentum_positive_trend() {
        // 10 prices 100..=109 => (109 - 100) / 100
        let prices: Vec<f64> = (100..110).map(|x| x as f64).collect();
        assert!((calculate_momentum(&prices) - 0.09).abs() < 1e-10);
    }

    #[test]
    fn momentum_negative_trend() {
        let prices: Vec<f64> = (0..12).map(|i| 200.0 - i as f64 * 10.0).collect();
        // reference = prices[2] = 180, current = 90
        assert!((calculate_momentum(&prices) + 0.5).abs() < 1e-10);
    }

    #[test]
    fn momentum_flat_is_zero() {
        assert_eq!(calculate_momentum(&[42.0; 15]), 0.0);
    }

    #[test]
    fn momentum_zero_reference_uses_current() {
        let mut prices = vec![0.0];
        prices.extend(std::iter::repeat(5.0).take(9));
        // (5 - 0) / 5
        assert!((calculate_momentum(&prices) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn momentum_all_zero_is_zero() {
        assert_eq!(calculate_momentum(&[0.0; 10]), 0.0);
    }
}
