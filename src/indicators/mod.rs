// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators the signal engine
// works from.  Every function is total over any window length: short or
// degenerate windows yield a documented fallback value instead of an error,
// so the ingestion path never has to branch on "not ready yet".

pub mod atr;
pub mod ema;
pub mod momentum;
pub mod rsi;
pub mod sma;
pub mod volatility;

use serde::{Deserialize, Serialize};

use crate::runtime_config::EngineConfig;

// =============================================================================
// Indicator snapshot
// =============================================================================

/// Point-in-time indicator values for one market, computed once per
/// evaluation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorValues {
    pub rsi: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub sma_fast: f64,
    pub sma_slow: f64,
    pub momentum: f64,
    pub volatility: f64,
    pub atr: f64,
}

/// Look-back periods for the period-parameterised indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorPeriods {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub sma_fast: usize,
    pub sma_slow: usize,
    pub rsi: usize,
    pub atr: usize,
}

impl Default for IndicatorPeriods {
    fn default() -> Self {
        Self {
            ema_fast: 9,
            ema_slow: 21,
            sma_fast: 10,
            sma_slow: 20,
            rsi: rsi::DEFAULT_RSI_PERIOD,
            atr: atr::DEFAULT_ATR_PERIOD,
        }
    }
}

impl From<&EngineConfig> for IndicatorPeriods {
    fn from(config: &EngineConfig) -> Self {
        Self {
            ema_fast: config.ema_fast_period,
            ema_slow: config.ema_slow_period,
            sma_fast: config.sma_fast_period,
            sma_slow: config.sma_slow_period,
            rsi: config.rsi_period,
            atr: config.atr_period,
        }
    }
}

impl IndicatorValues {
    /// Compute the full snapshot for a price window (oldest first).
    pub fn compute(prices: &[f64], periods: &IndicatorPeriods) -> Self {
        Self {
            rsi: rsi::calculate_rsi(prices, periods.rsi),
            ema_fast: ema::calculate_ema(prices, periods.ema_fast),
            ema_slow: ema::calculate_ema(prices, periods.ema_slow),
            sma_fast: sma::calculate_sma(prices, periods.sma_fast),
            sma_slow: sma::calculate_sma(prices, periods.sma_slow),
            momentum: momentum::calculate_momentum(prices),
            volatility: volatility::calculate_volatility(prices),
            atr: atr::calculate_atr(prices, periods.atr),
        }
    }

    /// True when every field is a finite number.
    pub fn is_finite(&self) -> bool {
        [
            self.rsi,
            self.ema_fast,
            self.ema_slow,
            self.sma_fast,
            self.sma_slow,
            self.momentum,
            self.volatility,
            self.atr,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}
