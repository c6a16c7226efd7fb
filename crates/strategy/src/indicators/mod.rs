pub mod ema;
pub mod lookback;
pub mod macd;
pub mod sma;

pub use ema::Ema;
pub use lookback::Lookback;
pub use macd::{MacdIndicator, MacdValue};
pub use sma::Sma;

use crate::config::StrategyParams;

/// Indicator values aligned to the current bar, borrowed from an `IndicatorSet`.
///
/// Absent values mean the indicator is still warming up.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorSnapshot<'a> {
    pub sma: Option<f64>,
    pub macd: Option<MacdValue>,
    /// Histogram history, offset 0 = current bar.
    pub histogram: &'a Lookback<f64>,
}

/// Every indicator a strategy reads, updated once per bar.
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    sma: Sma,
    macd: MacdIndicator,
    histogram: Lookback<f64>,
}

impl IndicatorSet {
    pub fn new(params: &StrategyParams) -> Self {
        Self {
            sma: Sma::new(params.ma_period),
            macd: MacdIndicator::new(params.macd_fast, params.macd_slow, params.macd_signal),
            histogram: Lookback::new(params.hist_lookback),
        }
    }

    pub fn update(&mut self, close: f64) {
        self.sma.update(close);
        if let Some(v) = self.macd.update(close) {
            self.histogram.push(v.histogram);
        }
    }

    pub fn snapshot(&self) -> IndicatorSnapshot<'_> {
        IndicatorSnapshot {
            sma: self.sma.value(),
            macd: self.macd.value(),
            histogram: &self.histogram,
        }
    }
}
