use super::ema::Ema;

/// MACD (Moving Average Convergence/Divergence) indicator, updated one close at a time.
///
/// Computes: MACD line = EMA(fast) − EMA(slow), Signal = EMA(macd_line, signal_period),
/// Histogram = MACD line − Signal.
#[derive(Debug, Clone)]
pub struct MacdIndicator {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
    fast_ema: Ema,
    slow_ema: Ema,
    signal_ema: Ema,
    latest: Option<MacdValue>,
}

/// One bar's MACD triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdValue {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl MacdIndicator {
    /// Periods are validated by `StrategyParams`; callers outside it must keep
    /// `0 < fast < slow` and `signal > 0`.
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        Self {
            fast,
            slow,
            signal,
            fast_ema: Ema::new(fast),
            slow_ema: Ema::new(slow),
            signal_ema: Ema::new(signal),
            latest: None,
        }
    }

    /// Feed the next close. Returns `None` until `slow + signal - 1` closes
    /// have been seen.
    pub fn update(&mut self, close: f64) -> Option<MacdValue> {
        let fast = self.fast_ema.update(close);
        let slow = self.slow_ema.update(close);

        self.latest = match (fast, slow) {
            (Some(f), Some(s)) => {
                let line = f - s;
                self.signal_ema.update(line).map(|signal| MacdValue {
                    line,
                    signal,
                    histogram: line - signal,
                })
            }
            _ => None,
        };
        self.latest
    }

    pub fn value(&self) -> Option<MacdValue> {
        self.latest
    }

    /// Number of closes needed before the first value appears.
    pub fn warmup(&self) -> usize {
        self.slow + self.signal - 1
    }
}
