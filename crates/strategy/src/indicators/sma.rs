use std::collections::VecDeque;

/// Simple moving average over the last `period` closes.
/// Reads `None` until `period` values have been seen.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    window: VecDeque<f64>,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            window: VecDeque::with_capacity(period),
        }
    }

    pub fn update(&mut self, value: f64) -> Option<f64> {
        self.window.push_back(value);
        if self.window.len() > self.period {
            self.window.pop_front();
        }
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        if self.window.len() < self.period {
            return None;
        }
        Some(self.window.iter().sum::<f64>() / self.period as f64)
    }
}
