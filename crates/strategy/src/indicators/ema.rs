/// Exponential moving average, seeded with the SMA of the first `period` inputs.
///
/// Smoothing factor is `2 / (period + 1)`. Reads `None` during warm-up.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: f64,
    seed: Vec<f64>,
    value: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            seed: Vec::with_capacity(period),
            value: None,
        }
    }

    pub fn update(&mut self, x: f64) -> Option<f64> {
        match self.value {
            Some(prev) => {
                self.value = Some(x * self.alpha + prev * (1.0 - self.alpha));
            }
            None => {
                self.seed.push(x);
                if self.seed.len() == self.period {
                    self.value = Some(self.seed.iter().sum::<f64>() / self.period as f64);
                    self.seed.clear();
                }
            }
        }
        self.value
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_seeds_with_sma() {
        let mut ema = Ema::new(3);
        assert_eq!(ema.update(2.0), None);
        assert_eq!(ema.update(4.0), None);
        assert_eq!(ema.update(6.0), Some(4.0));
    }

    #[test]
    fn ema_smooths_after_seed() {
        let mut ema = Ema::new(3);
        for v in [2.0, 4.0, 6.0] {
            ema.update(v);
        }
        // alpha = 0.5 → 8 * 0.5 + 4 * 0.5
        let v = ema.update(8.0).unwrap();
        assert!((v - 6.0).abs() < 1e-12, "expected 6.0, got {v}");
    }
}
