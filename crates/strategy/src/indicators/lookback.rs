use std::collections::VecDeque;

/// Bounded history of the most recent values, newest first by offset.
///
/// `value_at(0)` is the current bar, `value_at(1)` the bar before, and so on up
/// to `depth - 1`. Anything older has been evicted and reads as `None`.
#[derive(Debug, Clone)]
pub struct Lookback<T> {
    depth: usize,
    values: VecDeque<T>,
}

impl<T: Copy> Lookback<T> {
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        Self {
            depth,
            values: VecDeque::with_capacity(depth),
        }
    }

    pub fn push(&mut self, value: T) {
        if self.values.len() == self.depth {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn value_at(&self, offset: usize) -> Option<T> {
        if offset >= self.values.len() {
            return None;
        }
        self.values.get(self.values.len() - 1 - offset).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.depth
    }

    /// The newest `n` values, newest first. `None` if fewer are stored.
    pub fn latest(&self, n: usize) -> Option<impl Iterator<Item = T> + '_> {
        if n > self.values.len() {
            return None;
        }
        Some(self.values.iter().rev().take(n).copied())
    }
}

impl Lookback<f64> {
    /// Mean of the newest `n` values, current bar included.
    pub fn mean(&self, n: usize) -> Option<f64> {
        if n == 0 {
            return None;
        }
        let sum: f64 = self.latest(n)?.sum();
        Some(sum / n as f64)
    }
}
