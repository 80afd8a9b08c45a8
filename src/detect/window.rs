use std::collections::VecDeque;

/// Fixed-capacity FIFO buffer holding the most recent observations.
///
/// Pushing past capacity evicts the oldest value, so the buffer never holds
/// more than `capacity` items.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl SlidingWindow {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            // One extra slot: the new value lands before the oldest is evicted.
            values: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a value, returning the evicted oldest value if capacity was exceeded.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        self.values.push_back(value);
        if self.values.len() > self.capacity {
            self.values.pop_front()
        } else {
            None
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    /// Values from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &f64> + '_ {
        self.values.iter()
    }

    /// Population mean of the current contents.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Population variance (divides by `len`, not `len - 1`).
    pub fn variance(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let sum_sq_diff: f64 = self.values.iter().map(|&x| (x - mean).powi(2)).sum();
        sum_sq_diff / self.values.len() as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_evicts_oldest_first() {
        let mut w = SlidingWindow::with_capacity(3);
        assert_eq!(w.push(1.0), None);
        assert_eq!(w.push(2.0), None);
        assert_eq!(w.push(3.0), None);
        assert!(w.is_full());
        assert_eq!(w.push(4.0), Some(1.0));
        assert_eq!(w.push(5.0), Some(2.0));
        assert_eq!(w.iter().copied().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0]);
        assert_eq!(w.len(), 3);
    }

    #[test]
    fn test_population_stats() {
        let mut w = SlidingWindow::with_capacity(5);
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            w.push(v);
        }
        assert_eq!(w.mean(), 3.0);
        // Population variance of 1..5 is 2.0
        assert!((w.variance() - 2.0).abs() < 1e-12);
        assert!((w.std_dev() - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_empty_window_stats_are_zero() {
        let w = SlidingWindow::with_capacity(4);
        assert!(w.is_empty());
        assert!(!w.is_full());
        assert_eq!(w.mean(), 0.0);
        assert_eq!(w.std_dev(), 0.0);
    }

    #[test]
    fn test_zero_capacity_never_fills() {
        let mut w = SlidingWindow::with_capacity(0);
        // Immediately evicted again.
        assert_eq!(w.push(7.0), Some(7.0));
        assert!(w.is_empty());
    }
}
