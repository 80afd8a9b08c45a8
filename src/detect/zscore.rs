use crate::config::DetectorConfig;
use crate::detect::window::SlidingWindow;
use crate::detect::{DetectError, Verdict};

pub const DEFAULT_WINDOW_SIZE: usize = 100;
pub const DEFAULT_THRESHOLD: f64 = 2.0;

/// Sliding-window Z-score detector for a single stream.
///
/// Statistics are recomputed from the full window on every update once the
/// window has filled. The value being scored is part of that window. Until
/// the window first fills, `mean` and `std_dev` stay at 0 and every update
/// returns a non-anomalous verdict with a zero score.
#[derive(Debug, Clone)]
pub struct ZScoreDetector {
    window: SlidingWindow,
    threshold: f64,
    mean: f64,
    std_dev: f64,
}

impl ZScoreDetector {
    pub fn new(window_size: usize, threshold: f64) -> Result<Self, DetectError> {
        if window_size == 0 {
            return Err(DetectError::InvalidParameter {
                name: "window_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(DetectError::InvalidParameter {
                name: "threshold",
                reason: format!("must be a finite positive number, got {threshold}"),
            });
        }

        Ok(Self {
            window: SlidingWindow::with_capacity(window_size),
            threshold,
            mean: 0.0,
            std_dev: 0.0,
        })
    }

    pub fn from_config(config: &DetectorConfig) -> Result<Self, DetectError> {
        Self::new(config.window_size, config.threshold)
    }

    /// Feed the next value and classify it.
    ///
    /// Non-finite values are accepted: a NaN poisons the window statistics
    /// until it is evicted, and since NaN never compares greater than the
    /// threshold nothing is flagged meanwhile. Use [`Self::checked_update`]
    /// to reject such input instead.
    pub fn update(&mut self, value: f64) -> Verdict {
        self.window.push(value);

        if self.window.is_full() {
            self.mean = self.window.mean();
            self.std_dev = self.window.std_dev();
        }

        if self.std_dev == 0.0 {
            return Verdict::normal();
        }

        let z_score = ((value - self.mean) / self.std_dev).abs();
        Verdict {
            is_anomaly: z_score > self.threshold,
            z_score,
        }
    }

    /// Like [`Self::update`], but rejects NaN and infinities without touching
    /// the window.
    pub fn checked_update(&mut self, value: f64) -> Result<Verdict, DetectError> {
        if !value.is_finite() {
            return Err(DetectError::NonFiniteInput { value });
        }
        Ok(self.update(value))
    }

    /// Classify a batch of values in order.
    pub fn score_all<I>(&mut self, values: I) -> Vec<Verdict>
    where
        I: IntoIterator<Item = f64>,
    {
        values.into_iter().map(|v| self.update(v)).collect()
    }

    pub fn window_size(&self) -> usize {
        self.window.capacity()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Mean as of the last full-window update.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population standard deviation as of the last full-window update.
    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// Number of values currently held.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn is_warming_up(&self) -> bool {
        !self.window.is_full()
    }
}

impl Default for ZScoreDetector {
    fn default() -> Self {
        Self {
            window: SlidingWindow::with_capacity(DEFAULT_WINDOW_SIZE),
            threshold: DEFAULT_THRESHOLD,
            mean: 0.0,
            std_dev: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(matches!(
            ZScoreDetector::new(0, 2.0),
            Err(DetectError::InvalidParameter { name: "window_size", .. })
        ));
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                ZScoreDetector::new(10, bad),
                Err(DetectError::InvalidParameter { name: "threshold", .. })
            ));
        }
    }

    #[test]
    fn test_defaults() {
        let d = ZScoreDetector::default();
        assert_eq!(d.window_size(), 100);
        assert_eq!(d.threshold(), 2.0);
        assert!(d.is_empty());
        assert!(d.is_warming_up());
    }

    #[test]
    fn test_warmup_returns_normal_zero() {
        let mut d = ZScoreDetector::new(4, 1.0).unwrap();
        for v in [1.0, 500.0, -300.0] {
            assert_eq!(d.update(v), Verdict::normal());
        }
        assert_eq!(d.mean(), 0.0);
        assert_eq!(d.std_dev(), 0.0);
        assert!(d.is_warming_up());
    }

    #[test]
    fn test_constant_run_reports_zero() {
        // window 3, feed 1,1,1,1
        let mut d = ZScoreDetector::new(3, 0.5).unwrap();
        let verdicts = d.score_all([1.0, 1.0, 1.0, 1.0]);
        assert!(verdicts.iter().all(|v| *v == Verdict::normal()));
        assert_eq!(d.mean(), 1.0);
        assert_eq!(d.len(), 3);
    }

    #[test]
    fn test_spike_scored_against_window_including_itself() {
        let mut d = ZScoreDetector::new(5, 2.0).unwrap();
        let verdicts = d.score_all([10.0, 10.0, 10.0, 10.0, 1000.0]);
        for v in &verdicts[..4] {
            assert_eq!(*v, Verdict::normal());
        }
        let last = verdicts[4];
        assert!((d.mean() - 208.0).abs() < 1e-9);
        assert!((d.std_dev() - 396.0).abs() < 1e-9);
        assert!((last.z_score - 2.0).abs() < 1e-9);
        // Strictly greater-than: exactly 2.0 is not an anomaly.
        assert!(!last.is_anomaly);

        let mut lower = ZScoreDetector::new(5, 1.9).unwrap();
        let verdicts = lower.score_all([10.0, 10.0, 10.0, 10.0, 1000.0]);
        assert!(verdicts[4].is_anomaly);
    }

    #[test]
    fn test_zero_variance_suppresses_after_history() {
        let mut d = ZScoreDetector::new(3, 1.0).unwrap();
        d.score_all([1.0, 2.0, 3.0]);
        assert!(d.std_dev() > 0.0);
        // Window becomes [5, 5, 5]
        d.score_all([5.0, 5.0]);
        assert_eq!(d.update(5.0), Verdict::normal());
        assert_eq!(d.std_dev(), 0.0);
    }

    #[test]
    fn test_stats_recomputed_every_full_update() {
        let mut d = ZScoreDetector::new(2, 10.0).unwrap();
        d.score_all([0.0, 2.0]);
        assert_eq!(d.mean(), 1.0);
        d.update(4.0);
        assert_eq!(d.mean(), 3.0);
        d.update(10.0);
        assert_eq!(d.mean(), 7.0);
    }

    #[test]
    fn test_nan_passes_through_unflagged() {
        let mut d = ZScoreDetector::new(3, 1.0).unwrap();
        d.score_all([1.0, 2.0]);
        let v = d.update(f64::NAN);
        assert!(!v.is_anomaly);
        assert!(v.z_score.is_nan());
        // Poisoned until evicted
        let v = d.update(100.0);
        assert!(!v.is_anomaly);
    }

    #[test]
    fn test_checked_update_rejects_without_mutating() {
        let mut d = ZScoreDetector::new(3, 1.0).unwrap();
        d.update(1.0);
        assert!(matches!(
            d.checked_update(f64::INFINITY),
            Err(DetectError::NonFiniteInput { .. })
        ));
        assert_eq!(d.len(), 1);
        assert!(d.checked_update(2.0).is_ok());
        assert_eq!(d.len(), 2);
    }
}
