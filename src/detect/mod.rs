//! Sliding-window anomaly detection.

pub mod window;
pub mod zscore;

pub use window::SlidingWindow;
pub use zscore::ZScoreDetector;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("invalid detector parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("non-finite input value: {value}")]
    NonFiniteInput { value: f64 },
}

/// Classification of a single value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_anomaly: bool,
    pub z_score: f64,
}

impl Verdict {
    /// Verdict returned during warm-up and for zero-variance windows.
    pub const fn normal() -> Self {
        Self {
            is_anomaly: false,
            z_score: 0.0,
        }
    }
}
