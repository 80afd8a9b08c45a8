//! Synthetic data stream: base level, seasonal sinusoid, uniform noise and
//! randomly injected multiplicative outliers.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::{ConfigError, SourceConfig};

/// Range of the multiplicative factor applied to injected outliers.
const OUTLIER_FACTOR_MIN: f64 = 1.5;
const OUTLIER_FACTOR_MAX: f64 = 3.0;

/// One sample of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub time: u64,
    pub value: f64,
}

/// Infinite, stateful generator of [`DataPoint`]s.
///
/// The iterator never ends; bound it with `take`, or let a sink decide when
/// to stop.
#[derive(Debug)]
pub struct StreamSource {
    config: SourceConfig,
    rng: StdRng,
    time: u64,
}

impl StreamSource {
    pub fn new(config: SourceConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            config,
            rng,
            time: 0,
        })
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Time of the next point to be produced.
    pub fn time(&self) -> u64 {
        self.time
    }

    /// Rewind the time counter. The random state is not rewound.
    pub fn reset(&mut self) {
        self.time = 0;
    }

    fn seasonal(&self, time: u64) -> f64 {
        let phase = 2.0 * PI * time as f64 / self.config.period as f64;
        self.config.seasonal_amplitude * phase.sin()
    }

    fn sample(&mut self) -> DataPoint {
        let time = self.time;
        let noise = self.config.noise_level;

        let mut value = self.config.base_value + self.seasonal(time);
        value += noise * self.rng.gen_range(-1.0_f64..=1.0);

        if self.rng.gen::<f64>() < self.config.anomaly_probability {
            let factor = self.rng.gen_range(OUTLIER_FACTOR_MIN..OUTLIER_FACTOR_MAX);
            trace!(time, factor, "injecting outlier");
            value *= factor;
        }

        self.time += 1;
        DataPoint { time, value }
    }
}

impl Iterator for StreamSource {
    type Item = DataPoint;

    fn next(&mut self) -> Option<DataPoint> {
        Some(self.sample())
    }
}
