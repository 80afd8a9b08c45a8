//! TOML configuration for streamwatch.
//!
//! Every section is optional and falls back to compiled-in defaults. The file
//! location can be given explicitly, via the `STREAMWATCH_CONFIG` environment
//! variable, or as `streamwatch.toml` in the working directory.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::detect::zscore::{DEFAULT_THRESHOLD, DEFAULT_WINDOW_SIZE};
use crate::detect::{DetectError, ZScoreDetector};

pub const CONFIG_ENV_VAR: &str = "STREAMWATCH_CONFIG";
pub const LOCAL_CONFIG_FILE: &str = "streamwatch.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Detector(#[from] DetectError),

    #[error("invalid source parameter `{name}`: {reason}")]
    InvalidSource { name: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Try, in order: `STREAMWATCH_CONFIG`, `./streamwatch.toml`, defaults.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "STREAMWATCH_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let local_path = Path::new(LOCAL_CONFIG_FILE);
        if local_path.exists() {
            match Self::load(local_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %local_path.display(),
                        error = %e,
                        "local config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }

    /// Check every section, failing on the first bad parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detector.validate()?;
        self.source.validate()?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize configuration")
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Number of trailing values the statistics are computed over.
    pub window_size: usize,
    /// Z-score above which a value is flagged.
    pub threshold: f64,
    /// Fail on NaN / infinite input instead of passing it through unflagged.
    pub reject_non_finite: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            threshold: DEFAULT_THRESHOLD,
            reject_non_finite: false,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ZScoreDetector::from_config(self)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Parameters of the synthetic stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_value: f64,
    /// Half-width of the uniform noise band.
    pub noise_level: f64,
    pub seasonal_amplitude: f64,
    /// Per-step probability of multiplying the value by a factor in [1.5, 3).
    pub anomaly_probability: f64,
    /// Seasonal period in time steps.
    pub period: u64,
    /// Fixed RNG seed for reproducible streams.
    pub seed: Option<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_value: 100.0,
            noise_level: 15.0,
            seasonal_amplitude: 10.0,
            anomaly_probability: 0.01,
            period: 100,
            seed: None,
        }
    }
}

impl SourceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_value.is_finite() {
            return Err(ConfigError::InvalidSource {
                name: "base_value",
                reason: "must be finite".to_string(),
            });
        }
        if !self.seasonal_amplitude.is_finite() {
            return Err(ConfigError::InvalidSource {
                name: "seasonal_amplitude",
                reason: "must be finite".to_string(),
            });
        }
        // The noise band spans twice the level and must stay representable.
        if !(2.0 * self.noise_level).is_finite() || self.noise_level < 0.0 {
            return Err(ConfigError::InvalidSource {
                name: "noise_level",
                reason: format!("must be a finite non-negative number, got {}", self.noise_level),
            });
        }
        if !(0.0..=1.0).contains(&self.anomaly_probability) {
            return Err(ConfigError::InvalidSource {
                name: "anomaly_probability",
                reason: format!("must be within [0, 1], got {}", self.anomaly_probability),
            });
        }
        if self.period == 0 {
            return Err(ConfigError::InvalidSource {
                name: "period",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// The run stops once a point with a time beyond this has been consumed.
    pub max_time: u64,
    /// Number of recent points kept for display.
    pub history: usize,
    pub format: OutputFormat,
    /// Pause between points, in milliseconds. 0 runs flat out.
    pub interval_ms: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            max_time: 1000,
            history: 100,
            format: OutputFormat::Text,
            interval_ms: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit logs as JSON objects.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
