//! Pipeline configuration
//!
//! All tunables for a forecast run live here. Every knob has a default
//! except `random_seed`: reproducibility of the importance ranking is a hard
//! requirement, so the seed must always be supplied explicitly (in code, on
//! the CLI, or in the config file) and is never drawn from ambient entropy.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration for one pipeline invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of trailing weeks averaged for the trend delta
    #[serde(default = "default_trend_window")]
    pub trend_window_size: usize,

    /// Number of weeks to forecast forward
    #[serde(default = "default_horizon")]
    pub forecast_horizon: usize,

    /// Importance share above which a dominant Deal Close lever is called
    /// out as a conversion bottleneck
    #[serde(default = "default_dominant_threshold")]
    pub dominant_lever_threshold: f64,

    /// Training-row count below which a low-sample warning is attached to
    /// the importance output
    #[serde(default = "default_low_sample_threshold")]
    pub low_sample_warning_threshold: usize,

    /// Seed for the model's subsampling RNG. Required - no default.
    pub random_seed: u64,
}

fn default_trend_window() -> usize {
    4
}

fn default_horizon() -> usize {
    4
}

fn default_dominant_threshold() -> f64 {
    0.5
}

fn default_low_sample_threshold() -> usize {
    8
}

impl PipelineConfig {
    /// Create a config with all defaults and the given seed
    pub fn with_seed(random_seed: u64) -> Self {
        Self {
            trend_window_size: default_trend_window(),
            forecast_horizon: default_horizon(),
            dominant_lever_threshold: default_dominant_threshold(),
            low_sample_warning_threshold: default_low_sample_threshold(),
            random_seed,
        }
    }

    /// Load configuration from a TOML file
    ///
    /// A file without `random_seed` is rejected.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Sanity-check option values
    pub fn validate(&self) -> Result<()> {
        if self.trend_window_size == 0 {
            return Err(Error::Config("trend_window_size must be at least 1".into()));
        }
        if self.forecast_horizon == 0 {
            return Err(Error::Config("forecast_horizon must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.dominant_lever_threshold) {
            return Err(Error::Config(
                "dominant_lever_threshold must be between 0 and 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_with_seed() {
        let config = PipelineConfig::with_seed(42);
        assert_eq!(config.trend_window_size, 4);
        assert_eq!(config.forecast_horizon, 4);
        assert_eq!(config.dominant_lever_threshold, 0.5);
        assert_eq!(config.low_sample_warning_threshold, 8);
        assert_eq!(config.random_seed, 42);
    }

    #[test]
    fn test_toml_requires_seed() {
        let parsed: std::result::Result<PipelineConfig, _> =
            toml::from_str("trend_window_size = 6");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_toml_partial_overrides() {
        let config: PipelineConfig =
            toml::from_str("random_seed = 7\nforecast_horizon = 8").unwrap();
        assert_eq!(config.random_seed, 7);
        assert_eq!(config.forecast_horizon, 8);
        assert_eq!(config.trend_window_size, 4);
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let mut config = PipelineConfig::with_seed(1);
        config.trend_window_size = 0;
        assert!(config.validate().is_err());
    }
}
