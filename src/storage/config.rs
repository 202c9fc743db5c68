//! Analytics configuration.
//!
//! Loaded from TOML. Missing files and missing keys fall back to defaults.
//! The PMC time constants (42/7 days) are fixed and not configurable.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::metrics::analytics::critical_power::CpEstimator;
use crate::metrics::analytics::threshold::ThresholdResolver;
use crate::metrics::analytics::types::DurationBuckets;

/// Top-level analytics configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Effort durations in seconds, shared by extractor and profile.
    pub durations: DurationBuckets,
    /// CP fitting settings
    pub critical_power: CriticalPowerSettings,
    /// FTP resolution settings
    pub threshold: ThresholdSettings,
}

/// CP fitting settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriticalPowerSettings {
    /// Relative residual above which an effort is dropped before the refit
    pub residual_tolerance: f64,
    pub min_duration_secs: u32,
    pub max_duration_secs: u32,
}

impl Default for CriticalPowerSettings {
    fn default() -> Self {
        Self {
            residual_tolerance: 0.05,
            min_duration_secs: 120,
            max_duration_secs: 1200,
        }
    }
}

impl CriticalPowerSettings {
    pub fn estimator(&self) -> CpEstimator {
        CpEstimator::new()
            .with_tolerance(self.residual_tolerance)
            .with_range(self.min_duration_secs, self.max_duration_secs)
    }
}

/// FTP resolution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdSettings {
    /// Lab results older than this are stale
    pub lab_max_age_days: u32,
    /// CP tests older than this are stale
    pub cp_max_age_days: u32,
    /// Window of the profile used for MMP-derived FTP
    pub mmp_window_days: u32,
    /// Relative FTP change worth reporting (0.05 = 5%)
    pub significant_change: f64,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            lab_max_age_days: 120,
            cp_max_age_days: 60,
            mmp_window_days: 90,
            significant_change: 0.05,
        }
    }
}

impl ThresholdSettings {
    pub fn resolver(&self) -> ThresholdResolver {
        ThresholdResolver::new()
            .with_max_ages(self.lab_max_age_days, self.cp_max_age_days)
            .with_mmp_window(self.mmp_window_days)
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "rustload", "RustLoad")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the default configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load configuration from `path`, or defaults if the file does not exist.
pub fn load_config(path: &Path) -> Result<AnalyticsConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        return Ok(AnalyticsConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let config: AnalyticsConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    config.validate()?;

    Ok(config)
}

/// Save configuration to `path`.
pub fn save_config(config: &AnalyticsConfig, path: &Path) -> Result<(), ConfigError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

impl AnalyticsConfig {
    /// Check values serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cp = &self.critical_power;
        if !(cp.residual_tolerance > 0.0 && cp.residual_tolerance.is_finite()) {
            return Err(ConfigError::InvalidValue(format!(
                "critical_power.residual_tolerance must be positive, got {}",
                cp.residual_tolerance
            )));
        }
        if cp.min_duration_secs == 0 || cp.min_duration_secs >= cp.max_duration_secs {
            return Err(ConfigError::InvalidValue(format!(
                "critical_power duration range {}..{} is empty",
                cp.min_duration_secs, cp.max_duration_secs
            )));
        }

        let threshold = &self.threshold;
        if threshold.mmp_window_days == 0 {
            return Err(ConfigError::InvalidValue(
                "threshold.mmp_window_days must be at least 1".to_string(),
            ));
        }
        if !(threshold.significant_change >= 0.0 && threshold.significant_change.is_finite()) {
            return Err(ConfigError::InvalidValue(format!(
                "threshold.significant_change must be non-negative, got {}",
                threshold.significant_change
            )));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
