//! Storage module for configuration.

pub mod config;

pub use config::{
    get_config_path, get_data_dir, load_config, save_config, AnalyticsConfig, ConfigError,
    CriticalPowerSettings, ThresholdSettings,
};
