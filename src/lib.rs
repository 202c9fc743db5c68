//! RustLoad - Training Load & Power-Duration Analytics
//!
//! Turns recorded activity streams into mean-maximal efforts, keeps
//! power-duration profiles, fits Critical Power, resolves FTP from tiered
//! sources and tracks fitness/fatigue with the PMC model.

pub mod metrics;
pub mod report;
pub mod storage;

// Re-export commonly used types
pub use metrics::analytics::{AnalyticsTriggers, PowerDurationProfile, ThresholdResolver};
pub use report::{build_report, AthleteHistory, AthleteReport};
pub use storage::config::AnalyticsConfig;
