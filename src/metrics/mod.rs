//! Metrics module for training analytics.

pub mod analytics;

// Re-export key analytics types for convenience
pub use analytics::{
    AnalyticsError, AnalyticsResult, AnalyticsTriggers, CpEstimator, CpFit, CpResult,
    DurationBuckets, Effort, EffortExtractor, FtpEstimate, FtpSource, Metric,
    PowerDurationProfile, Sample, Sport, ThresholdResolver, TrainingDayRecord,
    TrainingLoadAccumulator,
};
