//! Training analytics.
//!
//! This module provides:
//! - Effort extraction (mean-maximal windows per duration)
//! - Power-duration profile with all-time, windowed and most recent values
//! - Critical Power / W' model
//! - FTP resolution from lab, CP and profile data
//! - Training load (CTL/ATL/TSB) and PMC backfill

pub mod backfill;
pub mod cache;
pub mod critical_power;
pub mod effort;
pub mod error;
pub mod pdc;
pub mod threshold;
pub mod training_load;
pub mod triggers;
pub mod tss;
pub mod types;

// Re-exports for convenience
pub use backfill::{BackfillOutcome, BackfillRequest, PmcBackfill, PopulationLocks};
pub use cache::{ProfileCache, ProfileKey};
pub use critical_power::{
    CpEstimator, CpFit, CpProtocol, CpRefusal, CpResult, CpTestLog, RejectedEffort, RejectionReason,
};
pub use effort::{validate_series, EffortExtractor, SeriesDefect};
pub use error::{AnalyticsError, AnalyticsResult};
pub use pdc::{
    DatedValue, DurationSnapshot, PowerDurationProfile, PowerDurationRecord, ProfileWindow,
};
pub use threshold::{FtpEstimate, FtpSource, LabResult, Recency, ThresholdInputs, ThresholdResolver};
pub use training_load::{
    daily_totals, ActivityLoad, DayInput, LoadState, TrainingDayRecord, TrainingLoadAccumulator,
};
pub use triggers::{ActivityInput, AnalyticsTriggers, TriggerResult};
pub use tss::{intensity_factor, normalized_power, training_stress_score};
pub use types::{series_from_values, AthleteId, DurationBuckets, Effort, Metric, Sample, Sport};
