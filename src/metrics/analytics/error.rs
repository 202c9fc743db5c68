//! Analytics error types.
//!
//! Only caller mistakes are errors. Sparse or missing data is reported through
//! `Option`, empty results and source tags instead.

use chrono::NaiveDate;
use thiserror::Error;

use super::types::Metric;

/// Errors that can occur during analytics calculations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Duration is not part of the bucket set being aggregated.
    #[error("Duration {0}s is not in the profile's bucket set")]
    UnknownDuration(u32),

    /// Two components were configured with different bucket sets.
    #[error("Duration bucket sets differ: expected {expected:?}, got {actual:?}")]
    BucketMismatch { expected: Vec<u32>, actual: Vec<u32> },

    /// Query asked for a window the profile does not track.
    #[error("Profile does not track a {0}-day window")]
    WindowNotTracked(u32),

    /// Component expected a different metric.
    #[error("Expected {expected:?} data, got {actual:?}")]
    MetricMismatch { expected: Metric, actual: Metric },

    /// Incremental load update for a date that is not after the previous record.
    #[error("Date {next} does not follow previous record {previous}")]
    NonMonotonicDate { previous: NaiveDate, next: NaiveDate },
}

/// Result type for analytics operations.
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
