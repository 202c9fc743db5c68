//! Shared analytics types.
//!
//! Sample series, efforts and the canonical duration bucket set used by every
//! analytics component.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{AnalyticsError, AnalyticsResult};

/// Athlete identifier.
pub type AthleteId = Uuid;

/// Sport an activity or record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    Cycling,
    Running,
    Swimming,
    Rowing,
}

impl Sport {
    /// Metric tracked for this sport's duration curve.
    pub fn default_metric(&self) -> Metric {
        match self {
            Sport::Cycling | Sport::Rowing => Metric::Power,
            Sport::Running | Sport::Swimming => Metric::Pace,
        }
    }
}

impl std::fmt::Display for Sport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sport::Cycling => write!(f, "cycling"),
            Sport::Running => write!(f, "running"),
            Sport::Swimming => write!(f, "swimming"),
            Sport::Rowing => write!(f, "rowing"),
        }
    }
}

/// Sampled metric and its polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Power in watts, higher is better.
    Power,
    /// Pace in seconds per kilometre, lower is better.
    Pace,
}

impl Metric {
    /// Whether `candidate` strictly beats `current`.
    pub fn is_better(self, candidate: f64, current: f64) -> bool {
        match self {
            Metric::Power => candidate > current,
            Metric::Pace => candidate < current,
        }
    }

    /// Whether a raw sample value is usable for this metric.
    pub fn is_valid_value(self, value: f64) -> bool {
        match self {
            Metric::Power => value.is_finite() && value >= 0.0,
            // A zero pace would mean infinite speed.
            Metric::Pace => value.is_finite() && value > 0.0,
        }
    }
}

/// One sample of an activity's series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Elapsed seconds since the activity started.
    pub elapsed_secs: u32,
    /// Power in watts or pace in seconds per kilometre.
    pub value: f64,
}

impl Sample {
    pub fn new(elapsed_secs: u32, value: f64) -> Self {
        Self {
            elapsed_secs,
            value,
        }
    }
}

/// Build a 1 Hz series from consecutive values, starting at second 0.
pub fn series_from_values(values: &[f64]) -> Vec<Sample> {
    values
        .iter()
        .enumerate()
        .map(|(i, &value)| Sample::new(i as u32, value))
        .collect()
}

/// Best sustained value for one duration, tagged with the activity date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Effort {
    /// Duration in seconds.
    pub duration_secs: u32,
    /// Mean value over the window (watts or seconds per kilometre).
    pub value: f64,
    /// Date of the activity the effort came from.
    pub achieved_on: NaiveDate,
}

impl Effort {
    pub fn new(duration_secs: u32, value: f64, achieved_on: NaiveDate) -> Self {
        Self {
            duration_secs,
            value,
            achieved_on,
        }
    }
}

/// Ordered, de-duplicated set of canonical durations.
///
/// Every profile and extractor that exchange efforts must share the same set;
/// buckets are matched exactly, never interpolated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct DurationBuckets(Vec<u32>);

impl DurationBuckets {
    /// Build a bucket set. Rejects an empty set or a zero-second bucket.
    pub fn new(durations: &[u32]) -> AnalyticsResult<Self> {
        if durations.is_empty() {
            return Err(AnalyticsError::InvalidInput(
                "duration bucket set cannot be empty".to_string(),
            ));
        }
        if durations.contains(&0) {
            return Err(AnalyticsError::InvalidInput(
                "duration buckets must be at least 1 second".to_string(),
            ));
        }

        let mut sorted = durations.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        Ok(Self(sorted))
    }

    /// Standard buckets from 5 s to 1 h.
    pub fn standard() -> Self {
        Self(vec![
            5, 15, 30, 60, // seconds
            120, 180, 300, 600, 1200, // 2-20 min
            1800, 3600, // 30-60 min
        ])
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn contains(&self, duration_secs: u32) -> bool {
        self.0.binary_search(&duration_secs).is_ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

impl Default for DurationBuckets {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<Vec<u32>> for DurationBuckets {
    type Error = AnalyticsError;

    fn try_from(value: Vec<u32>) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<DurationBuckets> for Vec<u32> {
    fn from(value: DurationBuckets) -> Self {
        value.0
    }
}
