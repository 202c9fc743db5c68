//! Mean-maximal effort extraction.
//!
//! Finds the best sustained value for each canonical duration within one
//! activity's sample series using prefix sums, so each duration costs a single
//! pass over the series.

use chrono::NaiveDate;

use super::types::{DurationBuckets, Effort, Metric, Sample};

/// Why a sample series was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesDefect {
    Empty,
    /// Elapsed seconds not strictly increasing at this index.
    NonMonotonic(usize),
    /// Skipped seconds before this index; windows are counted in samples.
    Gap(usize),
    /// Value unusable for the metric at this index.
    InvalidValue(usize),
}

/// Check that a series can be trusted as a whole.
pub fn validate_series(samples: &[Sample], metric: Metric) -> Result<(), SeriesDefect> {
    if samples.is_empty() {
        return Err(SeriesDefect::Empty);
    }

    for (i, sample) in samples.iter().enumerate() {
        if !metric.is_valid_value(sample.value) {
            return Err(SeriesDefect::InvalidValue(i));
        }
        if i > 0 {
            let previous = samples[i - 1].elapsed_secs;
            if sample.elapsed_secs <= previous {
                return Err(SeriesDefect::NonMonotonic(i));
            }
            if sample.elapsed_secs - previous != 1 {
                return Err(SeriesDefect::Gap(i));
            }
        }
    }

    Ok(())
}

/// Extracts mean-maximal efforts from sample series.
#[derive(Debug, Clone, Default)]
pub struct EffortExtractor {
    buckets: DurationBuckets,
}

impl EffortExtractor {
    /// Create an extractor for the given bucket set.
    pub fn new(buckets: DurationBuckets) -> Self {
        Self { buckets }
    }

    /// Create with standard buckets.
    pub fn standard() -> Self {
        Self::new(DurationBuckets::standard())
    }

    pub fn buckets(&self) -> &DurationBuckets {
        &self.buckets
    }

    /// Best sustained value per bucket over a 1 Hz series.
    ///
    /// Durations longer than the series produce no effort. A malformed series
    /// produces no efforts at all.
    pub fn extract(
        &self,
        samples: &[Sample],
        metric: Metric,
        achieved_on: NaiveDate,
    ) -> Vec<Effort> {
        if let Err(defect) = validate_series(samples, metric) {
            tracing::warn!(?defect, %achieved_on, "Discarding malformed sample series");
            return Vec::new();
        }

        let prefix_sum = prefix_sums(samples);
        let n = samples.len();

        self.buckets
            .iter()
            .filter(|&duration| duration as usize <= n)
            .filter_map(|duration| {
                best_window_average(&prefix_sum, duration as usize, metric)
                    .map(|value| Effort::new(duration, value, achieved_on))
            })
            .collect()
    }

    /// Best sustained value for a single duration.
    pub fn extract_single(
        &self,
        samples: &[Sample],
        metric: Metric,
        duration_secs: u32,
    ) -> Option<f64> {
        if duration_secs == 0 || duration_secs as usize > samples.len() {
            return None;
        }
        validate_series(samples, metric).ok()?;

        let prefix_sum = prefix_sums(samples);
        best_window_average(&prefix_sum, duration_secs as usize, metric)
    }
}

fn prefix_sums(samples: &[Sample]) -> Vec<f64> {
    let mut prefix_sum = vec![0.0; samples.len() + 1];
    for (i, sample) in samples.iter().enumerate() {
        prefix_sum[i + 1] = prefix_sum[i] + sample.value;
    }
    prefix_sum
}

fn best_window_average(prefix_sum: &[f64], window_size: usize, metric: Metric) -> Option<f64> {
    let n = prefix_sum.len().checked_sub(1)?;
    if window_size == 0 || window_size > n {
        return None;
    }

    let mut best: Option<f64> = None;
    for end in window_size..=n {
        let avg = (prefix_sum[end] - prefix_sum[end - window_size]) / window_size as f64;
        best = match best {
            Some(current) if !metric.is_better(avg, current) => Some(current),
            _ => Some(avg),
        };
    }

    best
}
