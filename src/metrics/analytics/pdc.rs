//! Power-duration profile.
//!
//! Aggregates efforts from many activities into one record per duration
//! bucket. Each record tracks three values that answer different questions
//! and are never merged:
//! - most recent effort (current fitness)
//! - all-time best
//! - best inside the active trailing window

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::{AnalyticsError, AnalyticsResult};
use super::types::{AthleteId, DurationBuckets, Effort, Metric, Sport};

/// Relative difference below which two window averages count as the same effort.
const SAME_VALUE_TOLERANCE: f64 = 1e-9;

/// A value and the date it was achieved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatedValue {
    pub value: f64,
    pub achieved_on: NaiveDate,
}

/// Tracked values for one duration bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerDurationRecord {
    /// Duration bucket in seconds.
    pub duration_secs: u32,
    /// Best value ever ingested.
    pub all_time_best: Option<DatedValue>,
    /// Best value inside the profile window, if one is active.
    pub range_best: Option<DatedValue>,
    /// Value from the newest activity.
    pub most_recent: Option<DatedValue>,
}

impl PowerDurationRecord {
    fn empty(duration_secs: u32) -> Self {
        Self {
            duration_secs,
            all_time_best: None,
            range_best: None,
            most_recent: None,
        }
    }

    /// Date the all-time best was achieved.
    pub fn achieved_on(&self) -> Option<NaiveDate> {
        self.all_time_best.map(|v| v.achieved_on)
    }

    pub fn is_empty(&self) -> bool {
        self.all_time_best.is_none()
    }
}

/// Trailing window of `days` calendar days ending on `as_of` (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileWindow {
    pub as_of: NaiveDate,
    pub days: u32,
}

impl ProfileWindow {
    pub fn new(as_of: NaiveDate, days: u32) -> Self {
        Self { as_of, days }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        let age = (self.as_of - date).num_days();
        age >= 0 && age < i64::from(self.days)
    }
}

/// Query result for one bucket.
///
/// Missing data is reported as zero; callers must read zero as "no data".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationSnapshot {
    pub duration_secs: u32,
    /// Most recent value.
    pub current: f64,
    /// Window best when a window was requested, otherwise all-time best.
    pub best: f64,
    pub all_time_best: f64,
    /// Date `best` was achieved.
    pub best_achieved_on: Option<NaiveDate>,
}

impl DurationSnapshot {
    pub fn is_empty(&self) -> bool {
        self.current == 0.0 && self.best == 0.0 && self.all_time_best == 0.0
    }
}

/// Power-duration (or pace-duration) profile for one athlete and sport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerDurationProfile {
    athlete: AthleteId,
    sport: Sport,
    metric: Metric,
    buckets: DurationBuckets,
    window: Option<ProfileWindow>,
    records: Vec<PowerDurationRecord>,
}

impl PowerDurationProfile {
    /// Create an empty profile with one record per bucket.
    pub fn new(athlete: AthleteId, sport: Sport, metric: Metric, buckets: DurationBuckets) -> Self {
        let records = buckets.iter().map(PowerDurationRecord::empty).collect();
        Self {
            athlete,
            sport,
            metric,
            buckets,
            window: None,
            records,
        }
    }

    /// Track the best value inside a trailing window as well.
    pub fn with_window(mut self, window: ProfileWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn athlete(&self) -> AthleteId {
        self.athlete
    }

    pub fn sport(&self) -> Sport {
        self.sport
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn buckets(&self) -> &DurationBuckets {
        &self.buckets
    }

    pub fn window(&self) -> Option<ProfileWindow> {
        self.window
    }

    /// Fail unless `other` is exactly this profile's bucket set.
    pub fn ensure_compatible(&self, other: &DurationBuckets) -> AnalyticsResult<()> {
        if &self.buckets != other {
            return Err(AnalyticsError::BucketMismatch {
                expected: self.buckets.as_slice().to_vec(),
                actual: other.as_slice().to_vec(),
            });
        }
        Ok(())
    }

    /// Ingest one effort. Returns true if the all-time best improved.
    ///
    /// Exact ties keep the earlier date.
    pub fn ingest(&mut self, effort: &Effort) -> AnalyticsResult<bool> {
        if !self.metric.is_valid_value(effort.value) {
            return Err(AnalyticsError::InvalidInput(format!(
                "effort value {} is not a valid {:?} value",
                effort.value, self.metric
            )));
        }

        let metric = self.metric;
        let window = self.window;
        let record = self.record_mut(effort.duration_secs)?;
        let candidate = DatedValue {
            value: effort.value,
            achieved_on: effort.achieved_on,
        };

        let newer = record
            .most_recent
            .map_or(true, |current| candidate.achieved_on > current.achieved_on);
        if newer {
            record.most_recent = Some(candidate);
        }

        let improved = replace_if_better(&mut record.all_time_best, candidate, metric);

        if window.is_some_and(|w| w.contains(effort.achieved_on)) {
            replace_if_better(&mut record.range_best, candidate, metric);
        }

        Ok(improved)
    }

    /// Ingest all efforts of one activity. Returns those that set a new all-time best.
    pub fn ingest_activity(&mut self, efforts: &[Effort]) -> AnalyticsResult<Vec<Effort>> {
        let mut improved = Vec::new();
        for effort in efforts {
            if self.ingest(effort)? {
                improved.push(*effort);
            }
        }
        Ok(improved)
    }

    /// Query one bucket. `window_days` must match the active window when given.
    pub fn query(
        &self,
        duration_secs: u32,
        window_days: Option<u32>,
    ) -> AnalyticsResult<DurationSnapshot> {
        let record = self.record(duration_secs)?;

        let best = match window_days {
            Some(days) => match self.window {
                Some(window) if window.days == days => record.range_best,
                _ => return Err(AnalyticsError::WindowNotTracked(days)),
            },
            None => record.all_time_best,
        };

        Ok(DurationSnapshot {
            duration_secs,
            current: record.most_recent.map_or(0.0, |v| v.value),
            best: best.map_or(0.0, |v| v.value),
            all_time_best: record.all_time_best.map_or(0.0, |v| v.value),
            best_achieved_on: best.map(|v| v.achieved_on),
        })
    }

    /// Best inside the active window, or all-time best when no window is active.
    pub fn window_best(&self, duration_secs: u32) -> Option<DatedValue> {
        let record = self.record(duration_secs).ok()?;
        match self.window {
            Some(_) => record.range_best,
            None => record.all_time_best,
        }
    }

    /// Record for a bucket.
    pub fn record(&self, duration_secs: u32) -> AnalyticsResult<&PowerDurationRecord> {
        self.records
            .binary_search_by_key(&duration_secs, |r| r.duration_secs)
            .map(|i| &self.records[i])
            .map_err(|_| AnalyticsError::UnknownDuration(duration_secs))
    }

    fn record_mut(&mut self, duration_secs: u32) -> AnalyticsResult<&mut PowerDurationRecord> {
        match self
            .records
            .binary_search_by_key(&duration_secs, |r| r.duration_secs)
        {
            Ok(i) => Ok(&mut self.records[i]),
            Err(_) => Err(AnalyticsError::UnknownDuration(duration_secs)),
        }
    }

    /// All records, sorted by duration, for charting.
    pub fn records(&self) -> &[PowerDurationRecord] {
        &self.records
    }

    /// Window-best efforts with durations in `[min_secs, max_secs]`.
    ///
    /// A bucket whose best is no better than a longer bucket's best is left
    /// out: its value comes from inside a longer effort, so it was never
    /// ridden maximally. Returned in ascending duration order.
    pub fn cp_candidates(&self, min_secs: u32, max_secs: u32) -> Vec<Effort> {
        let mut candidates: Vec<Effort> = Vec::new();
        let mut longer_best: Option<f64> = None;

        for record in self.records.iter().rev() {
            if record.duration_secs < min_secs || record.duration_secs > max_secs {
                continue;
            }
            let Some(best) = self.window_best(record.duration_secs) else {
                continue;
            };
            if longer_best.is_some_and(|longer| !self.clearly_better(best.value, longer)) {
                continue;
            }
            longer_best = Some(best.value);
            candidates.push(Effort::new(record.duration_secs, best.value, best.achieved_on));
        }

        candidates.reverse();
        candidates
    }

    /// Better by more than averaging noise.
    fn clearly_better(&self, candidate: f64, current: f64) -> bool {
        self.metric.is_better(candidate, current)
            && (candidate - current).abs() > current.abs() * SAME_VALUE_TOLERANCE
    }

    /// Check whether 3+ buckets in the CP range hold data.
    pub fn has_sufficient_data_for_cp(&self, min_secs: u32, max_secs: u32) -> bool {
        self.cp_candidates(min_secs, max_secs).len() >= 3
    }

    pub fn is_empty(&self) -> bool {
        self.records.iter().all(PowerDurationRecord::is_empty)
    }
}

fn replace_if_better(slot: &mut Option<DatedValue>, candidate: DatedValue, metric: Metric) -> bool {
    let replace = match slot {
        None => true,
        Some(current) => {
            metric.is_better(candidate.value, current.value)
                || (candidate.value == current.value && candidate.achieved_on < current.achieved_on)
        }
    };
    if replace {
        *slot = Some(candidate);
    }
    replace
}
