//! Training Load calculations (CTL/ATL/TSB).
//!
//! Implements the Performance Management Chart (PMC) model:
//! - CTL (Chronic Training Load): `ctl += (tss - ctl) / 42`
//! - ATL (Acute Training Load): `atl += (tss - atl) / 7`
//! - TSB (Training Stress Balance): CTL - ATL
//!
//! Every calendar day gets a record. Days without activity carry zero TSS so
//! both averages keep decaying.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::{AnalyticsError, AnalyticsResult};

/// CTL time constant in days. Fixed policy, not fitted.
pub const CTL_TIME_CONSTANT_DAYS: f64 = 42.0;
/// ATL time constant in days. Fixed policy, not fitted.
pub const ATL_TIME_CONSTANT_DAYS: f64 = 7.0;

/// One activity's load, as supplied by the TSS step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityLoad {
    pub date: NaiveDate,
    pub tss: f64,
    #[serde(default)]
    pub duration_minutes: f64,
}

/// Total load for one calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DayInput {
    pub tss: f64,
    pub duration_minutes: f64,
}

impl DayInput {
    pub fn new(tss: f64, duration_minutes: f64) -> Self {
        Self {
            tss,
            duration_minutes,
        }
    }
}

/// PMC values for one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingDayRecord {
    pub date: NaiveDate,
    /// Total TSS for the day.
    pub tss: f64,
    pub ctl: f64,
    pub atl: f64,
    /// Always `ctl - atl`.
    pub tsb: f64,
    pub duration_minutes: f64,
}

/// CTL/ATL at the end of a day, used to seed a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadState {
    pub date: NaiveDate,
    pub ctl: f64,
    pub atl: f64,
}

impl From<&TrainingDayRecord> for LoadState {
    fn from(record: &TrainingDayRecord) -> Self {
        Self {
            date: record.date,
            ctl: record.ctl,
            atl: record.atl,
        }
    }
}

/// Sum activities into per-day totals.
///
/// Each activity's TSS and duration are sanitized before summing, so one
/// unusable activity counts as zero without affecting the rest of its day.
pub fn daily_totals(activities: &[ActivityLoad]) -> BTreeMap<NaiveDate, DayInput> {
    let mut days: BTreeMap<NaiveDate, DayInput> = BTreeMap::new();
    for activity in activities {
        let day = days.entry(activity.date).or_default();
        day.tss += sanitize(activity.tss);
        day.duration_minutes += sanitize(activity.duration_minutes);
    }
    days
}

/// Training load accumulator.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrainingLoadAccumulator;

impl TrainingLoadAccumulator {
    pub fn new() -> Self {
        Self
    }

    /// Apply one day of the recurrence to the previous day's CTL/ATL.
    pub fn calculate_day(
        &self,
        prev_ctl: f64,
        prev_atl: f64,
        date: NaiveDate,
        input: DayInput,
    ) -> TrainingDayRecord {
        let tss = sanitize(input.tss);
        let ctl = prev_ctl + (tss - prev_ctl) / CTL_TIME_CONSTANT_DAYS;
        let atl = prev_atl + (tss - prev_atl) / ATL_TIME_CONSTANT_DAYS;

        TrainingDayRecord {
            date,
            tss,
            ctl,
            atl,
            tsb: ctl - atl,
            duration_minutes: sanitize(input.duration_minutes),
        }
    }

    /// Day-by-day series over the inputs, filling missing days with zero TSS.
    ///
    /// Without a seed the series starts cold on the first input date; with one
    /// it starts the day after the seed and inputs on or before it are ignored.
    /// `through` extends (or cuts) the series to that date.
    pub fn series<'a>(
        &self,
        days: &'a BTreeMap<NaiveDate, DayInput>,
        seed: Option<LoadState>,
        through: Option<NaiveDate>,
    ) -> LoadSeries<'a> {
        let start = match seed {
            Some(state) => state.date.succ_opt(),
            None => days.keys().next().copied(),
        };
        let last_input = days.keys().next_back().copied();
        let end = through.or(last_input);

        let (next, end) = match (start, end) {
            (Some(start), Some(end)) if start <= end => (Some(start), end),
            (_, end) => (None, end.or(start).unwrap_or(NaiveDate::MIN)),
        };

        LoadSeries {
            accumulator: *self,
            days,
            ctl: seed.map_or(0.0, |s| s.ctl),
            atl: seed.map_or(0.0, |s| s.atl),
            next,
            end,
        }
    }

    /// Full recomputation. Same inputs always give the same series.
    pub fn recompute_series(
        &self,
        days: &BTreeMap<NaiveDate, DayInput>,
        seed: Option<LoadState>,
        through: Option<NaiveDate>,
    ) -> Vec<TrainingDayRecord> {
        self.series(days, seed, through).collect()
    }

    /// Incremental update after `previous`, including zero days for any gap.
    pub fn append_day(
        &self,
        previous: &TrainingDayRecord,
        date: NaiveDate,
        input: DayInput,
    ) -> AnalyticsResult<Vec<TrainingDayRecord>> {
        if date <= previous.date {
            return Err(AnalyticsError::NonMonotonicDate {
                previous: previous.date,
                next: date,
            });
        }

        let mut days = BTreeMap::new();
        days.insert(date, input);
        Ok(self.recompute_series(&days, Some(LoadState::from(previous)), Some(date)))
    }
}

/// Iterator over consecutive PMC days. See [`TrainingLoadAccumulator::series`].
#[derive(Debug, Clone)]
pub struct LoadSeries<'a> {
    accumulator: TrainingLoadAccumulator,
    days: &'a BTreeMap<NaiveDate, DayInput>,
    ctl: f64,
    atl: f64,
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl LoadSeries<'_> {
    /// Days left to produce.
    pub fn remaining(&self) -> usize {
        self.next
            .map_or(0, |next| ((self.end - next).num_days() + 1).max(0) as usize)
    }
}

impl Iterator for LoadSeries<'_> {
    type Item = TrainingDayRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let date = self.next?;
        if date > self.end {
            self.next = None;
            return None;
        }

        let input = self.days.get(&date).copied().unwrap_or_default();
        let record = self
            .accumulator
            .calculate_day(self.ctl, self.atl, date, input);
        self.ctl = record.ctl;
        self.atl = record.atl;
        self.next = if date < self.end { date.succ_opt() } else { None };

        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
