//! Post-activity analytics updates.
//!
//! Runs the per-activity pipeline after an activity is stored:
//! - extract efforts and update the power-duration profile
//! - refit CP when a bucket in the CP range improved
//! - compute TSS and append the new day(s) to the PMC

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::critical_power::{CpEstimator, CpFit, CpProtocol};
use super::effort::EffortExtractor;
use super::error::AnalyticsResult;
use super::pdc::PowerDurationProfile;
use super::training_load::{DayInput, TrainingDayRecord, TrainingLoadAccumulator};
use super::tss::training_stress_score;
use super::types::{Effort, Metric, Sample};
use crate::storage::config::AnalyticsConfig;

/// One stored activity.
#[derive(Debug, Clone, Copy)]
pub struct ActivityInput<'a> {
    pub date: NaiveDate,
    pub samples: &'a [Sample],
    pub duration_minutes: f64,
    /// Score supplied by the caller; takes precedence over the power formula.
    pub tss: Option<f64>,
}

/// Result from analytics trigger operations.
#[derive(Debug, Default, Serialize)]
pub struct TriggerResult {
    /// Efforts extracted from the activity.
    pub efforts: Vec<Effort>,
    /// Efforts that set a new all-time best
    pub improved: Vec<Effort>,
    /// New CP fit if one was attempted
    pub cp_fit: Option<CpFit>,
    pub tss: Option<f64>,
    /// PMC days produced, including zero days for any gap
    pub new_days: Vec<TrainingDayRecord>,
    /// Activity predates the last PMC day; the caller must recompute the series.
    pub needs_recompute: bool,
}

/// Analytics triggers for post-activity updates.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsTriggers {
    extractor: EffortExtractor,
    cp_estimator: CpEstimator,
    accumulator: TrainingLoadAccumulator,
}

impl AnalyticsTriggers {
    pub fn new(extractor: EffortExtractor, cp_estimator: CpEstimator) -> Self {
        Self {
            extractor,
            cp_estimator,
            accumulator: TrainingLoadAccumulator::new(),
        }
    }

    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self::new(
            EffortExtractor::new(config.durations.clone()),
            config.critical_power.estimator(),
        )
    }

    /// Extract efforts and ingest them. Returns (all efforts, improved efforts).
    pub fn update_profile(
        &self,
        activity: &ActivityInput<'_>,
        profile: &mut PowerDurationProfile,
    ) -> AnalyticsResult<(Vec<Effort>, Vec<Effort>)> {
        profile.ensure_compatible(self.extractor.buckets())?;

        let efforts = self
            .extractor
            .extract(activity.samples, profile.metric(), activity.date);
        let improved = profile.ingest_activity(&efforts)?;
        Ok((efforts, improved))
    }

    /// Refit CP if an improved effort falls in the CP range and enough data exists.
    pub fn maybe_refit_cp(
        &self,
        improved: &[Effort],
        profile: &PowerDurationProfile,
    ) -> Option<CpFit> {
        if profile.metric() != Metric::Power {
            return None;
        }

        let (min, max) = self.cp_estimator.duration_range();
        let cp_range_updated = improved
            .iter()
            .any(|e| e.duration_secs >= min && e.duration_secs <= max);
        if !cp_range_updated || !profile.has_sufficient_data_for_cp(min, max) {
            return None;
        }

        let candidates = profile.cp_candidates(min, max);
        Some(
            self.cp_estimator
                .estimate(&candidates, CpProtocol::PowerDurationProfile),
        )
    }

    /// TSS for an activity: the supplied score, else the power formula at `ftp`.
    pub fn activity_tss(
        &self,
        activity: &ActivityInput<'_>,
        metric: Metric,
        ftp: Option<f64>,
    ) -> Option<f64> {
        if let Some(tss) = activity.tss {
            return Some(tss);
        }
        match (metric, ftp) {
            (Metric::Power, Some(ftp)) => training_stress_score(activity.samples, ftp),
            _ => None,
        }
    }

    /// Append a day to the PMC. Returns the new records and whether a full
    /// recompute is required instead.
    pub fn update_training_load(
        &self,
        date: NaiveDate,
        input: DayInput,
        last_day: Option<&TrainingDayRecord>,
    ) -> AnalyticsResult<(Vec<TrainingDayRecord>, bool)> {
        match last_day {
            Some(last) if date <= last.date => Ok((Vec::new(), true)),
            Some(last) => Ok((self.accumulator.append_day(last, date, input)?, false)),
            None => {
                let mut days = BTreeMap::new();
                days.insert(date, input);
                Ok((self.accumulator.recompute_series(&days, None, None), false))
            }
        }
    }

    /// Run all triggers after an activity is stored.
    pub fn on_activity(
        &self,
        activity: &ActivityInput<'_>,
        profile: &mut PowerDurationProfile,
        ftp: Option<f64>,
        last_day: Option<&TrainingDayRecord>,
    ) -> AnalyticsResult<TriggerResult> {
        let mut result = TriggerResult::default();

        let (efforts, improved) = self.update_profile(activity, profile)?;
        result.cp_fit = self.maybe_refit_cp(&improved, profile);
        result.efforts = efforts;
        result.improved = improved;

        result.tss = self.activity_tss(activity, profile.metric(), ftp);
        if let Some(tss) = result.tss {
            let input = DayInput::new(tss, activity.duration_minutes);
            let (new_days, needs_recompute) =
                self.update_training_load(activity.date, input, last_day)?;
            result.new_days = new_days;
            result.needs_recompute = needs_recompute;
        }

        tracing::debug!(
            date = %activity.date,
            efforts = result.efforts.len(),
            improved = result.improved.len(),
            cp_refit = result.cp_fit.is_some(),
            tss = ?result.tss,
            "Activity analytics updated"
        );

        Ok(result)
    }
}
