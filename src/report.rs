//! Athlete analytics report.
//!
//! Runs every component over one athlete's recorded history and collects
//! the results into a single serializable report.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::metrics::analytics::critical_power::{CpFit, CpProtocol, CpResult};
use crate::metrics::analytics::effort::EffortExtractor;
use crate::metrics::analytics::error::AnalyticsResult;
use crate::metrics::analytics::pdc::{DurationSnapshot, PowerDurationProfile, ProfileWindow};
use crate::metrics::analytics::threshold::{FtpEstimate, LabResult, ThresholdInputs};
use crate::metrics::analytics::training_load::{
    daily_totals, ActivityLoad, TrainingDayRecord, TrainingLoadAccumulator,
};
use crate::metrics::analytics::tss::training_stress_score;
use crate::metrics::analytics::types::{series_from_values, AthleteId, Metric, Sport};
use crate::storage::config::AnalyticsConfig;

/// Number of trailing PMC days included in a report.
pub const PMC_TAIL_DAYS: usize = 14;

/// One recorded activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedActivity {
    pub date: NaiveDate,
    #[serde(default)]
    pub duration_minutes: f64,
    /// 1 Hz values (watts or seconds per km).
    #[serde(default)]
    pub samples: Vec<f64>,
    /// Score computed elsewhere; used as-is when present.
    #[serde(default)]
    pub tss: Option<f64>,
}

/// Everything recorded for one athlete and sport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthleteHistory {
    pub athlete_id: AthleteId,
    pub sport: Sport,
    /// Defaults to the sport's usual metric.
    #[serde(default)]
    pub metric: Option<Metric>,
    /// FTP currently in use, for change detection.
    #[serde(default)]
    pub current_ftp: Option<f64>,
    #[serde(default)]
    pub activities: Vec<RecordedActivity>,
    #[serde(default)]
    pub labs: Vec<LabResult>,
    #[serde(default)]
    pub cp_tests: Vec<CpResult>,
}

/// FTP change against the athlete's current value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FtpChange {
    pub current: f64,
    /// Fraction of `current` (0.05 = 5%).
    pub relative: f64,
    pub significant: bool,
}

/// Report for one athlete and sport.
#[derive(Debug, Clone, Serialize)]
pub struct AthleteReport {
    pub athlete_id: AthleteId,
    pub sport: Sport,
    pub metric: Metric,
    pub as_of: NaiveDate,
    pub window_days: u32,
    pub activities_used: usize,
    /// One entry per duration bucket; zeros mean no data.
    pub profile: Vec<DurationSnapshot>,
    /// Fit over the profile's windowed bests, if enough buckets hold data.
    pub cp_fit: Option<CpFit>,
    pub ftp: FtpEstimate,
    pub ftp_change: Option<FtpChange>,
    /// Most recent PMC day, on or before `as_of`.
    pub pmc: Option<TrainingDayRecord>,
    pub pmc_tail: Vec<TrainingDayRecord>,
}

/// Build a report from an athlete's history as of a given date.
///
/// Activities dated after `as_of` are ignored.
pub fn build_report(
    history: &AthleteHistory,
    config: &AnalyticsConfig,
    as_of: NaiveDate,
) -> AnalyticsResult<AthleteReport> {
    let metric = history.metric.unwrap_or_else(|| history.sport.default_metric());
    let window_days = config.threshold.mmp_window_days;

    let mut activities: Vec<&RecordedActivity> = history
        .activities
        .iter()
        .filter(|a| a.date <= as_of)
        .collect();
    activities.sort_by_key(|a| a.date);

    let skipped = history.activities.len() - activities.len();
    if skipped > 0 {
        tracing::debug!(skipped, %as_of, "Ignoring activities after report date");
    }

    // Profile
    let extractor = EffortExtractor::new(config.durations.clone());
    let mut profile = PowerDurationProfile::new(
        history.athlete_id,
        history.sport,
        metric,
        config.durations.clone(),
    )
    .with_window(ProfileWindow::new(as_of, window_days));

    for activity in &activities {
        if activity.samples.is_empty() {
            continue;
        }
        let samples = series_from_values(&activity.samples);
        let efforts = extractor.extract(&samples, metric, activity.date);
        profile.ingest_activity(&efforts)?;
    }

    let snapshots = config
        .durations
        .iter()
        .map(|d| profile.query(d, Some(window_days)))
        .collect::<AnalyticsResult<Vec<_>>>()?;

    // Critical power
    let cp_fit = if metric == Metric::Power {
        let estimator = config.critical_power.estimator();
        let (min, max) = estimator.duration_range();
        profile.has_sufficient_data_for_cp(min, max).then(|| {
            estimator.estimate(
                &profile.cp_candidates(min, max),
                CpProtocol::PowerDurationProfile,
            )
        })
    } else {
        None
    };

    // Threshold
    let ftp = config.threshold.resolver().resolve(&ThresholdInputs {
        as_of,
        labs: &history.labs,
        cp_tests: &history.cp_tests,
        profile: (metric == Metric::Power).then_some(&profile),
    })?;

    let ftp_change = history.current_ftp.and_then(|current| {
        ftp.relative_change(current).map(|relative| FtpChange {
            current,
            relative,
            significant: ftp.is_significant_change(current, config.threshold.significant_change),
        })
    });

    // Training load
    let loads: Vec<ActivityLoad> = activities
        .iter()
        .filter_map(|activity| {
            let tss = activity.tss.or_else(|| match (metric, ftp.value) {
                (Metric::Power, Some(ftp)) => {
                    training_stress_score(&series_from_values(&activity.samples), ftp)
                }
                _ => None,
            })?;
            Some(ActivityLoad {
                date: activity.date,
                tss,
                duration_minutes: activity.duration_minutes,
            })
        })
        .collect();

    let days = daily_totals(&loads);
    let series = TrainingLoadAccumulator::new().recompute_series(&days, None, Some(as_of));
    let pmc = series.last().copied();
    let pmc_tail = series[series.len().saturating_sub(PMC_TAIL_DAYS)..].to_vec();

    tracing::info!(
        athlete = %history.athlete_id,
        sport = %history.sport,
        activities = activities.len(),
        ftp = ?ftp.value,
        source = %ftp.source,
        "Built athlete report"
    );

    Ok(AthleteReport {
        athlete_id: history.athlete_id,
        sport: history.sport,
        metric,
        as_of,
        window_days,
        activities_used: activities.len(),
        profile: snapshots,
        cp_fit,
        ftp,
        ftp_change,
        pmc,
        pmc_tail,
    })
}
