//! Functional threshold resolution.
//!
//! Picks one FTP value from lab tests, CP tests and the trailing power-duration
//! profile. Tiers are fixed and evaluated in order, the first one that yields a
//! value wins:
//!
//! 1. fresh lab LT2 power, else VT2 power
//! 2. fresh CP test
//! 3. profile window best: 60 min, else 20 min x 0.95, else 5 min x 0.90
//! 4. lab MAP x 0.85, fresh or stale
//! 5. stale lab threshold or stale CP, whichever test is newer

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::critical_power::CpResult;
use super::error::{AnalyticsError, AnalyticsResult};
use super::pdc::PowerDurationProfile;
use super::types::Metric;

/// 20-minute power to FTP factor.
pub const TWENTY_MINUTE_FACTOR: f64 = 0.95;
/// 5-minute power to FTP factor.
pub const FIVE_MINUTE_FACTOR: f64 = 0.90;
/// Maximal aerobic power to FTP factor.
pub const MAP_FACTOR: f64 = 0.85;

/// Externally supplied laboratory thresholds. Absent values are `None`, never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabResult {
    /// Aerobic threshold power.
    #[serde(default)]
    pub aet: Option<f64>,
    /// Glycolytic threshold power.
    #[serde(default)]
    pub gt: Option<f64>,
    /// Maximal aerobic power.
    #[serde(default)]
    pub map: Option<f64>,
    #[serde(default)]
    pub lt2_power: Option<f64>,
    #[serde(default)]
    pub vt2_power: Option<f64>,
    #[serde(default)]
    pub critical_power: Option<f64>,
    pub test_date: NaiveDate,
}

impl LabResult {
    /// Empty lab row for a test date.
    pub fn new(test_date: NaiveDate) -> Self {
        Self {
            aet: None,
            gt: None,
            map: None,
            lt2_power: None,
            vt2_power: None,
            critical_power: None,
            test_date,
        }
    }
}

/// Source that produced an FTP estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FtpSource {
    LabLt2Fresh,
    LabVt2Fresh,
    CpFresh,
    #[serde(rename = "mmp_90d_1h")]
    Mmp90d1h,
    #[serde(rename = "mmp_90d_20m")]
    Mmp90d20m,
    #[serde(rename = "mmp_90d_5m")]
    Mmp90d5m,
    LabMapFresh,
    LabMapStale,
    LabLt2Stale,
    LabVt2Stale,
    CpStale,
    None,
}

impl FtpSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FtpSource::LabLt2Fresh => "lab_lt2_fresh",
            FtpSource::LabVt2Fresh => "lab_vt2_fresh",
            FtpSource::CpFresh => "cp_fresh",
            FtpSource::Mmp90d1h => "mmp_90d_1h",
            FtpSource::Mmp90d20m => "mmp_90d_20m",
            FtpSource::Mmp90d5m => "mmp_90d_5m",
            FtpSource::LabMapFresh => "lab_map_fresh",
            FtpSource::LabMapStale => "lab_map_stale",
            FtpSource::LabLt2Stale => "lab_lt2_stale",
            FtpSource::LabVt2Stale => "lab_vt2_stale",
            FtpSource::CpStale => "cp_stale",
            FtpSource::None => "none",
        }
    }
}

impl std::fmt::Display for FtpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Age and freshness of the newest lab and CP tests considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Recency {
    pub lab_age_days: Option<i64>,
    pub cp_age_days: Option<i64>,
    pub lab_fresh: bool,
    pub cp_fresh: bool,
}

/// Resolved FTP with the source that fired.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FtpEstimate {
    /// FTP in watts, `None` when no source was available.
    pub value: Option<f64>,
    pub source: FtpSource,
    pub recency: Recency,
}

impl FtpEstimate {
    pub fn is_available(&self) -> bool {
        self.value.is_some()
    }

    /// Relative change from `current_ftp`.
    pub fn relative_change(&self, current_ftp: f64) -> Option<f64> {
        let value = self.value?;
        if current_ftp <= 0.0 {
            return Some(1.0);
        }
        Some((value - current_ftp) / current_ftp)
    }

    /// Check if the estimate moved more than `threshold` (fraction) from `current_ftp`.
    pub fn is_significant_change(&self, current_ftp: f64, threshold: f64) -> bool {
        self.relative_change(current_ftp)
            .is_some_and(|change| change.abs() > threshold)
    }
}

/// Everything the resolver looks at.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdInputs<'a> {
    /// Date ages are measured against. Tests dated after it are ignored.
    pub as_of: NaiveDate,
    pub labs: &'a [LabResult],
    pub cp_tests: &'a [CpResult],
    /// Power profile tracking the resolver's window.
    pub profile: Option<&'a PowerDurationProfile>,
}

/// FTP resolver.
#[derive(Debug, Clone)]
pub struct ThresholdResolver {
    lab_max_age_days: u32,
    cp_max_age_days: u32,
    mmp_window_days: u32,
}

impl ThresholdResolver {
    /// Create with default windows (lab 120 d, CP 60 d, profile 90 d).
    pub fn new() -> Self {
        Self {
            lab_max_age_days: 120,
            cp_max_age_days: 60,
            mmp_window_days: 90,
        }
    }

    pub fn with_max_ages(mut self, lab_days: u32, cp_days: u32) -> Self {
        self.lab_max_age_days = lab_days;
        self.cp_max_age_days = cp_days;
        self
    }

    pub fn with_mmp_window(mut self, days: u32) -> Self {
        self.mmp_window_days = days;
        self
    }

    pub fn mmp_window_days(&self) -> u32 {
        self.mmp_window_days
    }

    /// Resolve one FTP value.
    ///
    /// Fails only when the profile is not a power profile or does not track
    /// the resolver's window.
    pub fn resolve(&self, inputs: &ThresholdInputs<'_>) -> AnalyticsResult<FtpEstimate> {
        let as_of = inputs.as_of;
        let lab = inputs
            .labs
            .iter()
            .filter(|l| l.test_date <= as_of)
            .max_by_key(|l| l.test_date);
        let cp = inputs
            .cp_tests
            .iter()
            .filter(|c| c.test_date <= as_of)
            .max_by_key(|c| c.test_date);

        let lab_age_days = lab.map(|l| (as_of - l.test_date).num_days());
        let cp_age_days = cp.map(|c| (as_of - c.test_date).num_days());
        let recency = Recency {
            lab_age_days,
            cp_age_days,
            lab_fresh: lab_age_days.is_some_and(|age| age <= i64::from(self.lab_max_age_days)),
            cp_fresh: cp_age_days.is_some_and(|age| age <= i64::from(self.cp_max_age_days)),
        };

        let lab_threshold = lab.and_then(|l| {
            present(l.lt2_power)
                .map(|v| (v, true))
                .or_else(|| present(l.vt2_power).map(|v| (v, false)))
        });
        let cp_watts = cp.and_then(|c| present(Some(c.cp_watts)));

        let found = |value: f64, source: FtpSource| -> AnalyticsResult<FtpEstimate> {
            tracing::debug!(value, %source, ?recency, "Resolved FTP");
            Ok(FtpEstimate {
                value: Some(value),
                source,
                recency,
            })
        };

        // 1. Fresh lab threshold
        if recency.lab_fresh {
            if let Some((value, is_lt2)) = lab_threshold {
                let source = if is_lt2 {
                    FtpSource::LabLt2Fresh
                } else {
                    FtpSource::LabVt2Fresh
                };
                return found(value, source);
            }
        }

        // 2. Fresh CP
        if recency.cp_fresh {
            if let Some(value) = cp_watts {
                return found(value, FtpSource::CpFresh);
            }
        }

        // 3. Trailing profile
        if let Some(profile) = inputs.profile {
            if profile.metric() != Metric::Power {
                return Err(AnalyticsError::MetricMismatch {
                    expected: Metric::Power,
                    actual: profile.metric(),
                });
            }

            if let Some(p60) = self.window_best(profile, 3600)? {
                return found(p60, FtpSource::Mmp90d1h);
            }
            if let Some(p20) = self.window_best(profile, 1200)? {
                return found(p20 * TWENTY_MINUTE_FACTOR, FtpSource::Mmp90d20m);
            }
            if let Some(p5) = self.window_best(profile, 300)? {
                return found(p5 * FIVE_MINUTE_FACTOR, FtpSource::Mmp90d5m);
            }
        }

        // 4. MAP estimate
        if let Some(map) = lab.and_then(|l| present(l.map)) {
            let source = if recency.lab_fresh {
                FtpSource::LabMapFresh
            } else {
                FtpSource::LabMapStale
            };
            return found(map * MAP_FACTOR, source);
        }

        // 5. Stale tests, newer wins, lab on equal age
        let stale_lab = lab_threshold.zip(lab_age_days);
        let stale_cp = cp_watts.zip(cp_age_days);
        match (stale_lab, stale_cp) {
            (Some(((value, is_lt2), lab_age)), newer_cp)
                if newer_cp.map_or(true, |(_, cp_age)| lab_age <= cp_age) =>
            {
                let source = if is_lt2 {
                    FtpSource::LabLt2Stale
                } else {
                    FtpSource::LabVt2Stale
                };
                found(value, source)
            }
            (_, Some((value, _))) => found(value, FtpSource::CpStale),
            _ => {
                tracing::debug!(?recency, "No FTP source available");
                Ok(FtpEstimate {
                    value: None,
                    source: FtpSource::None,
                    recency,
                })
            }
        }
    }

    fn window_best(
        &self,
        profile: &PowerDurationProfile,
        duration_secs: u32,
    ) -> AnalyticsResult<Option<f64>> {
        if !profile.buckets().contains(duration_secs) {
            return Ok(None);
        }
        let snapshot = profile.query(duration_secs, Some(self.mmp_window_days))?;
        Ok(present(Some(snapshot.best)))
    }
}

impl Default for ThresholdResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Positive, finite values only; zero means "no data".
fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}
