//! Critical Power / W' model fitting.
//!
//! The two-parameter hyperbolic model `P(t) = W'/t + CP` is fitted by linear
//! regression of power against `1/t`: the slope is W' and the intercept is CP.
//! Efforts whose residual exceeds the tolerance are dropped and the fit is
//! re-run once. Every input effort ends up in either `efforts_used` or
//! `efforts_rejected`.

use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::types::Effort;

/// Minimum number of distinct durations for a fit.
pub const MIN_CP_POINTS: usize = 3;

/// How the efforts behind a fit were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpProtocol {
    /// Dedicated maximal efforts in the field.
    FieldTest,
    /// Laboratory protocol.
    LabTest,
    /// Best efforts taken from the power-duration profile.
    PowerDurationProfile,
}

/// Why an effort (or a whole fit) was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// Fewer than three distinct durations available.
    InsufficientPoints,
    /// Residual above tolerance; likely sub-maximal or corrupted.
    ResidualExceeded,
    /// A better effort at the same duration was used.
    DuplicateDuration,
    /// Duration outside the fitting range.
    OutOfRange,
    /// Non-finite or non-positive power.
    InvalidValue,
    /// Fit produced a non-positive CP or W'.
    NonPhysicalFit,
}

/// An input effort that was not used, with the reason.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RejectedEffort {
    pub effort: Effort,
    pub reason: RejectionReason,
}

/// Fitted critical-power test result. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpResult {
    /// Critical Power in watts.
    pub cp_watts: f64,
    /// W' (anaerobic capacity) in joules.
    pub w_prime_joules: f64,
    /// Date of the newest effort used.
    pub test_date: NaiveDate,
    pub protocol_used: CpProtocol,
    #[serde(default)]
    pub efforts_used: Vec<Effort>,
    #[serde(default)]
    pub efforts_rejected: Vec<RejectedEffort>,
    /// Model fit quality (R², 0-1).
    #[serde(default)]
    pub r_squared: f64,
}

impl CpResult {
    /// Predict time to exhaustion at given power.
    /// Returns None if power <= CP (theoretically infinite), or when the
    /// power or the stored model gives no representable duration.
    pub fn time_to_exhaustion(&self, power_watts: f64) -> Option<Duration> {
        if !power_watts.is_finite() || power_watts <= self.cp_watts {
            return None;
        }

        let tte_secs = self.w_prime_joules / (power_watts - self.cp_watts);
        Duration::try_from_secs_f64(tte_secs).ok()
    }

    /// Predict sustainable power for given duration.
    pub fn power_at_duration(&self, duration: Duration) -> f64 {
        let secs = duration.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }

        self.cp_watts + self.w_prime_joules / secs
    }

    /// Remaining W' after riding at a power for a duration.
    /// Negative when W' would be exhausted.
    pub fn w_prime_remaining(&self, power_watts: f64, duration: Duration) -> f64 {
        if power_watts <= self.cp_watts {
            return self.w_prime_joules;
        }

        let work_above_cp = (power_watts - self.cp_watts) * duration.as_secs_f64();
        self.w_prime_joules - work_above_cp
    }
}

/// A refused fit. All inputs are listed as rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpRefusal {
    pub reason: RejectionReason,
    pub efforts_rejected: Vec<RejectedEffort>,
}

/// Outcome of a CP fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CpFit {
    Fitted(CpResult),
    Refused(CpRefusal),
}

impl CpFit {
    pub fn result(&self) -> Option<&CpResult> {
        match self {
            CpFit::Fitted(result) => Some(result),
            CpFit::Refused(_) => None,
        }
    }

    pub fn into_result(self) -> Option<CpResult> {
        match self {
            CpFit::Fitted(result) => Some(result),
            CpFit::Refused(_) => None,
        }
    }

    /// Efforts left out of the fit.
    pub fn rejected(&self) -> &[RejectedEffort] {
        match self {
            CpFit::Fitted(result) => &result.efforts_rejected,
            CpFit::Refused(refusal) => &refusal.efforts_rejected,
        }
    }

    pub fn refusal_reason(&self) -> Option<RejectionReason> {
        match self {
            CpFit::Fitted(_) => None,
            CpFit::Refused(refusal) => Some(refusal.reason),
        }
    }
}

/// CP model estimator.
#[derive(Debug, Clone)]
pub struct CpEstimator {
    /// Maximum relative residual before an effort is dropped.
    residual_tolerance: f64,
    /// Minimum duration for fitting (default: 120s / 2 min).
    min_duration: u32,
    /// Maximum duration for fitting (default: 1200s / 20 min).
    max_duration: u32,
}

impl CpEstimator {
    /// Create with default settings (5% tolerance, 2-20 min range).
    pub fn new() -> Self {
        Self {
            residual_tolerance: 0.05,
            min_duration: 120,
            max_duration: 1200,
        }
    }

    pub fn with_tolerance(mut self, residual_tolerance: f64) -> Self {
        self.residual_tolerance = residual_tolerance;
        self
    }

    pub fn with_range(mut self, min_secs: u32, max_secs: u32) -> Self {
        self.min_duration = min_secs;
        self.max_duration = max_secs;
        self
    }

    pub fn duration_range(&self) -> (u32, u32) {
        (self.min_duration, self.max_duration)
    }

    /// Fit CP and W' from maximal efforts.
    pub fn estimate(&self, efforts: &[Effort], protocol: CpProtocol) -> CpFit {
        let (mut candidates, mut rejected) = self.screen(efforts);

        if candidates.len() < MIN_CP_POINTS {
            return self.refuse(RejectionReason::InsufficientPoints, candidates, rejected);
        }

        let Some(first) = fit_hyperbolic(&candidates) else {
            return self.refuse(RejectionReason::InsufficientPoints, candidates, rejected);
        };

        let (kept, outliers): (Vec<Effort>, Vec<Effort>) = candidates
            .iter()
            .copied()
            .partition(|e| relative_residual(&first, e) <= self.residual_tolerance);

        let fit = if outliers.is_empty() {
            first
        } else {
            tracing::debug!(count = outliers.len(), "Dropping CP efforts over residual tolerance");
            rejected.extend(outliers.into_iter().map(|effort| RejectedEffort {
                effort,
                reason: RejectionReason::ResidualExceeded,
            }));
            candidates = kept;

            if candidates.len() < MIN_CP_POINTS {
                return self.refuse(RejectionReason::InsufficientPoints, candidates, rejected);
            }
            match fit_hyperbolic(&candidates) {
                Some(refit) => refit,
                None => {
                    return self.refuse(RejectionReason::InsufficientPoints, candidates, rejected)
                }
            }
        };

        if fit.cp <= 0.0 || fit.w_prime <= 0.0 {
            return self.refuse(RejectionReason::NonPhysicalFit, candidates, rejected);
        }

        let Some(test_date) = candidates.iter().map(|e| e.achieved_on).max() else {
            return self.refuse(RejectionReason::InsufficientPoints, candidates, rejected);
        };

        tracing::debug!(
            cp = fit.cp,
            w_prime = fit.w_prime,
            used = candidates.len(),
            rejected = rejected.len(),
            "Fitted CP model"
        );

        CpFit::Fitted(CpResult {
            cp_watts: fit.cp,
            w_prime_joules: fit.w_prime,
            test_date,
            protocol_used: protocol,
            efforts_used: candidates,
            efforts_rejected: rejected,
            r_squared: fit.r_squared,
        })
    }

    /// Split inputs into one best effort per in-range duration and rejects.
    fn screen(&self, efforts: &[Effort]) -> (Vec<Effort>, Vec<RejectedEffort>) {
        let mut candidates: Vec<Effort> = Vec::new();
        let mut rejected = Vec::new();

        for effort in efforts {
            if !effort.value.is_finite() || effort.value <= 0.0 {
                rejected.push(RejectedEffort {
                    effort: *effort,
                    reason: RejectionReason::InvalidValue,
                });
                continue;
            }
            if effort.duration_secs < self.min_duration || effort.duration_secs > self.max_duration
            {
                rejected.push(RejectedEffort {
                    effort: *effort,
                    reason: RejectionReason::OutOfRange,
                });
                continue;
            }

            match candidates
                .iter_mut()
                .find(|c| c.duration_secs == effort.duration_secs)
            {
                Some(existing) => {
                    let better = effort.value > existing.value
                        || (effort.value == existing.value
                            && effort.achieved_on < existing.achieved_on);
                    let loser = if better {
                        std::mem::replace(existing, *effort)
                    } else {
                        *effort
                    };
                    rejected.push(RejectedEffort {
                        effort: loser,
                        reason: RejectionReason::DuplicateDuration,
                    });
                }
                None => candidates.push(*effort),
            }
        }

        candidates.sort_by_key(|e| e.duration_secs);
        (candidates, rejected)
    }

    fn refuse(
        &self,
        reason: RejectionReason,
        remaining: Vec<Effort>,
        mut rejected: Vec<RejectedEffort>,
    ) -> CpFit {
        tracing::warn!(?reason, "CP fit refused");
        rejected.extend(
            remaining
                .into_iter()
                .map(|effort| RejectedEffort { effort, reason }),
        );
        CpFit::Refused(CpRefusal {
            reason,
            efforts_rejected: rejected,
        })
    }
}

impl Default for CpEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Append-only log of CP results for one athlete and sport.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CpTestLog {
    entries: Vec<CpResult>,
}

impl CpTestLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, result: CpResult) {
        self.entries.push(result);
    }

    /// Newest test by date; the later append wins on equal dates.
    pub fn latest(&self) -> Option<&CpResult> {
        self.entries
            .iter()
            .enumerate()
            .max_by_key(|(i, r)| (r.test_date, *i))
            .map(|(_, r)| r)
    }

    pub fn entries(&self) -> &[CpResult] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct HyperbolicFit {
    cp: f64,
    w_prime: f64,
    r_squared: f64,
}

fn fit_hyperbolic(efforts: &[Effort]) -> Option<HyperbolicFit> {
    let points: Vec<(f64, f64)> = efforts
        .iter()
        .map(|e| (1.0 / f64::from(e.duration_secs), e.value))
        .collect();

    let (slope, intercept, r_squared) = linear_regression(&points)?;
    Some(HyperbolicFit {
        cp: intercept,
        w_prime: slope,
        r_squared,
    })
}

fn relative_residual(fit: &HyperbolicFit, effort: &Effort) -> f64 {
    let predicted = fit.cp + fit.w_prime / f64::from(effort.duration_secs);
    if predicted <= 0.0 {
        return f64::INFINITY;
    }
    (effort.value - predicted).abs() / predicted
}

/// Linear regression on (x, y) pairs.
/// Returns (slope, intercept, r_squared).
fn linear_regression(points: &[(f64, f64)]) -> Option<(f64, f64, f64)> {
    let n = points.len() as f64;
    if points.len() < 2 {
        return None;
    }

    let sum_x: f64 = points.iter().map(|(x, _)| x).sum();
    let sum_y: f64 = points.iter().map(|(_, y)| y).sum();
    let sum_xy: f64 = points.iter().map(|(x, y)| x * y).sum();
    let sum_xx: f64 = points.iter().map(|(x, _)| x * x).sum();

    let denom = n * sum_xx - sum_x * sum_x;
    if denom.abs() < 1e-15 {
        return None;
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;

    let mean_y = sum_y / n;
    let ss_tot: f64 = points.iter().map(|(_, y)| (y - mean_y).powi(2)).sum();
    let ss_res: f64 = points
        .iter()
        .map(|(x, y)| {
            let predicted = slope * x + intercept;
            (y - predicted).powi(2)
        })
        .sum();

    let r_squared = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        0.0
    };

    Some((slope, intercept, r_squared))
}
