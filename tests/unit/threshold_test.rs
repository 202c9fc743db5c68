//! Unit tests for FTP resolution.

use chrono::NaiveDate;
use rustload::metrics::analytics::{
    CpProtocol, CpResult, DurationBuckets, Effort, FtpSource, LabResult, Metric,
    PowerDurationProfile, ProfileWindow, Sport, ThresholdInputs, ThresholdResolver,
};
use uuid::Uuid;

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
}

fn days_ago(days: i64) -> NaiveDate {
    as_of() - chrono::Duration::days(days)
}

fn cp_test(days: i64, watts: f64) -> CpResult {
    CpResult {
        cp_watts: watts,
        w_prime_joules: 18000.0,
        test_date: days_ago(days),
        protocol_used: CpProtocol::LabTest,
        efforts_used: Vec::new(),
        efforts_rejected: Vec::new(),
        r_squared: 1.0,
    }
}

#[test]
fn test_lab_rows_from_json_keep_absence() {
    let labs: Vec<LabResult> = serde_json::from_str(
        r#"[
            {"test_date": "2025-01-15", "map": 380.0},
            {"test_date": "2024-06-01", "lt2_power": 255.0, "vt2_power": 262.0}
        ]"#,
    )
    .unwrap();

    assert_eq!(labs[0].lt2_power, None);
    assert_eq!(labs[0].map, Some(380.0));

    // Only the newest lab counts; it has MAP but no threshold
    let estimate = ThresholdResolver::new()
        .resolve(&ThresholdInputs {
            as_of: as_of(),
            labs: &labs,
            cp_tests: &[],
            profile: None,
        })
        .unwrap();
    assert_eq!(estimate.source, FtpSource::LabMapFresh);
    assert!((estimate.value.unwrap() - 323.0).abs() < 1e-9);
}

#[test]
fn test_nothing_available() {
    let estimate = ThresholdResolver::new()
        .resolve(&ThresholdInputs {
            as_of: as_of(),
            labs: &[],
            cp_tests: &[],
            profile: None,
        })
        .unwrap();

    assert!(!estimate.is_available());
    assert_eq!(estimate.source, FtpSource::None);
    let json = serde_json::to_value(estimate).unwrap();
    assert_eq!(json["source"], "none");
    assert!(json["value"].is_null());
}

#[test]
fn test_stale_sources_newer_wins() {
    let lab = LabResult {
        lt2_power: Some(240.0),
        ..LabResult::new(days_ago(300))
    };
    let inputs = |cps: &[CpResult]| -> (Option<f64>, FtpSource) {
        let estimate = ThresholdResolver::new()
            .resolve(&ThresholdInputs {
                as_of: as_of(),
                labs: std::slice::from_ref(&lab),
                cp_tests: cps,
                profile: None,
            })
            .unwrap();
        (estimate.value, estimate.source)
    };

    assert_eq!(inputs(&[cp_test(90, 265.0)]), (Some(265.0), FtpSource::CpStale));
    assert_eq!(inputs(&[cp_test(400, 265.0)]), (Some(240.0), FtpSource::LabLt2Stale));
    assert_eq!(inputs(&[]), (Some(240.0), FtpSource::LabLt2Stale));
}

#[test]
fn test_profile_window_excludes_old_efforts() {
    let mut profile = PowerDurationProfile::new(
        Uuid::new_v4(),
        Sport::Cycling,
        Metric::Power,
        DurationBuckets::standard(),
    )
    .with_window(ProfileWindow::new(as_of(), 90));
    profile.ingest(&Effort::new(3600, 280.0, days_ago(120))).unwrap();
    profile.ingest(&Effort::new(1200, 280.0, days_ago(30))).unwrap();

    let estimate = ThresholdResolver::new()
        .resolve(&ThresholdInputs {
            as_of: as_of(),
            labs: &[],
            cp_tests: &[],
            profile: Some(&profile),
        })
        .unwrap();

    assert_eq!(estimate.source, FtpSource::Mmp90d20m);
    assert!((estimate.value.unwrap() - 266.0).abs() < 1e-9);
}

#[test]
fn test_configurable_freshness() {
    let lab = LabResult {
        lt2_power: Some(250.0),
        ..LabResult::new(days_ago(100))
    };
    let resolver = ThresholdResolver::new().with_max_ages(60, 60);
    let estimate = resolver
        .resolve(&ThresholdInputs {
            as_of: as_of(),
            labs: std::slice::from_ref(&lab),
            cp_tests: &[],
            profile: None,
        })
        .unwrap();

    assert_eq!(estimate.source, FtpSource::LabLt2Stale);
    assert_eq!(estimate.recency.lab_age_days, Some(100));
    assert!(!estimate.recency.lab_fresh);
}

#[test]
fn test_significant_change() {
    let estimate = ThresholdResolver::new()
        .resolve(&ThresholdInputs {
            as_of: as_of(),
            labs: &[],
            cp_tests: &[cp_test(10, 262.0)],
            profile: None,
        })
        .unwrap();

    assert!(estimate.is_significant_change(240.0, 0.05));
    assert!(!estimate.is_significant_change(255.0, 0.05));
}
