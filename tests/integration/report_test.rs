//! Integration tests for athlete reports built from JSON history.

use chrono::NaiveDate;
use rustload::metrics::analytics::{FtpSource, Metric};
use rustload::report::{build_report, AthleteHistory, RecordedActivity};
use rustload::storage::config::AnalyticsConfig;
use serde_json::json;

fn day(d: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(d)
}

fn history_json(activities: serde_json::Value) -> AthleteHistory {
    serde_json::from_value(json!({
        "athlete_id": "6f1c5a52-2b3c-4d5e-8f90-1a2b3c4d5e6f",
        "sport": "cycling",
        "activities": activities,
    }))
    .unwrap()
}

#[test]
fn test_report_end_to_end() {
    let mut activities = Vec::new();
    for d in 0..90 {
        let samples = if d == 80 { vec![220.0; 3600] } else { vec![150.0; 1800] };
        activities.push(RecordedActivity {
            date: day(d),
            duration_minutes: samples.len() as f64 / 60.0,
            samples,
            tss: None,
        });
    }
    let history = AthleteHistory {
        activities,
        ..history_json(json!([]))
    };

    let report = build_report(&history, &AnalyticsConfig::default(), day(89)).unwrap();

    assert_eq!(report.metric, Metric::Power);
    assert_eq!(report.activities_used, 90);
    assert_eq!(report.ftp.value, Some(220.0));
    assert_eq!(report.ftp.source, FtpSource::Mmp90d1h);

    let hour = report.profile.iter().find(|s| s.duration_secs == 3600).unwrap();
    assert_eq!(hour.best, 220.0);
    assert_eq!(hour.best_achieved_on, Some(day(80)));

    // Every day has a PMC record once TSS is computed from the resolved FTP
    let pmc = report.pmc.unwrap();
    assert_eq!(pmc.date, day(89));
    assert!(pmc.ctl > 0.0);
    assert_eq!(pmc.tsb, pmc.ctl - pmc.atl);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["ftp"]["source"], "mmp_90d_1h");
}

#[test]
fn test_report_for_pace_sport() {
    let samples = vec![300.0; 1200];
    let history: AthleteHistory = serde_json::from_value(json!({
        "athlete_id": "0d6a5c8e-1111-4222-8333-944455556666",
        "sport": "running",
        "activities": [
            {"date": "2024-01-01", "duration_minutes": 20.0, "samples": samples},
            {"date": "2024-01-03", "duration_minutes": 30.0, "tss": 42.0}
        ]
    }))
    .unwrap();

    let report = build_report(&history, &AnalyticsConfig::default(), day(3)).unwrap();

    assert_eq!(report.metric, Metric::Pace);
    assert!(report.cp_fit.is_none());
    assert_eq!(report.ftp.source, FtpSource::None);

    let ten_min = report.profile.iter().find(|s| s.duration_secs == 600).unwrap();
    assert_eq!(ten_min.best, 300.0);

    // Only the supplied score counts; pace activities get no computed TSS
    let tail: Vec<f64> = report.pmc_tail.iter().map(|r| r.tss).collect();
    assert_eq!(tail, vec![42.0, 0.0]);
}

#[test]
fn test_report_uses_lab_and_cp_rows() {
    let history: AthleteHistory = serde_json::from_value(json!({
        "athlete_id": "6f1c5a52-2b3c-4d5e-8f90-1a2b3c4d5e6f",
        "sport": "cycling",
        "current_ftp": 240.0,
        "labs": [{"test_date": "2023-06-01", "lt2_power": 245.0}],
        "cp_tests": [{
            "cp_watts": 268.0,
            "w_prime_joules": 21000.0,
            "test_date": "2024-01-20",
            "protocol_used": "field_test"
        }]
    }))
    .unwrap();

    let report = build_report(&history, &AnalyticsConfig::default(), day(30)).unwrap();
    assert_eq!(report.ftp.value, Some(268.0));
    assert_eq!(report.ftp.source, FtpSource::CpFresh);
    assert_eq!(report.ftp.recency.cp_age_days, Some(11));

    let change = report.ftp_change.unwrap();
    assert!(change.significant);
    assert!(report.pmc.is_none());
}
