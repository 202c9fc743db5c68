//! Unit tests for Critical Power fitting.

use std::time::Duration;

use chrono::NaiveDate;
use rustload::metrics::analytics::{
    CpEstimator, CpFit, CpProtocol, CpResult, CpTestLog, Effort, RejectionReason,
};

fn day(d: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, 1).unwrap() + chrono::Duration::days(d)
}

fn hyperbolic(cp: f64, w_prime: f64, durations: &[u32]) -> Vec<Effort> {
    durations
        .iter()
        .enumerate()
        .map(|(i, &t)| Effort::new(t, cp + w_prime / f64::from(t), day(i as i64)))
        .collect()
}

#[test]
fn test_exact_fit() {
    let efforts = hyperbolic(300.0, 20000.0, &[180, 300, 1200]);
    let fit = CpEstimator::default().estimate(&efforts, CpProtocol::FieldTest);

    let result = fit.result().expect("exact data should fit");
    assert!((result.cp_watts - 300.0).abs() < 1e-6, "CP {}", result.cp_watts);
    assert!(
        (result.w_prime_joules - 20000.0).abs() < 1e-3,
        "W' {}",
        result.w_prime_joules
    );
    assert_eq!(result.efforts_used.len(), 3);
    assert!(result.efforts_rejected.is_empty());
    assert_eq!(result.protocol_used, CpProtocol::FieldTest);
    assert_eq!(result.test_date, day(2));
}

#[test]
fn test_two_durations_refused() {
    let efforts = hyperbolic(300.0, 20000.0, &[180, 600]);
    let fit = CpEstimator::default().estimate(&efforts, CpProtocol::FieldTest);

    assert!(fit.result().is_none());
    assert_eq!(fit.refusal_reason(), Some(RejectionReason::InsufficientPoints));
    assert_eq!(fit.rejected().len(), 2);
    assert!(fit
        .rejected()
        .iter()
        .all(|r| r.reason == RejectionReason::InsufficientPoints));
}

#[test]
fn test_repeated_duration_does_not_count_twice() {
    let mut efforts = hyperbolic(300.0, 20000.0, &[180, 600]);
    efforts.push(Effort::new(600, 320.0, day(5)));

    let fit = CpEstimator::default().estimate(&efforts, CpProtocol::FieldTest);
    assert_eq!(fit.refusal_reason(), Some(RejectionReason::InsufficientPoints));
    // Nothing silently dropped
    assert_eq!(fit.rejected().len(), 3);
}

#[test]
fn test_every_input_accounted_for() {
    let mut efforts = hyperbolic(280.0, 18000.0, &[180, 300, 600, 1200]);
    efforts.push(Effort::new(5, 900.0, day(9)));
    efforts.push(Effort::new(3600, 250.0, day(9)));

    let fit = CpEstimator::default().estimate(&efforts, CpProtocol::PowerDurationProfile);
    let result = fit.result().unwrap();
    assert_eq!(
        result.efforts_used.len() + result.efforts_rejected.len(),
        efforts.len()
    );
    assert!(result
        .efforts_rejected
        .iter()
        .all(|r| r.reason == RejectionReason::OutOfRange));
}

#[test]
fn test_predictions() {
    let efforts = hyperbolic(250.0, 20000.0, &[180, 300, 1200]);
    let result = CpEstimator::default()
        .estimate(&efforts, CpProtocol::LabTest)
        .into_result()
        .unwrap();

    let tte = result.time_to_exhaustion(350.0).unwrap();
    assert!((tte.as_secs_f64() - 200.0).abs() < 0.01);
    assert!(result.time_to_exhaustion(250.0).is_none());

    let p300 = result.power_at_duration(Duration::from_secs(300));
    assert!((p300 - (250.0 + 20000.0 / 300.0)).abs() < 0.01);

    let remaining = result.w_prime_remaining(300.0, Duration::from_secs(100));
    assert!((remaining - 15000.0).abs() < 0.1);
}

#[test]
fn test_deserialized_result_with_negative_w_prime() {
    let result: CpResult = serde_json::from_value(serde_json::json!({
        "cp_watts": 260.0,
        "w_prime_joules": -100.0,
        "test_date": "2024-02-01",
        "protocol_used": "field_test"
    }))
    .unwrap();

    assert!(result.time_to_exhaustion(300.0).is_none());
    assert!(result.time_to_exhaustion(f64::NAN).is_none());
}

#[test]
fn test_refusal_serializes_with_reason() {
    let fit = CpEstimator::default().estimate(&[], CpProtocol::FieldTest);
    let json = serde_json::to_value(&fit).unwrap();
    assert_eq!(json["status"], "refused");
    assert_eq!(json["reason"], "insufficient_points");

    let back: CpFit = serde_json::from_value(json).unwrap();
    assert_eq!(back, fit);
}

#[test]
fn test_log_is_append_only() {
    let estimator = CpEstimator::default();
    let mut log = CpTestLog::new();

    let older = estimator
        .estimate(&hyperbolic(270.0, 19000.0, &[180, 300, 1200]), CpProtocol::FieldTest)
        .into_result()
        .unwrap();
    let mut newer_efforts = hyperbolic(285.0, 19000.0, &[180, 300, 1200]);
    for effort in &mut newer_efforts {
        effort.achieved_on = day(30);
    }
    let newer = estimator
        .estimate(&newer_efforts, CpProtocol::FieldTest)
        .into_result()
        .unwrap();

    log.append(newer.clone());
    log.append(older.clone());

    assert_eq!(log.len(), 2);
    assert_eq!(log.latest(), Some(&newer));
    assert_eq!(log.entries()[1], older);
}
