//! Unit tests for mean-maximal effort extraction.

use chrono::NaiveDate;
use rustload::metrics::analytics::{
    series_from_values, validate_series, DurationBuckets, EffortExtractor, Metric, Sample,
    SeriesDefect,
};

fn ride_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
}

fn extractor(durations: &[u32]) -> EffortExtractor {
    EffortExtractor::new(DurationBuckets::new(durations).unwrap())
}

#[test]
fn test_power_takes_maximum_window() {
    let samples = series_from_values(&[100.0, 200.0, 300.0, 200.0, 100.0]);
    let efforts = extractor(&[1, 3]).extract(&samples, Metric::Power, ride_date());

    assert_eq!(efforts.len(), 2);
    assert_eq!(efforts[0].duration_secs, 1);
    assert_eq!(efforts[0].value, 300.0);
    assert_eq!(efforts[1].duration_secs, 3);
    assert!((efforts[1].value - 700.0 / 3.0).abs() < 1e-9);
    assert!(efforts.iter().all(|e| e.achieved_on == ride_date()));
}

#[test]
fn test_pace_takes_minimum_window() {
    // 1 min easy at 5:00/km, 1 min hard at 4:00/km
    let mut values = vec![300.0; 60];
    values.extend(vec![240.0; 60]);
    let samples = series_from_values(&values);

    let efforts = extractor(&[60, 120]).extract(&samples, Metric::Pace, ride_date());
    assert_eq!(efforts[0].value, 240.0);
    assert_eq!(efforts[1].value, 270.0);
}

#[test]
fn test_long_durations_are_absent_not_zero() {
    let samples = series_from_values(&vec![250.0; 90]);
    let efforts = extractor(&[5, 60, 300, 3600]).extract(&samples, Metric::Power, ride_date());

    let durations: Vec<u32> = efforts.iter().map(|e| e.duration_secs).collect();
    assert_eq!(durations, vec![5, 60]);
}

#[test]
fn test_malformed_series_yields_nothing() {
    let extractor = EffortExtractor::standard();

    assert!(extractor.extract(&[], Metric::Power, ride_date()).is_empty());

    let backwards = vec![
        Sample::new(0, 200.0),
        Sample::new(1, 210.0),
        Sample::new(0, 220.0),
    ];
    assert!(extractor.extract(&backwards, Metric::Power, ride_date()).is_empty());
    assert_eq!(
        validate_series(&backwards, Metric::Power),
        Err(SeriesDefect::NonMonotonic(2))
    );

    let mut garbled = series_from_values(&vec![200.0; 120]);
    garbled[50].value = f64::NAN;
    assert!(extractor.extract(&garbled, Metric::Power, ride_date()).is_empty());
}

#[test]
fn test_skipped_seconds_reject_series() {
    let mut samples = series_from_values(&vec![250.0; 600]);
    for sample in samples.iter_mut().skip(300) {
        sample.elapsed_secs += 5;
    }

    assert_eq!(
        validate_series(&samples, Metric::Power),
        Err(SeriesDefect::Gap(300))
    );
    assert!(EffortExtractor::standard()
        .extract(&samples, Metric::Power, ride_date())
        .is_empty());
}

#[test]
fn test_zero_pace_is_invalid() {
    let samples = series_from_values(&[300.0, 0.0, 300.0]);
    assert_eq!(
        validate_series(&samples, Metric::Pace),
        Err(SeriesDefect::InvalidValue(1))
    );
    // Zero watts is a normal coasting sample
    assert!(validate_series(&samples, Metric::Power).is_ok());
}

#[test]
fn test_extract_single_matches_bucket_extraction() {
    let values: Vec<f64> = (0..1800).map(|i| 150.0 + (i % 97) as f64).collect();
    let samples = series_from_values(&values);
    let extractor = extractor(&[300]);

    let efforts = extractor.extract(&samples, Metric::Power, ride_date());
    let single = extractor.extract_single(&samples, Metric::Power, 300).unwrap();
    assert_eq!(efforts[0].value, single);
    assert!(extractor.extract_single(&samples, Metric::Power, 7200).is_none());
}
