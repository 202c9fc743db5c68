//! Training Stress Score.
//!
//! One canonical power-based definition:
//! - NP: fourth root of the mean fourth power of the 30 s rolling average
//! - IF: NP / FTP
//! - TSS: hours x IF² x 100

use std::collections::VecDeque;

use super::effort::validate_series;
use super::types::{Metric, Sample};

/// Rolling window for normalized power.
pub const NP_WINDOW_SECS: usize = 30;

/// Rolling average over a fixed number of samples.
#[derive(Debug)]
struct RollingAverage {
    buffer: VecDeque<f64>,
    window_size: usize,
    sum: f64,
}

impl RollingAverage {
    fn new(window_size: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(window_size),
            window_size,
            sum: 0.0,
        }
    }

    /// Add a value; returns the average once the window is full.
    fn add(&mut self, value: f64) -> Option<f64> {
        self.buffer.push_back(value);
        self.sum += value;

        if self.buffer.len() > self.window_size {
            if let Some(old) = self.buffer.pop_front() {
                self.sum -= old;
            }
        }

        (self.buffer.len() == self.window_size).then(|| self.sum / self.window_size as f64)
    }
}

/// Normalized power of a 1 Hz power series.
///
/// `None` for series shorter than the rolling window or malformed series,
/// including series with skipped seconds.
pub fn normalized_power(samples: &[Sample]) -> Option<f64> {
    validate_series(samples, Metric::Power).ok()?;

    let mut rolling = RollingAverage::new(NP_WINDOW_SECS);
    let mut sum_fourth = 0.0;
    let mut count = 0usize;

    for sample in samples {
        if let Some(avg) = rolling.add(sample.value) {
            sum_fourth += avg.powi(4);
            count += 1;
        }
    }

    (count > 0).then(|| (sum_fourth / count as f64).powf(0.25))
}

/// Intensity factor for a normalized power.
pub fn intensity_factor(normalized_power: f64, ftp: f64) -> Option<f64> {
    (ftp > 0.0 && ftp.is_finite()).then(|| normalized_power / ftp)
}

/// TSS for a power series at the given FTP.
pub fn training_stress_score(samples: &[Sample], ftp: f64) -> Option<f64> {
    let np = normalized_power(samples)?;
    let if_value = intensity_factor(np, ftp)?;
    let hours = samples.len() as f64 / 3600.0;
    Some(hours * if_value * if_value * 100.0)
}
