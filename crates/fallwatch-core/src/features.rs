//! Window feature extraction.
//!
//! The layout of [`FeatureVector`] is the input contract of the pretrained
//! fall model and must not be reordered:
//!
//! | slots  | content                                           |
//! |--------|---------------------------------------------------|
//! | 0..5   | accel magnitude: mean, std, max, min, rms         |
//! | 5..10  | gyro magnitude: mean, std, max, min, rms          |
//! | 10..13 | per-axis accel mean (x, y, z)                     |
//! | 13..19 | per-channel rms (ax, ay, az, gx, gy, gz)          |
//!
//! Standard deviations are population (divide by N).

use serde::{Deserialize, Serialize};

use crate::buffer::Window;
use crate::domain::SAMPLE_WIDTH;

pub const FEATURE_COUNT: usize = 19;

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "acc_svm_mean",
    "acc_svm_std",
    "acc_svm_max",
    "acc_svm_min",
    "acc_svm_rms",
    "gyro_svm_mean",
    "gyro_svm_std",
    "gyro_svm_max",
    "gyro_svm_min",
    "gyro_svm_rms",
    "acc_x_mean",
    "acc_y_mean",
    "acc_z_mean",
    "acc_x_rms",
    "acc_y_rms",
    "acc_z_rms",
    "gyro_x_rms",
    "gyro_y_rms",
    "gyro_z_rms",
];

/// Fixed-order feature row fed to the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn get(&self, idx: usize) -> Option<f64> {
        self.0.get(idx).copied()
    }

    /// (name, value) pairs in model order.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.0.iter().copied())
    }
}

/// Summary statistics of one magnitude series.
#[derive(Debug, Clone, Copy, Default)]
struct SeriesStats {
    mean: f64,
    std: f64,
    max: f64,
    min: f64,
    rms: f64,
}

impl SeriesStats {
    fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let mean = mean(values);
        Self {
            mean,
            std: std_dev(values, mean),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            rms: rms(values.iter().copied(), values.len()),
        }
    }
}

/// Compute the 19-value feature row for a full window.
///
/// Pure: reads the window only. An empty window yields all zeros.
pub fn extract(window: &Window<'_>) -> FeatureVector {
    let n = window.len();
    let svm_acc = accel_magnitudes(window);
    let svm_gyro: Vec<f64> = window.iter().map(|s| s.gyro_magnitude()).collect();

    let acc = SeriesStats::of(&svm_acc);
    let gyro = SeriesStats::of(&svm_gyro);

    let mut out = [0.0; FEATURE_COUNT];
    out[..5].copy_from_slice(&[acc.mean, acc.std, acc.max, acc.min, acc.rms]);
    out[5..10].copy_from_slice(&[gyro.mean, gyro.std, gyro.max, gyro.min, gyro.rms]);

    if n > 0 {
        for axis in 0..3 {
            out[10 + axis] = window.iter().map(|s| s.accel[axis]).sum::<f64>() / n as f64;
        }
        for ch in 0..SAMPLE_WIDTH {
            out[13 + ch] = rms(window.iter().map(|s| s.channel(ch)), n);
        }
    }

    FeatureVector(out)
}

/// Population std of accel magnitude over the window; the post-fall
/// movement measure.
pub fn accel_activity(window: &Window<'_>) -> f64 {
    let svm_acc = accel_magnitudes(window);
    if svm_acc.is_empty() {
        return 0.0;
    }
    std_dev(&svm_acc, mean(&svm_acc))
}

fn accel_magnitudes(window: &Window<'_>) -> Vec<f64> {
    window.iter().map(|s| s.accel_magnitude()).collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64], mean: f64) -> f64 {
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

fn rms(values: impl Iterator<Item = f64>, n: usize) -> f64 {
    (values.map(|v| v * v).sum::<f64>() / n as f64).sqrt()
}
