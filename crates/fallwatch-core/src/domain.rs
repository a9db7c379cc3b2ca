//! Shared domain types for the fall-detection pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FallwatchError;

/// Samples per classification window.
pub const BUFFER_SIZE: usize = 400;
/// Seconds a detected fall is held before the subject may return to SAFE.
pub const FALL_HOLD_DURATION_SECS: f64 = 30.0;
/// Accel-magnitude std above which post-fall movement counts as recovery.
pub const ACTIVITY_THRESHOLD: f64 = 0.15;
/// Values per raw sample: 3 accel axes then 3 gyro axes.
pub const SAMPLE_WIDTH: usize = 6;

/// One 6-axis IMU reading. Never mutated after ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RawSample {
    pub accel: [f64; 3],
    pub gyro: [f64; 3],
}

impl RawSample {
    pub fn new(accel: [f64; 3], gyro: [f64; 3]) -> Self {
        Self { accel, gyro }
    }

    /// Channel by column index, 0..=2 accel and 3..=5 gyro.
    pub fn channel(&self, idx: usize) -> f64 {
        if idx < 3 {
            self.accel[idx]
        } else {
            self.gyro[idx - 3]
        }
    }

    pub fn accel_magnitude(&self) -> f64 {
        norm3(&self.accel)
    }

    pub fn gyro_magnitude(&self) -> f64 {
        norm3(&self.gyro)
    }

    pub fn is_finite(&self) -> bool {
        self.accel.iter().chain(self.gyro.iter()).all(|v| v.is_finite())
    }
}

fn norm3(v: &[f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

impl TryFrom<&[f64]> for RawSample {
    type Error = FallwatchError;

    fn try_from(row: &[f64]) -> Result<Self, Self::Error> {
        match row {
            [ax, ay, az, gx, gy, gz] => Ok(Self::new([*ax, *ay, *az], [*gx, *gy, *gz])),
            _ => Err(FallwatchError::SampleArity { expected: SAMPLE_WIDTH, actual: row.len() }),
        }
    }
}

/// Status emitted per sample by the fall state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FallStatus {
    /// Buffer still warming up; no classification attempted.
    Waiting,
    Safe,
    Fall,
    /// Movement observed after a held fall; the hold was cleared.
    Recovered,
}

impl FallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallStatus::Waiting => "WAITING",
            FallStatus::Safe => "SAFE",
            FallStatus::Fall => "FALL",
            FallStatus::Recovered => "RECOVERED",
        }
    }
}

impl fmt::Display for FallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of feeding one sample through the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallReading {
    pub status: FallStatus,
    #[serde(rename = "prob")]
    pub probability: f64,
}

impl FallReading {
    pub fn new(status: FallStatus, probability: f64) -> Self {
        Self { status, probability }
    }

    pub fn waiting() -> Self {
        Self::new(FallStatus::Waiting, 0.0)
    }
}

impl Default for FallReading {
    fn default() -> Self {
        Self::waiting()
    }
}
