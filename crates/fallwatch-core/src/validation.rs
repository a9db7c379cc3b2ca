//! Input validation for sample batches arriving from sensor clients.
//!
//! Malformed rows are dropped here and never reach the state machine.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::domain::RawSample;
use crate::error::{FallwatchError, Result};

/// Body of a sample upload: rows of `[ax, ay, az, gx, gy, gz]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleBatch {
    #[serde(default)]
    pub samples: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcceptedSamples {
    pub samples: Vec<RawSample>,
    /// Rows dropped for wrong arity or NaN/Inf values.
    pub skipped: usize,
}

/// Validate one raw row before ingestion.
pub fn validate_sample(row: &[f64]) -> Result<RawSample> {
    let sample = RawSample::try_from(row)?;
    if !sample.is_finite() {
        return Err(FallwatchError::NonFiniteSample);
    }
    Ok(sample)
}

/// Keep the well-formed rows of a batch, in order.
pub fn accept_samples(rows: &[Vec<f64>]) -> AcceptedSamples {
    let mut out = AcceptedSamples { samples: Vec::with_capacity(rows.len()), skipped: 0 };
    for row in rows {
        match validate_sample(row) {
            Ok(sample) => out.samples.push(sample),
            Err(e) => {
                debug!("dropping sample row: {}", e);
                out.skipped += 1;
            }
        }
    }
    out
}
