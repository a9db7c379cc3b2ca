//! Error types shared by the fallwatch crates.

use thiserror::Error;

/// Result alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, FallwatchError>;

#[derive(Error, Debug)]
pub enum FallwatchError {
    /// A raw sample row did not carry exactly six values.
    #[error("sample has {actual} values, expected {expected}")]
    SampleArity { expected: usize, actual: usize },

    #[error("sample contains NaN/Inf")]
    NonFiniteSample,

    /// The persisted classifier could not be loaded or failed validation.
    #[error("failed to load fall model: {0}")]
    ModelLoad(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// A window handed to an offline tool had the wrong number of rows.
    #[error("window has {actual} rows, expected {expected}")]
    WindowSize { expected: usize, actual: usize },

    /// Every tracked subject is inside a fall hold, so none can be dropped to
    /// make room for a new one.
    #[error("cannot track {subject}: all {max} subjects are holding a fall")]
    SubjectLimit { subject: String, max: usize },
}

impl From<config::ConfigError> for FallwatchError {
    fn from(e: config::ConfigError) -> Self {
        FallwatchError::Config(e.to_string())
    }
}
