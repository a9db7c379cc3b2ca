//! Runtime configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `FALLWATCH__*` environment variables (e.g.
//! `FALLWATCH__FALL__ACTIVITY_THRESHOLD=0.2`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{ACTIVITY_THRESHOLD, BUFFER_SIZE, FALL_HOLD_DURATION_SECS};
use crate::error::{FallwatchError, Result};

pub const DEFAULT_MODEL_PATH: &str = "model/fall_detection_model.json";
pub const ENV_PREFIX: &str = "FALLWATCH";

/// Tunables of the fall state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallConfig {
    /// Samples per classification window.
    pub buffer_size: usize,
    /// Seconds a fall is held absent recovery movement.
    pub fall_hold_secs: f64,
    /// Accel-magnitude std that clears a held fall.
    pub activity_threshold: f64,
}

impl Default for FallConfig {
    fn default() -> Self {
        Self {
            buffer_size: BUFFER_SIZE,
            fall_hold_secs: FALL_HOLD_DURATION_SECS,
            activity_threshold: ACTIVITY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Subjects tracked at once; the least recently seen is dropped beyond this.
    pub max_subjects: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self { max_subjects: 64 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallwatchConfig {
    pub model_path: PathBuf,
    pub fall: FallConfig,
    pub monitor: MonitorSettings,
}

impl Default for FallwatchConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            fall: FallConfig::default(),
            monitor: MonitorSettings::default(),
        }
    }
}

impl FallwatchConfig {
    /// Defaults overlaid with `file` (if given and present) and the environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&FallwatchConfig::default())?;
        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let cfg: FallwatchConfig = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: FallwatchConfig =
            toml::from_str(s).map_err(|e| FallwatchError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| FallwatchError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.fall.validate()?;
        if self.monitor.max_subjects == 0 {
            return Err(FallwatchError::Config("monitor.max_subjects must be at least 1".into()));
        }
        Ok(())
    }
}

impl FallConfig {
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(FallwatchError::Config("fall.buffer_size must be at least 1".into()));
        }
        if !(self.fall_hold_secs.is_finite() && self.fall_hold_secs > 0.0) {
            return Err(FallwatchError::Config("fall.fall_hold_secs must be positive".into()));
        }
        if !(self.activity_threshold.is_finite() && self.activity_threshold >= 0.0) {
            return Err(FallwatchError::Config(
                "fall.activity_threshold must be non-negative".into(),
            ));
        }
        Ok(())
    }
}
