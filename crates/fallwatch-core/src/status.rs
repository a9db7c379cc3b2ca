//! Latest-status read model polled by the dashboard.

use serde::{Deserialize, Serialize};

use crate::domain::{FallReading, FallStatus};

/// Prefix of heart-rate rule outcomes that count as danger.
pub const DANGER_PREFIX: &str = "DANGER";

/// Verdict of the external heart-rate rule table and classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateAssessment {
    pub hr: f64,
    pub rule_status: String,
    pub rule_message: String,
    pub ml_status: String,
    pub is_danger: bool,
}

impl HeartRateAssessment {
    /// Build from rule output; danger iff the rule status starts with `DANGER`.
    pub fn from_rule(
        hr: f64,
        rule_status: impl Into<String>,
        rule_message: impl Into<String>,
        ml_status: impl Into<String>,
    ) -> Self {
        let rule_status = rule_status.into();
        let is_danger = rule_status.starts_with(DANGER_PREFIX);
        Self {
            hr,
            rule_status,
            rule_message: rule_message.into(),
            ml_status: ml_status.into(),
            is_danger,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSnapshot {
    pub assessment: HeartRateAssessment,
    pub timestamp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallSnapshot {
    pub status: FallStatus,
    #[serde(rename = "prob")]
    pub probability: f64,
    pub timestamp: f64,
}

impl Default for FallSnapshot {
    fn default() -> Self {
        Self { status: FallStatus::Waiting, probability: 0.0, timestamp: 0.0 }
    }
}

/// Combined view served to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestStatus {
    pub hr: Option<i64>,
    pub hr_danger: bool,
    pub hr_message: Option<String>,
    pub fall_status: FallStatus,
    pub fall_prob: f64,
    /// Heart-rate danger OR an active fall. RECOVERED does not alert.
    pub alert: bool,
}

/// Last known heart-rate and fall state of one subject.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    heart_rate: Option<HeartRateSnapshot>,
    fall: FallSnapshot,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fall(&mut self, reading: FallReading, timestamp: f64) -> FallSnapshot {
        self.fall =
            FallSnapshot { status: reading.status, probability: reading.probability, timestamp };
        self.fall
    }

    pub fn record_heart_rate(&mut self, assessment: HeartRateAssessment, timestamp: f64) {
        self.heart_rate = Some(HeartRateSnapshot { assessment, timestamp });
    }

    pub fn fall(&self) -> FallSnapshot {
        self.fall
    }

    pub fn heart_rate(&self) -> Option<&HeartRateSnapshot> {
        self.heart_rate.as_ref()
    }

    pub fn latest(&self) -> LatestStatus {
        let hr = self.heart_rate.as_ref().map(|s| &s.assessment);
        let hr_danger = hr.map(|a| a.is_danger).unwrap_or(false);
        LatestStatus {
            hr: hr.map(|a| a.hr as i64),
            hr_danger,
            hr_message: hr.map(|a| a.rule_message.clone()),
            fall_status: self.fall.status,
            fall_prob: self.fall.probability,
            alert: hr_danger || self.fall.status == FallStatus::Fall,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_board_is_waiting_without_alert() {
        let s = StatusBoard::new().latest();
        assert_eq!(s.fall_status, FallStatus::Waiting);
        assert_eq!(s.hr, None);
        assert!(!s.alert);
    }

    #[test]
    fn heart_rate_danger_alerts() {
        let mut b = StatusBoard::new();
        let hr = HeartRateAssessment::from_rule(151.7, "DANGER_HIGH", "Tachycardia", "ABNORMAL");
        b.record_heart_rate(hr, 1.0);
        let s = b.latest();
        assert_eq!(s.hr, Some(151));
        assert!(s.hr_danger);
        assert!(s.alert);
        assert_eq!(s.hr_message.as_deref(), Some("Tachycardia"));
    }

    #[test]
    fn fall_alerts_but_recovered_does_not() {
        let mut b = StatusBoard::new();
        b.record_heart_rate(HeartRateAssessment::from_rule(72.0, "NORMAL", "ok", "NORMAL"), 1.0);
        b.record_fall(FallReading::new(FallStatus::Fall, 0.93), 2.0);
        assert!(b.latest().alert);
        b.record_fall(FallReading::new(FallStatus::Recovered, 0.0), 3.0);
        assert!(!b.latest().alert);
        assert_eq!(b.fall().timestamp, 3.0);
    }

    #[test]
    fn danger_prefix_only() {
        assert!(!HeartRateAssessment::from_rule(40.0, "WARNING_LOW", "", "").is_danger);
        assert!(HeartRateAssessment::from_rule(30.0, "DANGER", "", "").is_danger);
    }
}
