//! Fall hysteresis controller.
//!
//! Turns per-window classifier output into a debounced status. A positive
//! window raises FALL and stamps the fall time. While that stamp is younger
//! than the hold duration, negative windows keep reporting FALL unless the
//! window shows enough accel variability to count as voluntary movement, in
//! which case the stamp is cleared and RECOVERED is reported once.

use std::sync::Arc;

use log::{debug, info};

use crate::buffer::SlidingWindowBuffer;
use crate::classifier::{classify, FallClassifier};
use crate::clock::Clock;
use crate::domain::{FallReading, FallStatus, RawSample};
use crate::features::{accel_activity, extract};
use crate::settings::FallConfig;

/// Per-subject fall detection state: sample window plus last fall time.
pub struct FallStateMachine {
    cfg: FallConfig,
    buffer: SlidingWindowBuffer,
    classifier: Arc<dyn FallClassifier>,
    clock: Arc<dyn Clock>,
    last_fall_at: Option<f64>,
}

impl FallStateMachine {
    pub fn new(
        cfg: FallConfig,
        classifier: Arc<dyn FallClassifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let buffer = SlidingWindowBuffer::with_capacity(cfg.buffer_size);
        Self { cfg, buffer, classifier, clock, last_fall_at: None }
    }

    pub fn config(&self) -> &FallConfig {
        &self.cfg
    }

    /// Time of the most recent uncleared fall, `None` if never or cleared.
    pub fn last_fall_at(&self) -> Option<f64> {
        self.last_fall_at
    }

    /// Whether a detected fall is still inside its hold at the current time.
    pub fn is_holding(&self) -> bool {
        self.holding_at(self.clock.now_secs())
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Forget all samples and any held fall.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.last_fall_at = None;
    }

    /// Feed one sample and get the status it produces.
    pub fn on_sample(&mut self, sample: RawSample) -> FallReading {
        self.buffer.push(sample);
        if !self.buffer.is_full() {
            return FallReading::waiting();
        }

        let window = self.buffer.snapshot();
        let features = extract(&window);
        let result = classify(self.classifier.as_ref(), &features);
        let now = self.clock.now_secs();
        debug!("window classified: is_fall={} p={:.3}", result.is_fall, result.probability);

        if result.is_fall {
            if !self.holding_at(now) {
                info!("fall detected (p={:.3})", result.probability);
            }
            self.last_fall_at = Some(now);
            return FallReading::new(FallStatus::Fall, result.probability);
        }

        if self.holding_at(now) {
            let activity = accel_activity(&window);
            if activity > self.cfg.activity_threshold {
                info!("recovery movement after fall (activity={:.3})", activity);
                self.last_fall_at = None;
                return FallReading::new(FallStatus::Recovered, 0.0);
            }
            // held falls report 0.0, not the current window's probability
            return FallReading::new(FallStatus::Fall, 0.0);
        }

        FallReading::new(FallStatus::Safe, 0.0)
    }

    fn holding_at(&self, now: f64) -> bool {
        match self.last_fall_at {
            Some(at) => now - at < self.cfg.fall_hold_secs,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::features::FeatureVector;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reports a fall on the first `falls` windows, then never.
    struct FallsThenCalm {
        falls: usize,
        calls: AtomicUsize,
    }

    impl FallsThenCalm {
        fn new(falls: usize) -> Self {
            Self { falls, calls: AtomicUsize::new(0) }
        }
    }

    impl FallClassifier for FallsThenCalm {
        fn predict(&self, _: &FeatureVector) -> u8 {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            (n < self.falls) as u8
        }

        fn predict_probability(&self, _: &FeatureVector) -> [f64; 2] {
            if self.calls.load(Ordering::SeqCst) <= self.falls {
                [0.1, 0.9]
            } else {
                [0.8, 0.2]
            }
        }
    }

    fn still() -> RawSample {
        RawSample::new([0.0, 0.0, 1.0], [0.0; 3])
    }

    fn jolt() -> RawSample {
        RawSample::new([0.0, 0.0, 3.0], [0.5, 0.5, 0.5])
    }

    fn machine(buffer_size: usize, falls: usize) -> (FallStateMachine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000.0));
        let cfg = FallConfig { buffer_size, ..FallConfig::default() };
        let m = FallStateMachine::new(cfg, Arc::new(FallsThenCalm::new(falls)), clock.clone());
        (m, clock)
    }

    #[test]
    fn waits_until_window_full() {
        let (mut m, _) = machine(5, 0);
        for _ in 0..4 {
            assert_eq!(m.on_sample(still()), FallReading::waiting());
        }
        assert_eq!(m.on_sample(still()).status, FallStatus::Safe);
    }

    #[test]
    fn fall_reports_classifier_probability() {
        let (mut m, clock) = machine(3, 1);
        m.on_sample(still());
        m.on_sample(still());
        let r = m.on_sample(still());
        assert_eq!(r.status, FallStatus::Fall);
        assert!((r.probability - 0.9).abs() < 1e-12);
        assert_eq!(m.last_fall_at(), Some(clock.now_secs()));
    }

    #[test]
    fn held_fall_reports_zero_probability_then_expires() {
        let (mut m, clock) = machine(3, 1);
        for _ in 0..3 {
            m.on_sample(still());
        }
        clock.set(1_029.5);
        assert_eq!(m.on_sample(still()), FallReading::new(FallStatus::Fall, 0.0));
        assert!(m.is_holding());
        clock.set(1_030.0);
        assert_eq!(m.on_sample(still()), FallReading::new(FallStatus::Safe, 0.0));
        assert!(!m.is_holding());
    }

    #[test]
    fn movement_clears_hold() {
        let (mut m, clock) = machine(3, 1);
        for _ in 0..3 {
            m.on_sample(still());
        }
        clock.advance(5.0);
        // magnitudes 1, 1, 3: std ~0.943
        assert_eq!(m.on_sample(jolt()), FallReading::new(FallStatus::Recovered, 0.0));
        assert_eq!(m.last_fall_at(), None);
        clock.advance(1.0);
        assert_eq!(m.on_sample(still()).status, FallStatus::Safe);
    }

    #[test]
    fn repeated_fall_restamps_hold() {
        let (mut m, clock) = machine(2, 2);
        m.on_sample(still());
        m.on_sample(still());
        clock.advance(20.0);
        assert_eq!(m.on_sample(still()).status, FallStatus::Fall);
        clock.advance(20.0);
        // 20s after the second fall, still held
        assert_eq!(m.on_sample(still()).status, FallStatus::Fall);
    }

    #[test]
    fn reset_returns_to_waiting() {
        let (mut m, _) = machine(2, 1);
        m.on_sample(still());
        m.on_sample(still());
        assert!(m.last_fall_at().is_some());
        m.reset();
        assert_eq!(m.buffered(), 0);
        assert_eq!(m.last_fall_at(), None);
        assert_eq!(m.on_sample(still()).status, FallStatus::Waiting);
    }
}
