use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};
use lru::LruCache;

use crate::classifier::FallClassifier;
use crate::clock::Clock;
use crate::domain::{FallReading, RawSample};
use crate::error::{FallwatchError, Result};
use crate::fall_state::FallStateMachine;
use crate::settings::{FallConfig, FallwatchConfig};
use crate::status::{FallSnapshot, HeartRateAssessment, LatestStatus, StatusBoard};
use crate::validation::accept_samples;

/// Everything owned by one monitored subject. Locked as a unit so a sample's
/// push, window snapshot and fall-time update never interleave with another
/// caller's.
struct SubjectSlot {
    machine: FallStateMachine,
    board: StatusBoard,
}

/// Routes sample batches and heart-rate verdicts to per-subject state.
pub struct FallMonitor {
    fall_cfg: FallConfig,
    classifier: Arc<dyn FallClassifier>,
    clock: Arc<dyn Clock>,
    subjects: Mutex<LruCache<String, Arc<Mutex<SubjectSlot>>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FallMonitor {
    pub fn new(
        cfg: &FallwatchConfig,
        classifier: Arc<dyn FallClassifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        cfg.validate()?;
        let cap = NonZeroUsize::new(cfg.monitor.max_subjects).ok_or_else(|| {
            FallwatchError::Config("monitor.max_subjects must be at least 1".into())
        })?;
        Ok(Self {
            fall_cfg: cfg.fall.clone(),
            classifier,
            clock,
            subjects: Mutex::new(LruCache::new(cap)),
        })
    }

    /// Look up or start tracking `subject`.
    ///
    /// At the subject limit the least recently seen subject that is not
    /// holding a fall is dropped. A held fall is never dropped; if every
    /// tracked subject is holding, the new subject is refused.
    fn slot(&self, subject: &str) -> Result<Arc<Mutex<SubjectSlot>>> {
        let mut subjects = lock(&self.subjects);
        if let Some(slot) = subjects.get(subject) {
            return Ok(slot.clone());
        }

        if subjects.len() >= subjects.cap().get() {
            // slot locks are only ever taken after the registry lock
            let victim = subjects
                .iter()
                .rev()
                .find(|&(_, slot)| !lock(slot).machine.is_holding())
                .map(|(key, _)| key.clone());
            match victim {
                Some(key) => {
                    subjects.pop(&key);
                    warn!("subject limit reached, dropped state of {}", key);
                }
                None => {
                    warn!("all {} subjects hold a fall, refusing {}", subjects.cap(), subject);
                    return Err(FallwatchError::SubjectLimit {
                        subject: subject.to_string(),
                        max: subjects.cap().get(),
                    });
                }
            }
        }

        debug!("tracking new subject {}", subject);
        let machine = FallStateMachine::new(
            self.fall_cfg.clone(),
            self.classifier.clone(),
            self.clock.clone(),
        );
        let slot = Arc::new(Mutex::new(SubjectSlot { machine, board: StatusBoard::new() }));
        subjects.put(subject.to_string(), slot.clone());
        Ok(slot)
    }

    /// Feed a batch of raw rows for `subject`. Malformed rows are skipped.
    ///
    /// Returns the status after the last accepted sample, or WAITING when the
    /// batch held none, and records it as the subject's latest fall state.
    pub fn ingest_batch(&self, subject: &str, rows: &[Vec<f64>]) -> Result<FallSnapshot> {
        let accepted = accept_samples(rows);
        if accepted.skipped > 0 {
            debug!("{}: skipped {} malformed rows", subject, accepted.skipped);
        }
        self.ingest_samples(subject, accepted.samples)
    }

    /// Feed already validated samples for `subject`.
    pub fn ingest_samples(
        &self,
        subject: &str,
        samples: impl IntoIterator<Item = RawSample>,
    ) -> Result<FallSnapshot> {
        let slot = self.slot(subject)?;
        let mut slot = lock(&slot);
        let mut reading = FallReading::waiting();
        for sample in samples {
            reading = slot.machine.on_sample(sample);
        }
        let now = self.clock.now_secs();
        Ok(slot.board.record_fall(reading, now))
    }

    pub fn record_heart_rate(
        &self,
        subject: &str,
        assessment: HeartRateAssessment,
    ) -> Result<LatestStatus> {
        let slot = self.slot(subject)?;
        let mut slot = lock(&slot);
        let now = self.clock.now_secs();
        slot.board.record_heart_rate(assessment, now);
        Ok(slot.board.latest())
    }

    /// `None` for subjects never seen (or already evicted).
    pub fn latest_status(&self, subject: &str) -> Option<LatestStatus> {
        let slot = lock(&self.subjects).peek(subject).cloned()?;
        let slot = lock(&slot);
        Some(slot.board.latest())
    }

    /// Time of the subject's held fall, if any.
    pub fn last_fall_at(&self, subject: &str) -> Option<f64> {
        let slot = lock(&self.subjects).peek(subject).cloned()?;
        let slot = lock(&slot);
        slot.machine.last_fall_at()
    }

    /// Number of samples currently in the subject's window.
    pub fn buffered(&self, subject: &str) -> Option<usize> {
        let slot = lock(&self.subjects).peek(subject).cloned()?;
        let slot = lock(&slot);
        Some(slot.machine.buffered())
    }

    /// Clear a subject's window and fall hold, e.g. after a device reconnect.
    pub fn reset_subject(&self, subject: &str) -> bool {
        let Some(slot) = lock(&self.subjects).peek(subject).cloned() else {
            return false;
        };
        lock(&slot).machine.reset();
        true
    }

    pub fn subject_count(&self) -> usize {
        lock(&self.subjects).len()
    }
}
