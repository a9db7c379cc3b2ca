#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use fallwatch_core::{
    FallClassifier, FallConfig, FallStateMachine, FeatureVector, ManualClock, RawSample,
};

/// Replays a scripted list of verdicts (then "no fall") and records every
/// feature row it is asked about.
#[derive(Default)]
pub struct ScriptedClassifier {
    script: Mutex<VecDeque<(bool, f64)>>,
    current: Mutex<(bool, f64)>,
    pub seen: Mutex<Vec<FeatureVector>>,
}

impl ScriptedClassifier {
    pub fn new(script: &[(bool, f64)]) -> Self {
        Self { script: Mutex::new(script.iter().copied().collect()), ..Default::default() }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl FallClassifier for ScriptedClassifier {
    fn predict(&self, features: &FeatureVector) -> u8 {
        self.seen.lock().unwrap().push(*features);
        let next = self.script.lock().unwrap().pop_front().unwrap_or((false, 0.05));
        *self.current.lock().unwrap() = next;
        next.0 as u8
    }

    fn predict_probability(&self, _: &FeatureVector) -> [f64; 2] {
        let (_, p) = *self.current.lock().unwrap();
        [1.0 - p, p]
    }
}

pub fn still() -> RawSample {
    RawSample::new([0.0, 0.0, 1.0], [0.01, 0.0, 0.0])
}

pub fn machine(
    script: &[(bool, f64)],
) -> (FallStateMachine, Arc<ScriptedClassifier>, Arc<ManualClock>) {
    let classifier = Arc::new(ScriptedClassifier::new(script));
    let clock = Arc::new(ManualClock::new(0.0));
    let m = FallStateMachine::new(FallConfig::default(), classifier.clone(), clock.clone());
    (m, classifier, clock)
}
