//! Fall classifier capability and the persisted model it is loaded from.
//!
//! The pretrained model ships as a JSON artifact exported from the training
//! pipeline. Two model families are understood: a logistic regression and a
//! random forest in scikit-learn's flattened tree layout. Either may be
//! preceded by a standard scaler.
//!
//! ```json
//! { "kind": "logistic", "coefficients": [..], "intercept": -1.2,
//!   "scaler": { "mean": [..], "scale": [..] } }
//! ```

use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{FallwatchError, Result};
use crate::features::{FeatureVector, FEATURE_COUNT};

/// Label emitted by the model for a fall window.
pub const FALL_LABEL: u8 = 1;

/// Binary fall classifier over a feature row.
///
/// Implemented by [`FallModel`]; tests substitute deterministic stubs.
pub trait FallClassifier: Send + Sync {
    /// Predicted label, 0 (no fall) or 1 (fall).
    fn predict(&self, features: &FeatureVector) -> u8;

    /// `[p(no fall), p(fall)]`.
    fn predict_probability(&self, features: &FeatureVector) -> [f64; 2];
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierResult {
    pub is_fall: bool,
    pub probability: f64,
}

/// Run one window's features through the classifier.
pub fn classify(model: &dyn FallClassifier, features: &FeatureVector) -> ClassifierResult {
    let label = model.predict(features);
    let probs = model.predict_probability(features);
    ClassifierResult { is_fall: label == FALL_LABEL, probability: probs[1] }
}

/// Per-feature standardisation applied before the model: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    fn transform(&self, features: &FeatureVector) -> FeatureVector {
        let mut out = features.0;
        for (i, v) in out.iter_mut().enumerate() {
            *v = (*v - self.mean[i]) / self.scale[i];
        }
        FeatureVector(out)
    }
}

/// One binary decision tree. Node `i` is a leaf when `children_left[i] == -1`;
/// otherwise samples go left iff `x[feature[i]] <= threshold[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Class weights `[no fall, fall]` per node; only leaves are read.
    pub value: Vec<[f64; 2]>,
}

impl DecisionTree {
    fn leaf_distribution(&self, x: &[f64]) -> [f64; 2] {
        let mut node = 0usize;
        while self.children_left[node] >= 0 {
            let f = self.feature[node] as usize;
            node = if x[f] <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        let [w0, w1] = self.value[node];
        let total = w0 + w1;
        [w0 / total, w1 / total]
    }

    fn validate(&self, idx: usize) -> Result<()> {
        let n = self.children_left.len();
        let invalid =
            |msg: String| Err(FallwatchError::ModelLoad(format!("tree {}: {}", idx, msg)));
        if n == 0 {
            return invalid("no nodes".into());
        }
        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            return invalid("node arrays differ in length".into());
        }
        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left < 0 {
                if right >= 0 {
                    return invalid(format!("node {} has only a right child", node));
                }
                let [w0, w1] = self.value[node];
                if !(w0 >= 0.0 && w1 >= 0.0 && (w0 + w1) > 0.0 && (w0 + w1).is_finite()) {
                    return invalid(format!("leaf {} has no usable class weights", node));
                }
                continue;
            }
            // children must point forward so traversal always terminates
            for child in [left, right] {
                if child as usize <= node || child as usize >= n {
                    return invalid(format!("node {} has child {} out of range", node, child));
                }
            }
            let f = self.feature[node];
            if f < 0 || f as usize >= FEATURE_COUNT {
                return invalid(format!("node {} splits on feature {}", node, f));
            }
            if self.threshold[node].is_nan() {
                return invalid(format!("node {} has NaN threshold", node));
            }
        }
        Ok(())
    }
}

/// Model family and parameters, tagged by `"kind"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelKind {
    Logistic { coefficients: Vec<f64>, intercept: f64 },
    Forest { trees: Vec<DecisionTree> },
}

/// On-disk form of the pretrained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    #[serde(flatten)]
    pub model: ModelKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler: Option<StandardScaler>,
}

impl ModelArtifact {
    fn validate(&self) -> Result<()> {
        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != FEATURE_COUNT || scaler.scale.len() != FEATURE_COUNT {
                return Err(FallwatchError::ModelLoad(format!(
                    "scaler expects {} features",
                    FEATURE_COUNT
                )));
            }
            if scaler.scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
                return Err(FallwatchError::ModelLoad("scaler has zero or non-finite scale".into()));
            }
        }
        match &self.model {
            ModelKind::Logistic { coefficients, intercept } => {
                if coefficients.len() != FEATURE_COUNT {
                    return Err(FallwatchError::ModelLoad(format!(
                        "logistic model has {} coefficients, expected {}",
                        coefficients.len(),
                        FEATURE_COUNT
                    )));
                }
                if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
                    return Err(FallwatchError::ModelLoad("non-finite logistic parameters".into()));
                }
            }
            ModelKind::Forest { trees } => {
                if trees.is_empty() {
                    return Err(FallwatchError::ModelLoad("forest has no trees".into()));
                }
                for (i, tree) in trees.iter().enumerate() {
                    tree.validate(i)?;
                }
            }
        }
        Ok(())
    }
}

/// A validated pretrained fall model.
#[derive(Debug, Clone)]
pub struct FallModel {
    artifact: ModelArtifact,
}

impl FallModel {
    /// Validate an in-memory artifact.
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        artifact.validate()?;
        Ok(Self { artifact })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: ModelArtifact =
            serde_json::from_str(json).map_err(|e| FallwatchError::ModelLoad(e.to_string()))?;
        Self::from_artifact(artifact)
    }

    /// Load the persisted model. Any failure here must stop fall detection
    /// from starting.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| FallwatchError::ModelLoad(format!("{}: {}", path.display(), e)))?;
        let model = Self::from_json(&json)?;
        info!("loaded fall model from {} ({})", path.display(), model.describe());
        Ok(model)
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Short human-readable summary, e.g. `forest of 100 trees, scaled`.
    pub fn describe(&self) -> String {
        let base = match &self.artifact.model {
            ModelKind::Logistic { .. } => "logistic regression".to_string(),
            ModelKind::Forest { trees } => format!("forest of {} trees", trees.len()),
        };
        if self.artifact.scaler.is_some() {
            format!("{}, scaled", base)
        } else {
            base
        }
    }

    fn prepare(&self, features: &FeatureVector) -> FeatureVector {
        match &self.artifact.scaler {
            Some(scaler) => scaler.transform(features),
            None => *features,
        }
    }

    fn logistic_decision(coefficients: &[f64], intercept: f64, x: &FeatureVector) -> f64 {
        coefficients.iter().zip(x.as_slice()).map(|(w, v)| w * v).sum::<f64>() + intercept
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl FallClassifier for FallModel {
    fn predict(&self, features: &FeatureVector) -> u8 {
        let x = self.prepare(features);
        match &self.artifact.model {
            ModelKind::Logistic { coefficients, intercept } => {
                if Self::logistic_decision(coefficients, *intercept, &x) > 0.0 {
                    FALL_LABEL
                } else {
                    0
                }
            }
            ModelKind::Forest { .. } => {
                let [p0, p1] = self.predict_probability(features);
                // ties resolve to the first class
                if p1 > p0 {
                    FALL_LABEL
                } else {
                    0
                }
            }
        }
    }

    fn predict_probability(&self, features: &FeatureVector) -> [f64; 2] {
        let x = self.prepare(features);
        match &self.artifact.model {
            ModelKind::Logistic { coefficients, intercept } => {
                let p1 = sigmoid(Self::logistic_decision(coefficients, *intercept, &x));
                [1.0 - p1, p1]
            }
            ModelKind::Forest { trees } => {
                let mut acc = [0.0, 0.0];
                for tree in trees {
                    let [a, b] = tree.leaf_distribution(x.as_slice());
                    acc[0] += a;
                    acc[1] += b;
                }
                let n = trees.len() as f64;
                [acc[0] / n, acc[1] / n]
            }
        }
    }
}
