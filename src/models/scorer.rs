//! Native evaluation of each classifier family
//!
//! Every family implements [`Scorer`], producing a raw output whose meaning
//! is described by its [`OutputKind`]. Turning that raw output into a binary
//! label happens in exactly one place, [`OutputKind::normalize`], which both
//! live predictions and the startup accuracy computation go through.

use crate::features::FeatureVector;
use crate::models::artifact::{BoostedSpec, ForestSpec, Kernel, LinearSpec, ModelSpec, SvmSpec, TreeSpec};
use serde::{Deserialize, Serialize};

/// Probabilities at or above this value map to the positive label.
pub const PROBABILITY_THRESHOLD: f64 = 0.5;

/// What a model's raw output represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Already a class label, 0.0 or 1.0
    Label,
    /// Positive-class probability in [0, 1]
    Probability,
}

impl OutputKind {
    /// Map a raw model output to a binary label.
    ///
    /// Returns `None` for outputs the kind does not allow: a label other than
    /// 0/1, or a non-finite probability.
    pub fn normalize(self, raw: f64) -> Option<u8> {
        match self {
            OutputKind::Probability if raw.is_finite() => Some(u8::from(raw >= PROBABILITY_THRESHOLD)),
            OutputKind::Probability => None,
            OutputKind::Label if raw == 0.0 => Some(0),
            OutputKind::Label if raw == 1.0 => Some(1),
            OutputKind::Label => None,
        }
    }
}

/// A fitted model that can score one feature vector.
pub trait Scorer: Send + Sync {
    /// Raw output for a feature vector in training column order.
    fn raw_output(&self, features: &FeatureVector) -> f64;

    /// Interpretation of [`raw_output`](Self::raw_output).
    fn output_kind(&self) -> OutputKind;

    /// Short family name for logs.
    fn family(&self) -> &'static str;
}

impl ModelSpec {
    /// Box the fitted parameters behind the [`Scorer`] interface.
    pub fn into_scorer(self) -> Box<dyn Scorer> {
        match self {
            ModelSpec::Svm(spec) => Box::new(spec),
            ModelSpec::Logistic(spec) => Box::new(spec),
            ModelSpec::DecisionTree(spec) => Box::new(spec),
            ModelSpec::RandomForest(spec) => Box::new(spec),
            ModelSpec::GradientBoosting(spec) => Box::new(spec),
        }
    }
}

impl Scorer for SvmSpec {
    fn raw_output(&self, features: &FeatureVector) -> f64 {
        let decision = match &self.coefficients {
            Some(w) => dot(w, features) + self.intercept,
            None => {
                self.support_vectors
                    .iter()
                    .zip(&self.dual_coef)
                    .map(|(sv, alpha)| alpha * kernel(self.kernel, sv, features))
                    .sum::<f64>()
                    + self.intercept
            }
        };
        if decision > 0.0 {
            1.0
        } else {
            0.0
        }
    }

    fn output_kind(&self) -> OutputKind {
        OutputKind::Label
    }

    fn family(&self) -> &'static str {
        "svm"
    }
}

impl Scorer for LinearSpec {
    fn raw_output(&self, features: &FeatureVector) -> f64 {
        sigmoid(dot(&self.coefficients, features) + self.intercept)
    }

    fn output_kind(&self) -> OutputKind {
        OutputKind::Probability
    }

    fn family(&self) -> &'static str {
        "logistic"
    }
}

impl Scorer for TreeSpec {
    fn raw_output(&self, features: &FeatureVector) -> f64 {
        argmax_label(self.leaf(features))
    }

    fn output_kind(&self) -> OutputKind {
        OutputKind::Label
    }

    fn family(&self) -> &'static str {
        "decision_tree"
    }
}

impl Scorer for ForestSpec {
    fn raw_output(&self, features: &FeatureVector) -> f64 {
        let mut votes = [0.0_f64; 2];
        for tree in &self.trees {
            let leaf = tree.leaf(features);
            let total: f64 = leaf.iter().sum();
            if total > 0.0 {
                votes[0] += leaf[0] / total;
                votes[1] += leaf[1] / total;
            }
        }
        argmax_label(&votes)
    }

    fn output_kind(&self) -> OutputKind {
        OutputKind::Label
    }

    fn family(&self) -> &'static str {
        "random_forest"
    }
}

impl Scorer for BoostedSpec {
    fn raw_output(&self, features: &FeatureVector) -> f64 {
        let margin: f64 = self.base_margin + self.trees.iter().map(|t| t.leaf(features)[0]).sum::<f64>();
        sigmoid(margin)
    }

    fn output_kind(&self) -> OutputKind {
        OutputKind::Probability
    }

    fn family(&self) -> &'static str {
        "gradient_boosting"
    }
}

fn dot(weights: &[f64], features: &FeatureVector) -> f64 {
    weights.iter().zip(features.iter()).map(|(w, x)| w * x).sum()
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn kernel(kernel: Kernel, sv: &[f64], x: &FeatureVector) -> f64 {
    match kernel {
        Kernel::Linear => dot(sv, x),
        Kernel::Rbf { gamma } => {
            let sq_dist: f64 = sv.iter().zip(x.iter()).map(|(a, b)| (a - b).powi(2)).sum();
            (-gamma * sq_dist).exp()
        }
        Kernel::Poly { gamma, coef0, degree } => (gamma * dot(sv, x) + coef0).powi(degree),
        Kernel::Sigmoid { gamma, coef0 } => (gamma * dot(sv, x) + coef0).tanh(),
    }
}

/// Index of the larger class weight; ties go to class 0.
fn argmax_label(weights: &[f64]) -> f64 {
    if weights[1] > weights[0] {
        1.0
    } else {
        0.0
    }
}
