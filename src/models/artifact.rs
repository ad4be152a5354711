//! Serialized model artifact schema
//!
//! Artifacts are JSON documents holding the fitted parameters of one
//! classifier, optionally preceded by a standardization step:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "feature_names": ["male", "age", "..."],
//!   "scaler": { "mean": [...], "scale": [...] },
//!   "model": { "kind": "svm", "kernel": { "type": "rbf", "gamma": 0.1 }, ... }
//! }
//! ```
//!
//! Structural problems (wrong vector widths, dangling tree children) are
//! caught by [`ModelArtifact::validate`] at load time so scoring never has to
//! bounds-check.

use crate::features::{FeatureVector, FEATURE_COUNT};
use serde::{Deserialize, Serialize};

/// Artifact format understood by this build.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

fn default_format_version() -> u32 {
    ARTIFACT_FORMAT_VERSION
}

/// Top-level artifact document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    /// Column names the model was fitted on, if recorded
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    /// Standardization applied before the model
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
    pub model: ModelSpec,
}

/// Fitted parameters of one classifier family
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    Svm(SvmSpec),
    Logistic(LinearSpec),
    DecisionTree(TreeSpec),
    RandomForest(ForestSpec),
    GradientBoosting(BoostedSpec),
}

/// `(x - mean) / scale` per feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn transform(&self, features: &FeatureVector) -> FeatureVector {
        let mut out = *features;
        for (i, value) in out.iter_mut().enumerate() {
            *value = (*value - self.mean[i]) / self.scale[i];
        }
        out
    }

    fn validate(&self) -> Result<(), String> {
        check_width("scaler.mean", self.mean.len())?;
        check_width("scaler.scale", self.scale.len())?;
        if let Some(i) = self.scale.iter().position(|s| *s == 0.0 || !s.is_finite()) {
            return Err(format!("scaler.scale[{}] must be finite and non-zero", i));
        }
        Ok(())
    }
}

/// Linear decision function `w·x + b`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSpec {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

/// Support vector classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmSpec {
    pub kernel: Kernel,
    /// Primal weights; only valid with a linear kernel
    #[serde(default)]
    pub coefficients: Option<Vec<f64>>,
    #[serde(default)]
    pub support_vectors: Vec<Vec<f64>>,
    /// One signed dual coefficient per support vector
    #[serde(default)]
    pub dual_coef: Vec<f64>,
    pub intercept: f64,
}

/// SVM kernel function
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kernel {
    Linear,
    Rbf { gamma: f64 },
    Poly { gamma: f64, coef0: f64, degree: i32 },
    Sigmoid { gamma: f64, coef0: f64 },
}

/// How a split node compares a feature against its threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitRule {
    /// `x <= threshold` goes left (scikit-learn, LightGBM)
    #[default]
    Le,
    /// `x < threshold` goes left (XGBoost)
    Lt,
}

/// One node of a flat tree array
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

/// Binary decision tree stored as a node array rooted at index 0
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSpec {
    #[serde(default)]
    pub split_rule: SplitRule,
    pub nodes: Vec<TreeNode>,
}

impl TreeSpec {
    /// Walk from the root to a leaf and return its value.
    ///
    /// Requires a validated tree: children always point forward, so the walk
    /// terminates within `nodes.len()` steps.
    pub fn leaf(&self, features: &FeatureVector) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = features[*feature];
                    let go_left = match self.split_rule {
                        SplitRule::Le => x <= *threshold,
                        SplitRule::Lt => x < *threshold,
                    };
                    index = if go_left { *left } else { *right };
                }
            }
        }
    }

    fn validate(&self, leaf_width: usize, label: &str) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err(format!("{} has no nodes", label));
        }
        let len = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= FEATURE_COUNT {
                        return Err(format!("{} node {}: feature index {} out of range", label, i, feature));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("{} node {}: threshold is not finite", label, i));
                    }
                    for child in [left, right] {
                        if *child <= i || *child >= len {
                            return Err(format!("{} node {}: child {} must point forward within {} nodes", label, i, child, len));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != leaf_width {
                        return Err(format!(
                            "{} node {}: leaf has {} values, expected {}",
                            label,
                            i,
                            value.len(),
                            leaf_width
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Bagged ensemble of classification trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestSpec {
    pub trees: Vec<TreeSpec>,
}

/// Additive ensemble of regression trees with a logistic link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostedSpec {
    /// Initial margin added before the tree outputs
    #[serde(default)]
    pub base_margin: f64,
    pub trees: Vec<TreeSpec>,
}

impl ModelArtifact {
    /// Check structural consistency of the fitted parameters.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(scaler) = &self.scaler {
            scaler.validate()?;
        }
        self.model.validate()
    }
}

impl ModelSpec {
    fn validate(&self) -> Result<(), String> {
        match self {
            ModelSpec::Logistic(spec) => check_width("coefficients", spec.coefficients.len()),
            ModelSpec::Svm(spec) => spec.validate(),
            ModelSpec::DecisionTree(tree) => tree.validate(2, "tree"),
            ModelSpec::RandomForest(forest) => {
                if forest.trees.is_empty() {
                    return Err("random forest has no trees".to_string());
                }
                forest
                    .trees
                    .iter()
                    .enumerate()
                    .try_for_each(|(i, tree)| tree.validate(2, &format!("tree {}", i)))
            }
            ModelSpec::GradientBoosting(boosted) => {
                if boosted.trees.is_empty() {
                    return Err("gradient boosting model has no trees".to_string());
                }
                boosted
                    .trees
                    .iter()
                    .enumerate()
                    .try_for_each(|(i, tree)| tree.validate(1, &format!("tree {}", i)))
            }
        }
    }
}

impl SvmSpec {
    fn validate(&self) -> Result<(), String> {
        if let Some(coefficients) = &self.coefficients {
            if self.kernel != Kernel::Linear {
                return Err("primal coefficients require a linear kernel".to_string());
            }
            return check_width("coefficients", coefficients.len());
        }
        if self.support_vectors.is_empty() {
            return Err("svm needs either coefficients or support vectors".to_string());
        }
        if self.support_vectors.len() != self.dual_coef.len() {
            return Err(format!(
                "{} support vectors but {} dual coefficients",
                self.support_vectors.len(),
                self.dual_coef.len()
            ));
        }
        self.support_vectors
            .iter()
            .enumerate()
            .try_for_each(|(i, sv)| check_width(&format!("support_vectors[{}]", i), sv.len()))
    }
}

fn check_width(label: &str, len: usize) -> Result<(), String> {
    if len == FEATURE_COUNT {
        Ok(())
    } else {
        Err(format!("{} has {} entries, expected {}", label, len, FEATURE_COUNT))
    }
}
