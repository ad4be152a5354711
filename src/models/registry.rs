//! Loaded models and their startup accuracy figures

use crate::config::AppConfig;
use crate::dataset::EvaluationDataset;
use crate::error::{DatasetShapeError, Result, RiskApiError};
use crate::features::FeatureVector;
use crate::models::artifact::{ModelArtifact, StandardScaler};
use crate::models::loader::ModelLoader;
use crate::models::scorer::{OutputKind, Scorer};
use crate::models::variant::Variant;
use crate::types::record::FeatureRecord;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::info;

/// One fitted model bound to its variant
pub struct ModelHandle {
    variant: Variant,
    scaler: Option<StandardScaler>,
    scorer: Box<dyn Scorer>,
}

impl ModelHandle {
    pub fn new(variant: Variant, artifact: ModelArtifact) -> Self {
        Self {
            variant,
            scaler: artifact.scaler,
            scorer: artifact.model.into_scorer(),
        }
    }

    /// Build a handle around an arbitrary scorer, without standardization
    pub fn from_scorer(variant: Variant, scorer: Box<dyn Scorer>) -> Self {
        Self {
            variant,
            scaler: None,
            scorer,
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Display name reported to clients
    pub fn name(&self) -> &'static str {
        self.variant.display_name()
    }

    pub fn family(&self) -> &'static str {
        self.scorer.family()
    }

    pub fn output_kind(&self) -> OutputKind {
        self.scorer.output_kind()
    }

    pub fn has_scaler(&self) -> bool {
        self.scaler.is_some()
    }

    /// Raw model output for a vector in training column order
    pub fn raw_output(&self, features: &FeatureVector) -> f64 {
        match &self.scaler {
            Some(scaler) => self.scorer.raw_output(&scaler.transform(features)),
            None => self.scorer.raw_output(features),
        }
    }

    /// Score one record to a binary label
    pub fn score(&self, record: &FeatureRecord) -> Result<u8> {
        let raw = self.raw_output(&record.to_vector());
        self.output_kind()
            .normalize(raw)
            .ok_or_else(|| RiskApiError::InvalidModelOutput {
                model: self.name().to_string(),
                value: raw,
            })
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("variant", &self.variant)
            .field("family", &self.family())
            .field("output_kind", &self.output_kind())
            .field("scaled", &self.has_scaler())
            .finish()
    }
}

/// Score a single record with a loaded model
pub fn score_one(handle: &ModelHandle, record: &FeatureRecord) -> Result<u8> {
    handle.score(record)
}

/// Fraction of dataset rows the model labels correctly
pub fn compute_accuracy(handle: &ModelHandle, dataset: &EvaluationDataset) -> Result<f64> {
    if dataset.is_empty() {
        return Err(DatasetShapeError::Empty.into());
    }

    let mut correct = 0usize;
    for (record, label) in dataset.iter() {
        if score_one(handle, record)? == label {
            correct += 1;
        }
    }
    Ok(correct as f64 / dataset.len() as f64)
}

/// A loaded model with its cached accuracy
#[derive(Debug)]
pub struct RegisteredModel {
    pub handle: ModelHandle,
    pub accuracy: f64,
}

/// Immutable table of every model served by the process
#[derive(Debug)]
pub struct ModelRegistry {
    models: BTreeMap<Variant, RegisteredModel>,
    loaded_at: DateTime<Utc>,
}

impl ModelRegistry {
    /// Load the evaluation dataset and every configured model, then score them
    pub fn load(config: &AppConfig) -> Result<Self> {
        let dataset = EvaluationDataset::load(&config.evaluation)?;
        let handles = ModelLoader::new().load_all(&config.models)?;
        Self::build(handles, &dataset)
    }

    /// Compute accuracy for each handle and freeze the table
    pub fn build(handles: Vec<ModelHandle>, dataset: &EvaluationDataset) -> Result<Self> {
        let mut models = BTreeMap::new();
        for handle in handles {
            let variant = handle.variant();
            if models.contains_key(&variant) {
                return Err(RiskApiError::Config(format!("model {} registered twice", variant)));
            }

            let accuracy = compute_accuracy(&handle, dataset)?;
            info!(
                model = %variant,
                name = handle.name(),
                accuracy = accuracy,
                rows = dataset.len(),
                "Model evaluated"
            );
            models.insert(variant, RegisteredModel { handle, accuracy });
        }

        Ok(Self {
            models,
            loaded_at: Utc::now(),
        })
    }

    pub fn get(&self, variant: Variant) -> Option<&RegisteredModel> {
        self.models.get(&variant)
    }

    pub fn contains(&self, variant: Variant) -> bool {
        self.models.contains_key(&variant)
    }

    /// Loaded variants in route-table order
    pub fn variants(&self) -> Vec<Variant> {
        self.models.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Variant, &RegisteredModel)> + '_ {
        self.models.iter().map(|(v, m)| (*v, m))
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}
