//! Prediction dispatch
//!
//! One operation, parametrized by [`Variant`], turns a validated feature
//! record into a response carrying the model's label and its cached accuracy.

use crate::error::{Result, RiskApiError};
use crate::metrics::ServingMetrics;
use crate::models::registry::{score_one, ModelRegistry};
use crate::models::variant::Variant;
use crate::types::prediction::PredictionResponse;
use crate::types::record::FeatureRecord;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Routes records to loaded models
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ModelRegistry>,
    metrics: Arc<ServingMetrics>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ModelRegistry>, metrics: Arc<ServingMetrics>) -> Self {
        Self { registry, metrics }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &ServingMetrics {
        &self.metrics
    }

    /// Score `record` with `variant` and attach the startup accuracy
    pub fn predict(&self, variant: Variant, record: &FeatureRecord) -> Result<PredictionResponse> {
        let start = Instant::now();

        let model = self
            .registry
            .get(variant)
            .ok_or_else(|| RiskApiError::UnknownVariant(variant.route_segment().to_string()))?;
        let prediction = score_one(&model.handle, record)?;

        let latency = start.elapsed();
        self.metrics.record_prediction(variant, prediction, latency);
        debug!(
            model = %variant,
            prediction = prediction,
            latency_us = latency.as_micros() as u64,
            "Prediction served"
        );

        Ok(PredictionResponse {
            model: model.handle.name().to_string(),
            prediction,
            accuracy: format_accuracy(model.accuracy),
        })
    }
}

/// Render an accuracy in [0, 1] as a percentage with two decimals
pub fn format_accuracy(accuracy: f64) -> String {
    format!("{:.2}%", accuracy * 100.0)
}
