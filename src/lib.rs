//! Hypertension Risk Prediction Service
//!
//! Serves binary risk predictions from a fixed set of pre-trained classifiers
//! over HTTP. Every model is loaded and scored against a held-out evaluation
//! dataset once at startup; requests are then answered from immutable state.

pub mod config;
pub mod dataset;
pub mod dispatcher;
pub mod error;
pub mod features;
pub mod metrics;
pub mod models;
pub mod server;
pub mod types;

pub use config::AppConfig;
pub use dataset::EvaluationDataset;
pub use dispatcher::Dispatcher;
pub use error::{Result, RiskApiError};
pub use models::registry::{ModelHandle, ModelRegistry};
pub use models::variant::Variant;
pub use types::{prediction::PredictionResponse, record::FeatureRecord};
