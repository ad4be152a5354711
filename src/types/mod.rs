//! Type definitions for the risk prediction service

pub mod prediction;
pub mod record;

pub use prediction::PredictionResponse;
pub use record::FeatureRecord;
