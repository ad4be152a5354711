//! Error types for the risk prediction service.
//!
//! [`RiskApiError`] is the single error type returned by the library. Startup
//! failures ([`ArtifactLoadError`], [`DatasetShapeError`], configuration) are
//! fatal; per-request failures ([`FeatureShapeError`], unknown variants) are
//! mapped to client errors by the HTTP layer.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RiskApiError>;

/// Main error type for the service.
#[derive(Error, Debug)]
pub enum RiskApiError {
    #[error(transparent)]
    ArtifactLoad(#[from] ArtifactLoadError),

    #[error(transparent)]
    DatasetShape(#[from] DatasetShapeError),

    #[error(transparent)]
    FeatureShape(#[from] FeatureShapeError),

    #[error("Unknown model variant: {0}")]
    UnknownVariant(String),

    #[error("Model {model} produced invalid output {value}")]
    InvalidModelOutput { model: String, value: f64 },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RiskApiError {
    /// Whether the error was caused by the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RiskApiError::FeatureShape(_) | RiskApiError::UnknownVariant(_)
        )
    }

    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RiskApiError::ArtifactLoad(_) => "artifact_load",
            RiskApiError::DatasetShape(_) => "dataset_shape",
            RiskApiError::FeatureShape(_) => "feature_shape",
            RiskApiError::UnknownVariant(_) => "unknown_variant",
            RiskApiError::InvalidModelOutput { .. } => "invalid_model_output",
            RiskApiError::Config(_) => "config",
        }
    }
}

/// A model artifact could not be loaded.
#[derive(Error, Debug)]
pub enum ArtifactLoadError {
    #[error("Failed to read model artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse model artifact {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported artifact format version {found} in {path}")]
    UnsupportedVersion { path: String, found: u32 },

    #[error("Artifact {path} was fitted on columns {found:?}, not the training column order")]
    ColumnMismatch { path: String, found: Vec<String> },

    #[error("Invalid model artifact {path}: {reason}")]
    Invalid { path: String, reason: String },
}

/// The evaluation dataset is malformed.
#[derive(Error, Debug)]
pub enum DatasetShapeError {
    #[error("Failed to read dataset {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("Dataset {path} is missing column `{column}`")]
    MissingColumn { path: String, column: String },

    #[error("Dataset {path} has unexpected column `{column}`")]
    UnexpectedColumn { path: String, column: String },

    #[error("Dataset {path} repeats column `{column}`")]
    DuplicateColumn { path: String, column: String },

    #[error("Feature rows ({features}) and labels ({labels}) differ in length")]
    LengthMismatch { features: usize, labels: usize },

    #[error("Row {row}: {source}")]
    InvalidRow {
        row: usize,
        #[source]
        source: FeatureShapeError,
    },

    #[error("Row {row}: label `{value}` is not 0 or 1")]
    InvalidLabel { row: usize, value: String },

    #[error("Evaluation dataset is empty")]
    Empty,
}

/// A feature record is incomplete or carries a non-numeric value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureShapeError {
    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Malformed request body: {0}")]
    Malformed(String),

    #[error("Missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("Field `{field}` must be numeric, got {value}")]
    NotNumeric { field: &'static str, value: String },

    #[error("Field `{field}` must be an integer, got {value}")]
    NotInteger { field: &'static str, value: String },
}

impl FeatureShapeError {
    /// Name of the offending field, when the error concerns a single field.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            FeatureShapeError::MissingField { field }
            | FeatureShapeError::NotNumeric { field, .. }
            | FeatureShapeError::NotInteger { field, .. } => Some(*field),
            FeatureShapeError::NotAnObject | FeatureShapeError::Malformed(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        let err = RiskApiError::from(FeatureShapeError::MissingField { field: "age" });
        assert!(err.is_client_error());
        assert_eq!(err.kind(), "feature_shape");

        let err = RiskApiError::UnknownVariant("lgb".to_string());
        assert!(err.is_client_error());

        let err = RiskApiError::InvalidModelOutput {
            model: "SVM".to_string(),
            value: 0.3,
        };
        assert!(!err.is_client_error());
        assert_eq!(err.kind(), "invalid_model_output");
    }

    #[test]
    fn test_feature_error_names_field() {
        let err = FeatureShapeError::NotInteger {
            field: "age",
            value: "61.5".to_string(),
        };
        assert_eq!(err.field(), Some("age"));
        assert!(err.to_string().contains("`age`"));
        assert_eq!(FeatureShapeError::NotAnObject.field(), None);
    }
}
