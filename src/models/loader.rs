//! JSON model artifact loader

use crate::config::ModelsConfig;
use crate::error::ArtifactLoadError;
use crate::features::FEATURE_COLUMNS;
use crate::models::artifact::{ModelArtifact, ARTIFACT_FORMAT_VERSION};
use crate::models::registry::ModelHandle;
use crate::models::variant::Variant;
use std::fs;
use std::path::Path;
use tracing::info;

/// Loader for serialized model artifacts
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelLoader;

impl ModelLoader {
    pub fn new() -> Self {
        Self
    }

    /// Read, parse and validate one artifact file
    pub fn load_artifact<P: AsRef<Path>>(&self, path: P) -> Result<ModelArtifact, ArtifactLoadError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let bytes = fs::read(path).map_err(|source| ArtifactLoadError::Io {
            path: display.clone(),
            source,
        })?;
        let artifact: ModelArtifact = serde_json::from_slice(&bytes).map_err(|source| ArtifactLoadError::Parse {
            path: display.clone(),
            source,
        })?;

        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactLoadError::UnsupportedVersion {
                path: display,
                found: artifact.format_version,
            });
        }

        if let Some(names) = &artifact.feature_names {
            let expected = FEATURE_COLUMNS.iter().map(|(name, _)| *name);
            if !names.iter().map(String::as_str).eq(expected) {
                return Err(ArtifactLoadError::ColumnMismatch {
                    path: display,
                    found: names.clone(),
                });
            }
        }

        artifact
            .validate()
            .map_err(|reason| ArtifactLoadError::Invalid { path: display, reason })?;

        Ok(artifact)
    }

    /// Load one artifact as the handle for `variant`
    pub fn load_model<P: AsRef<Path>>(&self, path: P, variant: Variant) -> Result<ModelHandle, ArtifactLoadError> {
        let path = path.as_ref();
        info!(model = %variant, path = %path.display(), "Loading model artifact");

        let artifact = self.load_artifact(path)?;
        let handle = ModelHandle::new(variant, artifact);

        info!(
            model = %variant,
            family = handle.family(),
            output_kind = ?handle.output_kind(),
            scaled = handle.has_scaler(),
            "Model loaded successfully"
        );
        Ok(handle)
    }

    /// Load every configured variant; any failure aborts the whole load
    pub fn load_all(&self, models: &ModelsConfig) -> Result<Vec<ModelHandle>, ArtifactLoadError> {
        let mut handles = Vec::new();
        for variant in Variant::ALL {
            match models.path_for(variant) {
                Some(path) => handles.push(self.load_model(path, variant)?),
                None => info!(model = %variant, "Model not configured, route disabled"),
            }
        }

        info!(count = handles.len(), "Loaded {} models", handles.len());
        Ok(handles)
    }
}
