//! Held-out evaluation dataset
//!
//! Loaded once at startup from CSV, either as two parallel files (features and
//! labels, correlated by row) or as one file carrying a label column. A leading
//! unnamed index column, as written by pandas `to_csv`, is dropped when present.

use crate::config::EvaluationConfig;
use crate::error::DatasetShapeError;
use crate::features::{FeatureExtractor, RawValue, FEATURE_COLUMNS};
use crate::types::record::FeatureRecord;
use csv::StringRecord;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Ordered `(features, label)` pairs used to score every model once.
#[derive(Debug, Clone, Default)]
pub struct EvaluationDataset {
    records: Vec<FeatureRecord>,
    labels: Vec<u8>,
}

impl EvaluationDataset {
    /// Pair feature rows with labels by position.
    pub fn new(records: Vec<FeatureRecord>, labels: Vec<u8>) -> Result<Self, DatasetShapeError> {
        if records.len() != labels.len() {
            return Err(DatasetShapeError::LengthMismatch {
                features: records.len(),
                labels: labels.len(),
            });
        }
        Ok(Self { records, labels })
    }

    /// Load the dataset described by configuration.
    pub fn load(config: &EvaluationConfig) -> Result<Self, DatasetShapeError> {
        let dataset = match config {
            EvaluationConfig::Split {
                features_path,
                labels_path,
            } => Self::load_split(features_path, labels_path)?,
            EvaluationConfig::Combined { path, label_column } => Self::load_combined(path, label_column)?,
        };
        info!(rows = dataset.len(), "Evaluation dataset loaded");
        Ok(dataset)
    }

    /// Load parallel feature and label files.
    pub fn load_split<P: AsRef<Path>>(features_path: P, labels_path: P) -> Result<Self, DatasetShapeError> {
        let records = read_feature_rows(features_path.as_ref(), None)?.0;
        let labels = read_label_column(labels_path.as_ref())?;
        Self::new(records, labels)
    }

    /// Load one file holding the features plus `label_column`.
    pub fn load_combined<P: AsRef<Path>>(path: P, label_column: &str) -> Result<Self, DatasetShapeError> {
        let (records, labels) = read_feature_rows(path.as_ref(), Some(label_column))?;
        Self::new(records, labels)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    /// Iterate `(record, label)` pairs in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&FeatureRecord, u8)> + '_ {
        self.records.iter().zip(self.labels.iter().copied())
    }
}

/// A leading unnamed column holds the pandas row index.
fn is_index_column(position: usize, header: &str) -> bool {
    position == 0 && (header.trim().is_empty() || header.starts_with("Unnamed: "))
}

fn open(path: &Path) -> Result<(csv::Reader<std::fs::File>, StringRecord), DatasetShapeError> {
    let csv_error = |source| DatasetShapeError::Csv {
        path: path.display().to_string(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
    let headers = reader.headers().map_err(csv_error)?.clone();
    Ok((reader, headers))
}

/// Read feature rows, and labels too when `label_column` is given.
fn read_feature_rows(
    path: &Path,
    label_column: Option<&str>,
) -> Result<(Vec<FeatureRecord>, Vec<u8>), DatasetShapeError> {
    let display = path.display().to_string();
    let (mut reader, headers) = open(path)?;

    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut label_position = None;
    for (i, header) in headers.iter().enumerate() {
        if is_index_column(i, header) {
            continue;
        }
        let duplicate = if Some(header) == label_column {
            label_position.replace(i).is_some()
        } else if FEATURE_COLUMNS.iter().any(|(name, _)| *name == header) {
            positions.insert(header, i).is_some()
        } else {
            return Err(DatasetShapeError::UnexpectedColumn {
                path: display,
                column: header.to_string(),
            });
        };
        if duplicate {
            return Err(DatasetShapeError::DuplicateColumn {
                path: display,
                column: header.to_string(),
            });
        }
    }

    if let Some((name, _)) = FEATURE_COLUMNS.iter().find(|(name, _)| !positions.contains_key(name)) {
        return Err(DatasetShapeError::MissingColumn {
            path: display,
            column: name.to_string(),
        });
    }
    if let (Some(column), None) = (label_column, label_position) {
        return Err(DatasetShapeError::MissingColumn {
            path: display,
            column: column.to_string(),
        });
    }

    let extractor = FeatureExtractor::new();
    let mut records = Vec::new();
    let mut labels = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row_number = i + 1;
        let row = row.map_err(|source| DatasetShapeError::Csv {
            path: display.clone(),
            source,
        })?;

        let record = extractor
            .parse_with(|name| positions.get(name).and_then(|&p| row.get(p)).map(RawValue::Text))
            .map_err(|source| DatasetShapeError::InvalidRow {
                row: row_number,
                source,
            })?;
        records.push(record);

        if let Some(p) = label_position {
            labels.push(parse_label(row_number, row.get(p).unwrap_or_default())?);
        }
    }

    Ok((records, labels))
}

fn read_label_column(path: &Path) -> Result<Vec<u8>, DatasetShapeError> {
    let display = path.display().to_string();
    let (mut reader, headers) = open(path)?;

    let columns: Vec<(usize, &str)> = headers
        .iter()
        .enumerate()
        .filter(|(i, h)| !is_index_column(*i, h))
        .collect();
    let position = match columns.as_slice() {
        [(position, _)] => *position,
        [] => {
            return Err(DatasetShapeError::MissingColumn {
                path: display,
                column: "label".to_string(),
            })
        }
        [_, (_, extra), ..] => {
            return Err(DatasetShapeError::UnexpectedColumn {
                path: display,
                column: extra.to_string(),
            })
        }
    };

    let mut labels = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row.map_err(|source| DatasetShapeError::Csv {
            path: display.clone(),
            source,
        })?;
        labels.push(parse_label(i + 1, row.get(position).unwrap_or_default())?);
    }
    Ok(labels)
}

/// Accepts `0`/`1` in integer, float or boolean spelling.
fn parse_label(row: usize, raw: &str) -> Result<u8, DatasetShapeError> {
    let value = raw.trim();
    let label = match value.to_ascii_lowercase().as_str() {
        "true" => Some(1),
        "false" => Some(0),
        other => match other.parse::<f64>() {
            Ok(v) if v == 0.0 => Some(0),
            Ok(v) if v == 1.0 => Some(1),
            _ => None,
        },
    };
    label.ok_or_else(|| DatasetShapeError::InvalidLabel {
        row,
        value: value.to_string(),
    })
}
