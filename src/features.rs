//! Feature schema and extraction for risk model inference.
//!
//! Every model was fitted on the same twelve columns in a fixed order. This
//! module owns that order and the coercion rules applied to inbound values,
//! whether they arrive as JSON request bodies or CSV evaluation rows.

use crate::error::FeatureShapeError;
use crate::types::record::FeatureRecord;
use serde_json::Value;

/// Number of model input features.
pub const FEATURE_COUNT: usize = 12;

/// Model input in training column order.
pub type FeatureVector = [f64; FEATURE_COUNT];

/// Declared numeric type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
}

/// Training column order. Models index features by position in this table.
pub const FEATURE_COLUMNS: [(&str, ColumnKind); FEATURE_COUNT] = [
    ("male", ColumnKind::Integer),
    ("age", ColumnKind::Integer),
    ("currentSmoker", ColumnKind::Integer),
    ("cigsPerDay", ColumnKind::Real),
    ("BPMeds", ColumnKind::Real),
    ("diabetes", ColumnKind::Integer),
    ("totChol", ColumnKind::Real),
    ("sysBP", ColumnKind::Real),
    ("diaBP", ColumnKind::Real),
    ("BMI", ColumnKind::Real),
    ("heartRate", ColumnKind::Real),
    ("glucose", ColumnKind::Real),
];

/// An unparsed field value from one of the supported sources.
#[derive(Debug, Clone, Copy)]
pub enum RawValue<'a> {
    Json(&'a Value),
    Text(&'a str),
}

/// Builds validated [`FeatureRecord`]s and model input vectors.
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Get feature names in training column order.
    pub fn feature_names(&self) -> Vec<&'static str> {
        FEATURE_COLUMNS.iter().map(|(name, _)| *name).collect()
    }

    /// Parse a JSON request body. Key order is irrelevant; unknown keys are ignored.
    pub fn parse_json(&self, body: &Value) -> Result<FeatureRecord, FeatureShapeError> {
        let object = body.as_object().ok_or(FeatureShapeError::NotAnObject)?;
        self.parse_with(|name| object.get(name).map(RawValue::Json))
    }

    /// Parse a record from any field source, validating every column.
    pub fn parse_with<'a, F>(&self, lookup: F) -> Result<FeatureRecord, FeatureShapeError>
    where
        F: Fn(&str) -> Option<RawValue<'a>>,
    {
        let mut vector = [0.0; FEATURE_COUNT];
        for (slot, &(name, kind)) in vector.iter_mut().zip(FEATURE_COLUMNS.iter()) {
            let raw = lookup(name).ok_or(FeatureShapeError::MissingField { field: name })?;
            *slot = coerce(name, kind, raw)?;
        }
        Ok(FeatureRecord::from_vector(&vector))
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Coerce one raw value to its declared numeric type.
fn coerce(field: &'static str, kind: ColumnKind, raw: RawValue<'_>) -> Result<f64, FeatureShapeError> {
    let not_numeric = |value: String| FeatureShapeError::NotNumeric { field, value };

    let value = match raw {
        RawValue::Json(Value::Number(n)) => n.as_f64().ok_or_else(|| not_numeric(n.to_string()))?,
        RawValue::Json(Value::String(s)) => parse_text(s).ok_or_else(|| not_numeric(format!("{:?}", s)))?,
        RawValue::Json(other) => return Err(not_numeric(other.to_string())),
        RawValue::Text(s) => parse_text(s).ok_or_else(|| not_numeric(format!("{:?}", s)))?,
    };

    if !value.is_finite() {
        return Err(not_numeric(value.to_string()));
    }

    if kind == ColumnKind::Integer
        && (value.fract() != 0.0 || value.abs() > f64::from(i32::MAX))
    {
        return Err(FeatureShapeError::NotInteger {
            field,
            value: value.to_string(),
        });
    }

    Ok(value)
}

fn parse_text(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_body() -> Value {
        json!({
            "male": 1, "age": 60, "currentSmoker": 1, "cigsPerDay": 20.0,
            "BPMeds": 0.0, "diabetes": 0, "totChol": 250.0, "sysBP": 150.0,
            "diaBP": 95.0, "BMI": 30.0, "heartRate": 80.0, "glucose": 120.0
        })
    }

    #[test]
    fn test_feature_extraction_order() {
        let extractor = FeatureExtractor::new();
        let record = extractor.parse_json(&sample_body()).unwrap();
        let features = record.to_vector();

        assert_eq!(features.len(), extractor.feature_count());
        assert_eq!(features[0], 1.0); // male
        assert_eq!(features[1], 60.0); // age
        assert_eq!(features[7], 150.0); // sysBP
        assert_eq!(features[11], 120.0); // glucose
    }

    #[test]
    fn test_feature_names() {
        let extractor = FeatureExtractor::new();
        let names = extractor.feature_names();
        assert_eq!(names.len(), 12);
        assert_eq!(names[0], "male");
        assert_eq!(names[9], "BMI");
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let extractor = FeatureExtractor::new();
        let reordered: Value = serde_json::from_str(
            r#"{"glucose": 120, "heartRate": 80, "BMI": 30, "diaBP": 95, "sysBP": 150,
                "totChol": 250, "diabetes": 0, "BPMeds": 0, "cigsPerDay": 20,
                "currentSmoker": 1, "age": 60, "male": 1}"#,
        )
        .unwrap();

        let a = extractor.parse_json(&sample_body()).unwrap().to_vector();
        let b = extractor.parse_json(&reordered).unwrap().to_vector();
        assert_eq!(a, b);
    }

    #[test]
    fn test_each_missing_field_is_named() {
        let extractor = FeatureExtractor::new();
        for (name, _) in FEATURE_COLUMNS {
            let mut body = sample_body();
            body.as_object_mut().unwrap().remove(name);
            let err = extractor.parse_json(&body).unwrap_err();
            assert_eq!(err, FeatureShapeError::MissingField { field: name });
        }
    }

    #[test]
    fn test_lax_coercion() {
        let extractor = FeatureExtractor::new();
        let mut body = sample_body();
        body["age"] = json!("61");
        body["male"] = json!(1.0);
        body["glucose"] = json!(" 99.5 ");

        let record = extractor.parse_json(&body).unwrap();
        assert_eq!(record.age, 61);
        assert_eq!(record.male, 1);
        assert_eq!(record.glucose, 99.5);
    }

    #[test]
    fn test_rejects_bad_values() {
        let extractor = FeatureExtractor::new();

        let mut body = sample_body();
        body["age"] = json!(60.5);
        assert!(matches!(
            extractor.parse_json(&body),
            Err(FeatureShapeError::NotInteger { field: "age", .. })
        ));

        let mut body = sample_body();
        body["BMI"] = json!("heavy");
        assert!(matches!(
            extractor.parse_json(&body),
            Err(FeatureShapeError::NotNumeric { field: "BMI", .. })
        ));

        let mut body = sample_body();
        body["sysBP"] = Value::Null;
        assert!(matches!(
            extractor.parse_json(&body),
            Err(FeatureShapeError::NotNumeric { field: "sysBP", .. })
        ));

        assert_eq!(
            extractor.parse_json(&json!([1, 2, 3])).unwrap_err(),
            FeatureShapeError::NotAnObject
        );
    }

    #[test]
    fn test_text_source_rejects_non_finite() {
        let extractor = FeatureExtractor::new();
        let err = extractor
            .parse_with(|name| Some(RawValue::Text(if name == "totChol" { "nan" } else { "1" })))
            .unwrap_err();
        assert_eq!(err.field(), Some("totChol"));
    }
}
