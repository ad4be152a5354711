//! End-to-end tests of the HTTP surface against fixture artifacts.

mod common;

use common::{fixture_config, golden_patient, TestServer};
use hypertension_risk_api::{
    dataset::EvaluationDataset, features::FEATURE_COLUMNS, models::compute_accuracy, FeatureRecord, ModelRegistry,
    Variant,
};
use serde_json::{json, Map, Value};

#[tokio::test]
async fn test_welcome_message() {
    let server = TestServer::start(fixture_config(None)).await;
    let (status, body) = server.get("/").await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"message": "Welcome to Health Prediction API"}));
}

#[tokio::test]
async fn test_golden_svm_prediction() {
    let server = TestServer::start(fixture_config(None)).await;
    let (status, body) = server.post_json("/predict/svm", &golden_patient()).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"model": "SVM", "prediction": 1, "accuracy": "87.50%"}));
}

#[tokio::test]
async fn test_every_route_answers_with_its_display_name() {
    let server = TestServer::start(fixture_config(None)).await;
    let expected = [
        ("/predict/svm", "SVM", "87.50%"),
        ("/predict/rf", "Random Forest", "75.00%"),
        ("/predict/logistic", "Logistic Regression", "75.00%"),
        ("/predict/tree", "Decision Tree", "75.00%"),
        ("/predict/xgb", "XGBoost", "75.00%"),
    ];
    for (route, name, accuracy) in expected {
        let (status, body) = server.post_json(route, &golden_patient()).await;
        assert_eq!(status, 200, "{}", route);
        assert_eq!(body["model"], name);
        assert_eq!(body["prediction"], 1);
        assert_eq!(body["accuracy"], accuracy);
    }
}

#[tokio::test]
async fn test_key_order_does_not_change_prediction() {
    let server = TestServer::start(fixture_config(None)).await;
    let patient = golden_patient();
    let object = patient.as_object().unwrap();

    let mut reversed = Map::new();
    for (key, value) in object.iter().rev() {
        reversed.insert(key.clone(), value.clone());
    }
    // serde_json without preserve_order sorts keys, so send raw text as well
    let raw_reversed = format!(
        "{{{}}}",
        FEATURE_COLUMNS
            .iter()
            .rev()
            .map(|(name, _)| format!("{:?}: {}", name, object[*name]))
            .collect::<Vec<_>>()
            .join(", ")
    );

    for variant in ["svm", "rf", "logistic", "tree", "xgb"] {
        let route = format!("/predict/{}", variant);
        let (_, baseline) = server.post_json(&route, &patient).await;
        let (_, permuted) = server.post_json(&route, &Value::Object(reversed.clone())).await;
        let (_, raw) = server.post_raw(&route, raw_reversed.clone()).await;
        assert_eq!(baseline, permuted);
        assert_eq!(baseline, raw);
    }
}

#[tokio::test]
async fn test_missing_field_is_rejected_and_named() {
    let server = TestServer::start(fixture_config(None)).await;
    for (name, _) in FEATURE_COLUMNS {
        let mut patient = golden_patient();
        patient.as_object_mut().unwrap().remove(name);

        let (status, body) = server.post_json("/predict/svm", &patient).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"]["kind"], "feature_shape");
        assert_eq!(body["error"]["field"], name);
        assert!(body["request_id"].is_string());
    }
}

#[tokio::test]
async fn test_non_numeric_and_malformed_bodies() {
    let server = TestServer::start(fixture_config(None)).await;

    let mut patient = golden_patient();
    patient["age"] = json!("sixty");
    let (status, body) = server.post_json("/predict/tree", &patient).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["field"], "age");

    let mut patient = golden_patient();
    patient["male"] = json!(0.5);
    let (status, body) = server.post_json("/predict/tree", &patient).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["field"], "male");

    let (status, body) = server.post_raw("/predict/tree", "{\"male\": ".to_string()).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["kind"], "malformed_request");
}

#[tokio::test]
async fn test_numeric_strings_are_coerced() {
    let server = TestServer::start(fixture_config(None)).await;
    let mut patient = golden_patient();
    patient["age"] = json!("60");
    patient["sysBP"] = json!("150.0");
    let (status, body) = server.post_json("/predict/svm", &patient).await;
    assert_eq!(status, 200);
    assert_eq!(body["prediction"], 1);
}

#[tokio::test]
async fn test_disabled_lightgbm_route_is_absent() {
    let server = TestServer::start(fixture_config(None)).await;
    let (status, body) = server.post_json("/predict/lgb", &golden_patient()).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["kind"], "unknown_variant");

    let (status, body) = server.get("/does-not-exist").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["kind"], "not_found");
}

#[tokio::test]
async fn test_enabled_lightgbm_route() {
    let server = TestServer::start(fixture_config(Some("xgboost.json"))).await;
    let (status, body) = server.post_json("/predict/lgb", &golden_patient()).await;
    assert_eq!(status, 200);
    assert_eq!(body["model"], "LightGBM");
    assert_eq!(body["prediction"], 1);
}

#[tokio::test]
async fn test_oversized_body_gets_structured_413() {
    let mut config = fixture_config(None);
    config.server.max_body_bytes = 1024;
    let server = TestServer::start(config).await;

    let mut patient = golden_patient();
    patient["notes"] = json!("x".repeat(8 * 1024));
    let (status, body) = server.post_json("/predict/svm", &patient).await;
    assert_eq!(status, 413);
    assert_eq!(body["error"]["kind"], "payload_too_large");
    assert!(body["request_id"].is_string());

    let (status, _) = server.post_json("/predict/svm", &golden_patient()).await;
    assert_eq!(status, 200);

    let (_, metrics) = server.get("/metrics").await;
    assert_eq!(metrics["rejected_total"], 1);
}

#[tokio::test]
async fn test_wrong_method_gets_structured_405() {
    let server = TestServer::start(fixture_config(None)).await;

    let (status, body) = server.get("/predict/svm").await;
    assert_eq!(status, 405);
    assert_eq!(body["error"]["kind"], "method_not_allowed");
    assert!(body["request_id"].is_string());

    let (status, body) = server.put_json("/health", &golden_patient()).await;
    assert_eq!(status, 405);
    assert_eq!(body["error"]["kind"], "method_not_allowed");

    let (status, body) = server.post_json("/", &golden_patient()).await;
    assert_eq!(status, 405);
    assert_eq!(body["error"]["kind"], "method_not_allowed");
}

#[tokio::test]
async fn test_health_models_and_metrics() {
    let server = TestServer::start(fixture_config(None)).await;

    let (status, health) = server.get("/health").await;
    assert_eq!(status, 200);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["models"].as_array().unwrap().len(), 5);
    assert!(health["loaded_at"].is_string());

    let (_, models) = server.get("/models").await;
    let svm = &models.as_array().unwrap()[0];
    assert_eq!(svm["variant"], "svm");
    assert_eq!(svm["route"], "/predict/svm");
    assert_eq!(svm["output_kind"], "label");
    assert_eq!(svm["accuracy"], "87.50%");

    server.post_json("/predict/svm", &golden_patient()).await;
    server.post_json("/predict/svm", &json!({})).await;

    let (_, metrics) = server.get("/metrics").await;
    assert_eq!(metrics["predictions_total"], 1);
    assert_eq!(metrics["rejected_total"], 1);
    assert_eq!(metrics["variants"]["svm"]["positives"], 1);
}

#[test]
fn test_reported_accuracy_matches_startup_value() {
    let config = fixture_config(None);
    let registry = ModelRegistry::load(&config).unwrap();
    let dataset = EvaluationDataset::load(&config.evaluation).unwrap();

    for (variant, registered) in registry.iter() {
        let recomputed = compute_accuracy(&registered.handle, &dataset).unwrap();
        assert_eq!(recomputed, registered.accuracy, "{}", variant);
    }
    assert!(registry.get(Variant::LightGbm).is_none());
}

#[test]
fn test_golden_record_deserializes_into_typed_record() {
    let record: FeatureRecord = serde_json::from_value(golden_patient()).unwrap();
    assert_eq!(record.age, 60);
    assert_eq!(record.sys_bp, 150.0);
}
