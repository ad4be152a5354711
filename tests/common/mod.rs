//! Common utilities for integration tests.

use hypertension_risk_api::{metrics::ServingMetrics, server, AppConfig, Dispatcher, ModelRegistry};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Directory holding fixture artifacts and datasets.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn fixture(relative: &str) -> String {
    fixtures_dir().join(relative).display().to_string()
}

/// Fixture configuration; `lightgbm` names an artifact for the optional route.
pub fn fixture_config(lightgbm: Option<&str>) -> AppConfig {
    let lightgbm_line = lightgbm
        .map(|name| format!("lightgbm = {:?}\n", fixture(&format!("models/{}", name))))
        .unwrap_or_default();

    let toml = format!(
        r#"
[server]
host = "127.0.0.1"
port = 0

[models]
svm = {svm:?}
random_forest = {rf:?}
logistic = {logistic:?}
decision_tree = {tree:?}
xgboost = {xgb:?}
{lightgbm_line}
[evaluation]
layout = "split"
features_path = {x:?}
labels_path = {y:?}
"#,
        svm = fixture("models/svm.json"),
        rf = fixture("models/random_forest.json"),
        logistic = fixture("models/logistic.json"),
        tree = fixture("models/decision_tree.json"),
        xgb = fixture("models/xgboost.json"),
        lightgbm_line = lightgbm_line,
        x = fixture("datasets/X_test.csv"),
        y = fixture("datasets/y_test.csv"),
    );
    AppConfig::from_toml_str(&toml).expect("fixture config should parse")
}

/// A server bound to an ephemeral port, serving until the test ends.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn start(config: AppConfig) -> Self {
        let registry = ModelRegistry::load(&config).expect("fixture registry should load");
        let dispatcher = Dispatcher::new(Arc::new(registry), Arc::new(ServingMetrics::new()));
        let router = server::build_router(dispatcher, &config.server).expect("router should build");

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(server::serve(listener, router));

        Self {
            addr,
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> (u16, Value) {
        let response = self.client.get(self.url(path)).send().await.expect("GET request");
        let status = response.status().as_u16();
        (status, response.json().await.expect("JSON body"))
    }

    pub async fn put_json(&self, path: &str, body: &Value) -> (u16, Value) {
        let response = self
            .client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("PUT request");
        let status = response.status().as_u16();
        (status, response.json().await.expect("JSON body"))
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> (u16, Value) {
        self.post_raw(path, body.to_string()).await
    }

    pub async fn post_raw(&self, path: &str, body: String) -> (u16, Value) {
        let response = self
            .client
            .post(self.url(path))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("POST request");
        let status = response.status().as_u16();
        (status, response.json().await.expect("JSON body"))
    }
}

/// The patient used for the golden prediction.
pub fn golden_patient() -> Value {
    json!({
        "male": 1, "age": 60, "currentSmoker": 1, "cigsPerDay": 20,
        "BPMeds": 0, "diabetes": 0, "totChol": 250, "sysBP": 150,
        "diaBP": 95, "BMI": 30, "heartRate": 80, "glucose": 120
    })
}
