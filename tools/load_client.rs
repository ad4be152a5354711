//! Prediction Load Client
//!
//! Generates random patient records and posts them to a prediction route.
//!
//! Usage: `risk-load-client [base_url] [variant] [count] [at_risk_rate] [concurrency]`
//!
//! `variant` is a route segment (`rf`) or config key (`random_forest`).

use futures::stream::{self, StreamExt};
use anyhow::anyhow;
use hypertension_risk_api::{FeatureRecord, PredictionResponse, Variant};
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Patient record generator for load testing
struct PatientGenerator {
    rng: rand::rngs::ThreadRng,
}

impl PatientGenerator {
    fn new() -> Self {
        Self { rng: rand::thread_rng() }
    }

    /// Generate a patient with unremarkable vitals
    fn generate_healthy(&mut self) -> FeatureRecord {
        let current_smoker = i32::from(self.rng.gen_bool(0.3));
        FeatureRecord {
            male: i32::from(self.rng.gen_bool(0.5)),
            age: self.rng.gen_range(30..55),
            current_smoker,
            cigs_per_day: if current_smoker == 1 { self.rng.gen_range(1..15) as f64 } else { 0.0 },
            bp_meds: 0.0,
            diabetes: 0,
            tot_chol: self.rng.gen_range(160.0..230.0),
            sys_bp: self.rng.gen_range(100.0..130.0),
            dia_bp: self.rng.gen_range(65.0..85.0),
            bmi: self.rng.gen_range(19.0..26.0),
            heart_rate: self.rng.gen_range(60.0..80.0),
            glucose: self.rng.gen_range(70.0..100.0),
        }
    }

    /// Generate a patient with elevated pressure and risk factors
    fn generate_at_risk(&mut self) -> FeatureRecord {
        let current_smoker = i32::from(self.rng.gen_bool(0.6));
        FeatureRecord {
            male: i32::from(self.rng.gen_bool(0.5)),
            age: self.rng.gen_range(55..75),
            current_smoker,
            cigs_per_day: if current_smoker == 1 { self.rng.gen_range(10..40) as f64 } else { 0.0 },
            bp_meds: if self.rng.gen_bool(0.3) { 1.0 } else { 0.0 },
            diabetes: i32::from(self.rng.gen_bool(0.2)),
            tot_chol: self.rng.gen_range(220.0..320.0),
            sys_bp: self.rng.gen_range(140.0..200.0),
            dia_bp: self.rng.gen_range(90.0..120.0),
            bmi: self.rng.gen_range(27.0..40.0),
            heart_rate: self.rng.gen_range(75.0..100.0),
            glucose: self.rng.gen_range(95.0..200.0),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("risk_load_client=info".parse()?),
        )
        .init();

    info!("Starting Prediction Load Client");

    let args: Vec<String> = std::env::args().collect();
    let base_url = args.get(1).map(|s| s.as_str()).unwrap_or("http://127.0.0.1:7000");
    let variant: Variant = args
        .get(2)
        .map(|s| s.as_str())
        .unwrap_or("svm")
        .parse()
        .map_err(|name| anyhow!("Unknown model variant `{}`", name))?;
    let count: usize = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let at_risk_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.3);
    let concurrency: usize = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(8).max(1);

    let url = format!("{}{}", base_url.trim_end_matches('/'), variant.route_path());
    info!(
        url = %url,
        count = count,
        at_risk_rate = at_risk_rate,
        concurrency = concurrency,
        "Configuration loaded"
    );

    let mut generator = PatientGenerator::new();
    let mut rng = rand::thread_rng();
    let mut at_risk_count = 0;
    let records: Vec<FeatureRecord> = (0..count)
        .map(|_| {
            if rng.gen_bool(at_risk_rate.clamp(0.0, 1.0)) {
                at_risk_count += 1;
                generator.generate_at_risk()
            } else {
                generator.generate_healthy()
            }
        })
        .collect();
    info!(
        "Generated {} records ({} healthy, {} at risk)",
        count,
        count - at_risk_count,
        at_risk_count
    );

    let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
    let start = Instant::now();

    let results: Vec<Result<PredictionResponse, String>> = stream::iter(records)
        .map(|record| {
            let client = client.clone();
            let url = url.clone();
            async move {
                let response = client.post(&url).json(&record).send().await.map_err(|e| e.to_string())?;
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(format!("{}: {}", status, body));
                }
                response.json::<PredictionResponse>().await.map_err(|e| e.to_string())
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let elapsed = start.elapsed();
    let mut positive = 0;
    let mut negative = 0;
    let mut failed = 0;
    let mut model = None;
    for result in results {
        match result {
            Ok(response) => {
                if response.prediction == 1 {
                    positive += 1;
                } else {
                    negative += 1;
                }
                model.get_or_insert((response.model, response.accuracy));
            }
            Err(e) => {
                failed += 1;
                if failed <= 5 {
                    warn!(error = %e, "Request failed");
                }
            }
        }
    }

    if let Some((name, accuracy)) = model {
        info!(model = %name, accuracy = %accuracy, "Model responded");
    }
    info!(
        "Completed {} requests in {:.2}s ({:.1} req/s): {} at risk, {} not at risk, {} failed",
        count,
        elapsed.as_secs_f64(),
        count as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
        positive,
        negative,
        failed
    );

    Ok(())
}
