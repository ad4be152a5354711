//! Hypertension Risk Prediction API - Main Entry Point
//!
//! Loads every configured model, scores it once against the evaluation
//! dataset, then serves predictions over HTTP.

use anyhow::{Context, Result};
use hypertension_risk_api::{
    config::{AppConfig, LogFormat, LoggingConfig, DEFAULT_CONFIG_PATH},
    dispatcher::format_accuracy,
    features::FeatureExtractor,
    metrics::{MetricsReporter, ServingMetrics},
    server, Dispatcher, ModelRegistry,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config_path_from_args(std::env::args().skip(1));
    let config = match &config_path {
        Some(path) => AppConfig::load_from_path(path),
        None => AppConfig::load(),
    };
    let config_path = config_path.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = config.with_context(|| format!("Failed to load configuration from {}", config_path))?;

    init_logging(&config.logging)?;
    info!(path = %config_path, "Starting Hypertension Risk Prediction API");

    let extractor = FeatureExtractor::new();
    info!(
        features = extractor.feature_count(),
        columns = ?extractor.feature_names(),
        "Feature extractor initialized"
    );

    let registry = ModelRegistry::load(&config).context("Failed to initialize model registry")?;
    for (variant, registered) in registry.iter() {
        info!(
            model = %variant,
            name = registered.handle.name(),
            route = %variant.route_path(),
            accuracy = %format_accuracy(registered.accuracy),
            "Model ready"
        );
    }
    info!(count = registry.model_count(), "Model registry loaded");

    let metrics = Arc::new(ServingMetrics::new());
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let dispatcher = Dispatcher::new(Arc::new(registry), metrics.clone());
    let router = server::build_router(dispatcher, &config.server)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    server::serve(listener, router).await?;

    info!("Prediction API shutting down...");
    metrics.print_summary();

    Ok(())
}

/// Accepts `--config <path>`, `--config=<path>` or a bare path; `None` means the default file
fn config_path_from_args<I: Iterator<Item = String>>(mut args: I) -> Option<String> {
    match args.next() {
        Some(flag) if flag == "--config" => args.next(),
        Some(arg) => Some(
            arg.strip_prefix("--config=")
                .map(str::to_string)
                .unwrap_or(arg),
        ),
        None => None,
    }
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!("hypertension_risk_api={}", logging.level))
            .context("Invalid logging.level")?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
    Ok(())
}
