//! HTTP surface of the prediction service
//!
//! One `POST /predict/{segment}` route is registered per loaded model, so a
//! disabled variant has no route at all. Bodies are read as raw bytes and
//! validated by [`FeatureExtractor`] so that every shape problem produces the
//! same structured 400 response. Oversized bodies, unsupported methods and
//! unknown paths are rendered through [`ApiError`] as well.

use crate::config::ServerConfig;
use crate::dispatcher::{format_accuracy, Dispatcher};
use crate::error::{FeatureShapeError, Result, RiskApiError};
use crate::features::FeatureExtractor;
use crate::metrics::MetricsSnapshot;
use crate::models::scorer::OutputKind;
use crate::models::variant::Variant;
use crate::types::prediction::PredictionResponse;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Greeting returned by `GET /`
pub const WELCOME_MESSAGE: &str = "Welcome to Health Prediction API";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    dispatcher: Dispatcher,
}

/// Build the router for every model in the dispatcher's registry
pub fn build_router(dispatcher: Dispatcher, config: &ServerConfig) -> Result<Router> {
    let cors = cors_layer(&config.allowed_origins)?;
    let variants = dispatcher.registry().variants();

    let mut router = Router::new()
        .route("/", get(welcome).fallback(method_not_allowed))
        .route("/health", get(health).fallback(method_not_allowed))
        .route("/models", get(list_models).fallback(method_not_allowed))
        .route("/metrics", get(metrics).fallback(method_not_allowed));

    for variant in variants {
        router = router.route(
            &variant.route_path(),
            post(
                move |State(state): State<AppState>, body: std::result::Result<Bytes, BytesRejection>| async move {
                    predict(state, variant, body)
                },
            )
            .fallback(method_not_allowed),
        );
    }

    Ok(router
        .fallback(not_found)
        .with_state(AppState { dispatcher })
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors))
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if origins.iter().any(|origin| origin == "*") {
        return Ok(cors.allow_origin(Any));
    }

    let origins = origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|_| RiskApiError::Config(format!("invalid CORS origin `{}`", origin)))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(cors.allow_origin(AllowOrigin::list(origins)))
}

/// Serve until Ctrl-C
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "Prediction API listening");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

fn predict(
    state: AppState,
    variant: Variant,
    body: std::result::Result<Bytes, BytesRejection>,
) -> std::result::Result<Json<PredictionResponse>, ApiError> {
    let dispatcher = &state.dispatcher;
    let outcome = match body {
        Ok(body) => parse_body(&body)
            .and_then(|record| dispatcher.predict(variant, &record))
            .map_err(ApiError::from),
        Err(rejection) => Err(ApiError::from(rejection)),
    };

    outcome.map(Json).map_err(|api_error| {
        dispatcher.metrics().record_rejection(api_error.kind);
        api_error
    })
}

fn parse_body(body: &[u8]) -> Result<crate::types::record::FeatureRecord> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| FeatureShapeError::Malformed(e.to_string()))?;
    Ok(FeatureExtractor::new().parse_json(&value)?)
}

async fn welcome() -> Json<Value> {
    Json(json!({ "message": WELCOME_MESSAGE }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    models: Vec<&'static str>,
    loaded_at: DateTime<Utc>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let registry = state.dispatcher.registry();
    Json(HealthResponse {
        status: "ok",
        models: registry.iter().map(|(_, m)| m.handle.name()).collect(),
        loaded_at: registry.loaded_at(),
    })
}

#[derive(Serialize)]
struct ModelInfo {
    variant: Variant,
    model: &'static str,
    route: String,
    output_kind: OutputKind,
    accuracy: String,
}

async fn list_models(State(state): State<AppState>) -> Json<Vec<ModelInfo>> {
    let models = state
        .dispatcher
        .registry()
        .iter()
        .map(|(variant, registered)| ModelInfo {
            variant,
            model: registered.handle.name(),
            route: variant.route_path(),
            output_kind: registered.handle.output_kind(),
            accuracy: format_accuracy(registered.accuracy),
        })
        .collect();
    Json(models)
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.dispatcher.metrics().snapshot())
}

async fn not_found(State(state): State<AppState>, uri: Uri) -> ApiError {
    let path = uri.path();
    let api_error = match path.strip_prefix("/predict/") {
        Some(segment) => ApiError::from(RiskApiError::UnknownVariant(segment.to_string())),
        None => ApiError::new(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("No route for {}", path),
            None,
        ),
    };
    state.dispatcher.metrics().record_rejection(api_error.kind);
    api_error
}

async fn method_not_allowed(State(state): State<AppState>, method: Method, uri: Uri) -> ApiError {
    let api_error = ApiError::new(
        StatusCode::METHOD_NOT_ALLOWED,
        "method_not_allowed",
        format!("{} is not supported on {}", method, uri.path()),
        None,
    );
    warn!(request_id = %api_error.request_id, method = %method, path = uri.path(), "Method not allowed");
    state.dispatcher.metrics().record_rejection(api_error.kind);
    api_error
}

/// Error rendered as `{"error": {...}, "request_id": ...}`
#[derive(Debug)]
pub struct ApiError {
    request_id: Uuid,
    status: StatusCode,
    kind: &'static str,
    message: String,
    field: Option<&'static str>,
}

impl ApiError {
    fn new(status: StatusCode, kind: &'static str, message: String, field: Option<&'static str>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            status,
            kind,
            message,
            field,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl From<RiskApiError> for ApiError {
    fn from(err: RiskApiError) -> Self {
        if !err.is_client_error() {
            let api_error = ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                "Internal server error".to_string(),
                None,
            );
            error!(request_id = %api_error.request_id, error = %err, "Prediction failed");
            return api_error;
        }

        let api_error = match &err {
            RiskApiError::FeatureShape(shape @ (FeatureShapeError::Malformed(_) | FeatureShapeError::NotAnObject)) => {
                ApiError::new(StatusCode::BAD_REQUEST, "malformed_request", shape.to_string(), None)
            }
            RiskApiError::FeatureShape(shape) => {
                ApiError::new(StatusCode::BAD_REQUEST, err.kind(), shape.to_string(), shape.field())
            }
            _ => ApiError::new(StatusCode::NOT_FOUND, err.kind(), err.to_string(), None),
        };
        warn!(request_id = %api_error.request_id, kind = api_error.kind, error = %err, "Request rejected");
        api_error
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        let status = rejection.status();
        let kind = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "payload_too_large"
        } else {
            "malformed_request"
        };
        let api_error = ApiError::new(status, kind, rejection.body_text(), None);
        warn!(request_id = %api_error.request_id, kind = kind, status = %status, "Request body rejected");
        api_error
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut detail = json!({
            "kind": self.kind,
            "message": self.message,
        });
        if let Some(field) = self.field {
            detail["field"] = json!(field);
        }
        let body = json!({
            "error": detail,
            "request_id": self.request_id.to_string(),
        });
        (self.status, Json(body)).into_response()
    }
}
