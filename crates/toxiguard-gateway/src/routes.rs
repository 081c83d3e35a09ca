//! HTTP routes and handlers

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, DefaultBodyLimit, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use toxiguard_core::{Error, PredictionRequest};
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::identity::resolve_identity;
use crate::router::{record_rejection, PredictionResponse};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let max_body_bytes = state.config.max_body_bytes;

    Router::new()
        .route("/", get(home))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/predict", post(predict))
        .route("/predict/batch", post(predict_batch))
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn home() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Toxiguard classification gateway is running. POST /predict or /predict/batch."
    }))
}

#[derive(Debug, Serialize, Deserialize)]
struct HealthResponse {
    status: String,
    model_loaded: bool,
    labels: Vec<String>,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let engine = state.router.engine();
    Json(HealthResponse {
        status: if engine.is_loaded() { "ok" } else { "degraded" }.to_string(),
        model_loaded: engine.is_loaded(),
        labels: engine.labels().to_vec(),
    })
}

async fn metrics(State(state): State<AppState>) -> String {
    state
        .metrics_handle
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

/// Single prediction request body
#[derive(Debug, Deserialize)]
struct SinglePredictRequest {
    #[serde(default)]
    text: String,
}

/// Batch prediction request body
#[derive(Debug, Deserialize)]
struct BatchPredictRequest {
    texts: Vec<String>,
}

async fn predict(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<SinglePredictRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, AppError> {
    metrics::counter!("toxiguard_requests_total", "endpoint" => "predict").increment(1);
    let request = payload.map(|Json(req)| PredictionRequest::single(req.text));
    dispatch(&state, peer, &headers, request).await
}

async fn predict_batch(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<BatchPredictRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, AppError> {
    metrics::counter!("toxiguard_requests_total", "endpoint" => "predict_batch").increment(1);
    let request = payload.map(|Json(req)| {
        debug!("Received batch of {} texts", req.texts.len());
        PredictionRequest::Batch { texts: req.texts }
    });
    dispatch(&state, peer, &headers, request).await
}

async fn dispatch(
    state: &AppState,
    peer: SocketAddr,
    headers: &HeaderMap,
    request: Result<PredictionRequest, JsonRejection>,
) -> Result<Json<PredictionResponse>, AppError> {
    let api_key = headers
        .get(&state.api_key_header)
        .and_then(|v| v.to_str().ok());
    let identity = resolve_identity(
        state.config.rate_limit.identity_source,
        headers,
        peer,
        api_key,
    );

    let request = match request {
        Ok(request) => request,
        // Oversize bodies are cut off by the transport before any key check
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            record_rejection("payload_too_large");
            return Err(rejection.into());
        }
        Err(rejection) => {
            if let Err(e) = state.router.authorize(api_key, &identity) {
                record_rejection(e.kind());
                return Err(e.into());
            }
            record_rejection("invalid_input");
            return Err(rejection.into());
        }
    };

    let response = state.router.handle(api_key, &identity, request).await?;
    Ok(Json(response))
}

async fn fallback() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

/// Error handling
#[derive(Debug)]
pub enum AppError {
    Gateway(Error),
    Payload(JsonRejection),
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError::Gateway(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Payload(rejection)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message, retry_after) = match self {
            AppError::Payload(rejection) => {
                let status = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    StatusCode::PAYLOAD_TOO_LARGE
                } else {
                    StatusCode::UNPROCESSABLE_ENTITY
                };
                (status, "invalid_input", rejection.body_text(), None)
            }
            AppError::Gateway(err) => {
                let status = match &err {
                    Error::Unauthorized => StatusCode::UNAUTHORIZED,
                    Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                    Error::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    Error::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    Error::Timeout => StatusCode::GATEWAY_TIMEOUT,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    error!("Request failed: {}", err);
                }
                let retry_after = match &err {
                    Error::RateLimited { retry_after } => {
                        Some(retry_after.as_secs_f64().ceil().max(1.0) as u64)
                    }
                    _ => None,
                };
                (status, err.kind(), err.to_string(), retry_after)
            }
        };

        let body = json!({
            "error": {
                "message": message,
                "type": kind,
            }
        });

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
