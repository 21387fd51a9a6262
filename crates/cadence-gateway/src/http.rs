//! The inbound HTTP surface: a thin axum layer translating requests into
//! [`Orchestrator::fetch`] calls and readiness probes into JSON responses.

use crate::orchestrator::Orchestrator;
use crate::resource::{Envelope, FetchRequest, ResourceKind};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use cadence_core::{Context, GatewayError};
use cadence_maintenance::{ReadinessAggregator, ReadinessStatus};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Header a caller may supply to correlate this request across services; if
/// absent, a fresh id is generated and echoed back under the same header.
const REQUEST_ID_HEADER: &str = "x-request-id";

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub readiness: Arc<ReadinessAggregator>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/v1/content/:id", get(get_content_url))
        .route("/v1/catalog", get(get_catalog))
        .route("/health/ready", get(get_readiness))
        .route("/health/live", get(get_liveness))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct SongQuery {
    #[serde(default)]
    name: String,
    #[serde(default)]
    artist: String,
}

async fn get_content_url(
    Path(id): Path<String>,
    Query(query): Query<SongQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let request = FetchRequest {
        kind: ResourceKind::ContentUrl,
        id: Some(id),
        name: query.name,
        artist: query.artist,
    };
    run_fetch(&state, request, &headers).await
}

async fn get_catalog(
    Query(query): Query<SongQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let request = FetchRequest {
        kind: ResourceKind::Catalog,
        id: None,
        name: query.name,
        artist: query.artist,
    };
    run_fetch(&state, request, &headers).await
}

async fn run_fetch(state: &AppState, request: FetchRequest, headers: &HeaderMap) -> axum::response::Response {
    let id = request_id(headers);
    let ctx = Context::background();
    match state.orchestrator.fetch(&ctx, request).await {
        Ok(result) => {
            let payload: serde_json::Value = serde_json::from_slice(&result.bytes).unwrap_or(json!(null));
            let body = Envelope::success(json!({ "result": payload, "annotation": result.annotation }), id);
            with_request_id_header(StatusCode::OK, body)
        }
        Err(err) => error_response(&err, id),
    }
}

fn error_response(err: &GatewayError, id: String) -> axum::response::Response {
    let (status, code) = err.response_code();
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = Envelope::error(code, err.to_string(), id);
    with_request_id_header(status, body)
}

fn with_request_id_header<T: serde::Serialize>(status: StatusCode, body: Envelope<T>) -> axum::response::Response {
    let id = body.request_id.clone();
    let mut response = (status, Json(body)).into_response();
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

async fn get_readiness(headers: HeaderMap, State(state): State<AppState>) -> axum::response::Response {
    let id = request_id(&headers);
    let ctx = Context::background();
    let report = state.readiness.check(&ctx).await;

    let status = match report.status {
        ReadinessStatus::Healthy => StatusCode::OK,
        ReadinessStatus::Degraded => StatusCode::OK,
        ReadinessStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    let checks: Vec<_> = report
        .checks
        .iter()
        .map(|check| {
            json!({
                "name": check.name,
                "healthy": check.healthy,
                "latency_ms": check.latency.as_millis(),
                "error": check.error,
            })
        })
        .collect();

    let data = json!({ "status": format!("{:?}", report.status).to_lowercase(), "checks": checks });
    let code = if matches!(report.status, ReadinessStatus::Unhealthy) {
        1503
    } else {
        Envelope::<()>::SUCCESS_CODE
    };
    let body = Envelope {
        code,
        message: format!("{:?}", report.status).to_lowercase(),
        data,
        request_id: id,
    };
    with_request_id_header(status, body)
}

async fn get_liveness(headers: HeaderMap) -> axum::response::Response {
    let id = request_id(&headers);
    with_request_id_header(StatusCode::OK, Envelope::success(json!({ "status": "alive" }), id))
}
