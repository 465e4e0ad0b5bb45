//! HTTP gateway (Axum) for submitting videos and reading stored results.
//!
//! Routes:
//! - `GET /healthz`, `GET /readyz`
//! - `POST /v1/videos/verify`: JSON transcript in, [`VideoReport`](crate::report::VideoReport) out
//! - `POST /v1/videos/{video_id}/audio`: raw audio body, transcribed first
//! - `GET /v1/videos/{video_id}/claims`: persisted claims, evidence and verifications

pub mod error;
pub mod handler;
pub mod payload;
pub mod state;


use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode, header::HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use error::{ErrorResponse, GatewayError};
pub use handler::{verify_audio_handler, verify_transcript_handler, video_claims_handler};
pub use payload::{StoredClaim, VerifyTranscriptRequest, VideoClaimsResponse};
pub use state::AppState;

use crate::constants::{
    CLAIMFLOW_STATUS_ERROR, CLAIMFLOW_STATUS_HEADER, CLAIMFLOW_STATUS_HEALTHY,
    CLAIMFLOW_STATUS_NOT_READY, CLAIMFLOW_STATUS_READY,
};

const STATUS_DISABLED: &str = "disabled";

pub fn create_router(state: AppState) -> Router {
    let audio_limit = state.max_audio_bytes;
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/readyz", get(ready_handler))
        .route("/v1/videos/verify", post(verify_transcript_handler))
        .route(
            "/v1/videos/{video_id}/audio",
            post(verify_audio_handler).layer(DefaultBodyLimit::max(audio_limit)),
        )
        .route("/v1/videos/{video_id}/claims", get(video_claims_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct ReadyResponse {
    pub status: String,
    pub components: ComponentStatus,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct ComponentStatus {
    pub http: String,
    pub storage: String,
    /// `disabled` when no speech service is configured.
    pub speech: String,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        CLAIMFLOW_STATUS_HEADER,
        HeaderValue::from_static(CLAIMFLOW_STATUS_HEALTHY),
    );

    (
        StatusCode::OK,
        headers,
        Json(HealthResponse {
            status: "ok".to_string(),
        }),
    )
        .into_response()
}

#[tracing::instrument(skip(state))]
pub async fn ready_handler(State(state): State<AppState>) -> Response {
    let storage = match state.orchestrator.store().video("").await {
        Ok(_) => CLAIMFLOW_STATUS_READY,
        Err(e) => {
            tracing::warn!(error = %e, "Storage probe failed");
            CLAIMFLOW_STATUS_ERROR
        }
    };

    let speech = match state.orchestrator.speech() {
        None => STATUS_DISABLED,
        Some(speech) => match speech.health().await {
            Ok(()) => CLAIMFLOW_STATUS_READY,
            Err(e) => {
                tracing::warn!(error = %e, "Speech service unhealthy");
                CLAIMFLOW_STATUS_ERROR
            }
        },
    };

    let is_ready = storage == CLAIMFLOW_STATUS_READY && speech != CLAIMFLOW_STATUS_ERROR;
    let (status_code, status_msg) = if is_ready {
        (StatusCode::OK, CLAIMFLOW_STATUS_READY)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, CLAIMFLOW_STATUS_NOT_READY)
    };

    let mut headers = HeaderMap::new();
    headers.insert(CLAIMFLOW_STATUS_HEADER, HeaderValue::from_static(status_msg));

    (
        status_code,
        headers,
        Json(ReadyResponse {
            status: status_msg.to_string(),
            components: ComponentStatus {
                http: CLAIMFLOW_STATUS_READY.to_string(),
                storage: storage.to_string(),
                speech: speech.to_string(),
            },
        }),
    )
        .into_response()
}
