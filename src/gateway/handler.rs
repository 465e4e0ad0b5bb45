use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, info, instrument};

use crate::constants::{
    CLAIMFLOW_STATUS_COMPLETED, CLAIMFLOW_STATUS_FAILED, CLAIMFLOW_STATUS_HEADER,
};
use crate::model::Video;
use crate::report::VideoReport;

use super::error::GatewayError;
use super::payload::{StoredClaim, VerifyTranscriptRequest, VideoClaimsResponse};
use super::state::AppState;

fn validate_video_id(video_id: &str) -> Result<(), GatewayError> {
    if video_id.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(
            "video_id must not be empty".to_string(),
        ));
    }
    if video_id.len() > 128 || video_id.chars().any(|c| c.is_control() || c == '/') {
        return Err(GatewayError::InvalidRequest(format!(
            "invalid video_id '{}'",
            video_id.escape_debug()
        )));
    }
    Ok(())
}

/// The report as JSON, with the video status mirrored in the status header.
pub fn report_response(report: VideoReport) -> Response {
    let status = if report.status.is_completed() {
        CLAIMFLOW_STATUS_COMPLETED
    } else {
        CLAIMFLOW_STATUS_FAILED
    };

    let mut headers = HeaderMap::new();
    headers.insert(CLAIMFLOW_STATUS_HEADER, HeaderValue::from_static(status));

    (StatusCode::OK, headers, Json(report)).into_response()
}

#[instrument(skip(state, request), fields(video_id = tracing::field::Empty))]
pub async fn verify_transcript_handler(
    State(state): State<AppState>,
    Json(request): Json<serde_json::Value>,
) -> Result<Response, GatewayError> {
    let request: VerifyTranscriptRequest = serde_json::from_value(request)
        .map_err(|e| GatewayError::InvalidRequest(format!("Invalid request schema: {}", e)))?;
    tracing::Span::current().record("video_id", tracing::field::display(&request.video_id));

    validate_video_id(&request.video_id)?;
    if request.transcript.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(
            "transcript must not be empty".to_string(),
        ));
    }

    let video: Video = request.into_video();
    debug!(transcript_chars = video.transcript.len(), "Processing transcript");

    let cancel = state.shutdown.child();
    let report = state.orchestrator.process_transcript(video, &cancel).await;

    info!(summary = %report.digest(), "Transcript processed");
    Ok(report_response(report))
}

#[instrument(skip(state, audio), fields(audio_bytes = audio.len()))]
pub async fn verify_audio_handler(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    audio: Bytes,
) -> Result<Response, GatewayError> {
    validate_video_id(&video_id)?;
    if audio.is_empty() {
        return Err(GatewayError::InvalidRequest(
            "audio body must not be empty".to_string(),
        ));
    }
    if state.orchestrator.speech().is_none() {
        return Err(GatewayError::SpeechUnavailable);
    }

    let cancel = state.shutdown.child();
    let report = state
        .orchestrator
        .process_audio(&video_id, &audio, &cancel)
        .await;

    info!(summary = %report.digest(), "Audio processed");
    Ok(report_response(report))
}

#[instrument(skip(state))]
pub async fn video_claims_handler(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<Json<VideoClaimsResponse>, GatewayError> {
    validate_video_id(&video_id)?;
    let store = state.orchestrator.store();

    let stored = store
        .video(&video_id)
        .await?
        .ok_or_else(|| GatewayError::VideoNotFound(video_id.clone()))?;

    let mut claims = Vec::new();
    for claim in store.claims_by_video(&video_id).await? {
        let evidence = store.evidence_by_claim(&claim.id).await?;
        let verifications = store.verifications_by_claim(&claim.id).await?;
        claims.push(StoredClaim {
            claim,
            evidence,
            verifications,
        });
    }

    Ok(Json(VideoClaimsResponse {
        video: stored.video,
        status: stored.status,
        updated_at: stored.updated_at,
        claims,
    }))
}
