use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::constants::CLAIMFLOW_STATUS_HEADER;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("video not found: {0}")]
    VideoNotFound(String),

    #[error("audio input is disabled: no speech-to-text service configured")]
    SpeechUnavailable,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl GatewayError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            Self::VideoNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::SpeechUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "speech_unavailable"),
            Self::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, claimflow_status) = self.status();

        let mut headers = HeaderMap::new();
        headers.insert(
            CLAIMFLOW_STATUS_HEADER,
            HeaderValue::from_static(claimflow_status),
        );

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, headers, body).into_response()
    }
}
