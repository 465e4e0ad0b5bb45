use std::time::Duration;

use thiserror::Error;

/// How the rate-limited client should treat a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Worth another attempt after backoff.
    Transient,
    /// Retrying cannot help.
    Permanent,
    /// The call went through but the answer was unusable.
    Malformed,
}

/// Every collaborator failure, classified by retryability.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("request timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("transient failure: {reason}")]
    Transient { reason: String },

    #[error("permanent failure: {reason}")]
    Permanent { reason: String },

    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String },
}

impl ProviderError {
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient {
            reason: reason.into(),
        }
    }

    pub fn permanent(reason: impl Into<String>) -> Self {
        Self::Permanent {
            reason: reason.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }

    pub fn class(&self) -> FailureClass {
        match self {
            Self::Timeout { .. } | Self::RateLimited { .. } | Self::Transient { .. } => {
                FailureClass::Transient
            }
            Self::Permanent { .. } => FailureClass::Permanent,
            Self::MalformedResponse { .. } => FailureClass::Malformed,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() != FailureClass::Permanent
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Short machine-readable reason, used as the failure reason of claim terminal states.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::RateLimited { .. } => "rate_limited",
            Self::Transient { .. } => "transient",
            Self::Permanent { .. } => "permanent",
            Self::MalformedResponse { .. } => "malformed_response",
        }
    }

    /// Maps a non-success HTTP status to a classified error.
    pub fn from_status(status: u16, retry_after: Option<Duration>, body: &str) -> Self {
        let body = body.trim();
        let detail = if body.is_empty() {
            format!("status {status}")
        } else {
            format!("status {status}: {}", truncate(body, 200))
        };

        match status {
            429 => Self::RateLimited { retry_after },
            408 => Self::Timeout { elapsed_ms: 0 },
            500..=599 => Self::transient(detail),
            _ => Self::permanent(detail),
        }
    }

    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { elapsed_ms: 0 }
        } else if err.is_decode() {
            Self::malformed(err.to_string())
        } else if err.is_builder() {
            Self::permanent(err.to_string())
        } else {
            Self::transient(err.to_string())
        }
    }
}

/// Parses a `Retry-After` header given in seconds.
pub fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
