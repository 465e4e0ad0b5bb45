use thiserror::Error;

use crate::cancel::CancelReason;
use crate::provider::ProviderError;

use super::types::Capability;

/// Terminal outcome of [`RateLimitedClient::invoke`](super::RateLimitedClient::invoke).
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Every attempt failed with a retryable error.
    #[error("{capability} failed after {attempts} attempts: {last}")]
    Exhausted {
        capability: Capability,
        attempts: u32,
        last: ProviderError,
    },

    #[error("{capability} rejected the call: {error}")]
    Permanent {
        capability: Capability,
        error: ProviderError,
    },

    #[error("{capability} returned a malformed response after {attempts} attempts: {reason}")]
    Malformed {
        capability: Capability,
        attempts: u32,
        reason: String,
    },

    #[error("{capability} call cancelled ({reason})")]
    Cancelled {
        capability: Capability,
        reason: CancelReason,
    },
}

impl ClientError {
    pub fn capability(&self) -> Capability {
        match self {
            Self::Exhausted { capability, .. }
            | Self::Permanent { capability, .. }
            | Self::Malformed { capability, .. }
            | Self::Cancelled { capability, .. } => *capability,
        }
    }

    /// Short machine-readable reason for terminal states and persisted failures.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Exhausted { last, .. } => last.reason_code(),
            Self::Permanent { .. } => "permanent",
            Self::Malformed { .. } => "malformed_response",
            Self::Cancelled { reason, .. } => reason.as_str(),
        }
    }

    pub fn cancel_reason(&self) -> Option<CancelReason> {
        match self {
            Self::Cancelled { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}
