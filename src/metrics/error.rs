use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metrics transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("metrics sink rejected write with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("metrics sink unavailable: {reason}")]
    Unavailable { reason: String },
}
