use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("ground truth has {truth} labels but predictions have {predicted}")]
    LengthMismatch { truth: usize, predicted: usize },

    #[error("threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f32),

    #[error("failed to read evaluation input: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid record on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}
