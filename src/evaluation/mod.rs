//! Offline evaluation: verdict accuracy against ground truth and transcript error rates.

pub mod batch;
pub mod error;
pub mod wer;


pub use batch::{
    Comparison, EvaluationMetrics, EvaluationRecord, LabelMetrics, ThresholdEvaluation, compare,
    confusion_matrix, evaluate, evaluate_records, evaluate_with_confidence, read_jsonl,
};
pub use error::EvaluationError;
pub use wer::{
    TranscriptComparison, batch_word_error_rate, char_error_rate, compare_transcripts,
    edit_distance, word_error_rate,
};
