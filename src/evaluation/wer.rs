//! Transcript quality: word and character error rates, as percentages capped at 100.

use serde::{Deserialize, Serialize};

use super::error::EvaluationError;

/// Levenshtein distance over arbitrary tokens.
pub fn edit_distance<T: PartialEq>(reference: &[T], hypothesis: &[T]) -> usize {
    let mut prev: Vec<usize> = (0..=hypothesis.len()).collect();
    let mut curr = vec![0; hypothesis.len() + 1];

    for (i, r) in reference.iter().enumerate() {
        curr[0] = i + 1;
        for (j, h) in hypothesis.iter().enumerate() {
            curr[j + 1] = if r == h {
                prev[j]
            } else {
                1 + prev[j].min(prev[j + 1]).min(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[hypothesis.len()]
}

fn error_rate(distance: usize, reference_len: usize, hypothesis_len: usize) -> f64 {
    if reference_len == 0 {
        return if hypothesis_len == 0 { 0.0 } else { 100.0 };
    }
    (distance as f64 / reference_len as f64 * 100.0).min(100.0)
}

pub fn word_error_rate(reference: &str, hypothesis: &str) -> f64 {
    let r: Vec<&str> = reference.split_whitespace().collect();
    let h: Vec<&str> = hypothesis.split_whitespace().collect();
    error_rate(edit_distance(&r, &h), r.len(), h.len())
}

pub fn char_error_rate(reference: &str, hypothesis: &str) -> f64 {
    let r: Vec<char> = reference.chars().collect();
    let h: Vec<char> = hypothesis.chars().collect();
    error_rate(edit_distance(&r, &h), r.len(), h.len())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptComparison {
    pub wer: f64,
    pub cer: f64,
    pub reference_words: usize,
    pub hypothesis_words: usize,
}

pub fn compare_transcripts(reference: &str, hypothesis: &str) -> TranscriptComparison {
    TranscriptComparison {
        wer: word_error_rate(reference, hypothesis),
        cer: char_error_rate(reference, hypothesis),
        reference_words: reference.split_whitespace().count(),
        hypothesis_words: hypothesis.split_whitespace().count(),
    }
}

/// Mean WER over pairs, plus each pair's WER.
pub fn batch_word_error_rate(
    references: &[&str],
    hypotheses: &[&str],
) -> Result<(f64, Vec<f64>), EvaluationError> {
    if references.len() != hypotheses.len() {
        return Err(EvaluationError::LengthMismatch {
            truth: references.len(),
            predicted: hypotheses.len(),
        });
    }

    let rates: Vec<f64> = references
        .iter()
        .zip(hypotheses)
        .map(|(r, h)| word_error_rate(r, h))
        .collect();
    let mean = if rates.is_empty() {
        0.0
    } else {
        rates.iter().sum::<f64>() / rates.len() as f64
    };
    Ok((mean, rates))
}
