use std::collections::{BTreeMap, BTreeSet};
use std::io::BufRead;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::model::VerdictLabel;

use super::error::EvaluationError;

/// One labelled prediction, as read from a JSON-lines file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    #[serde(default)]
    pub claim: Option<String>,
    #[serde(deserialize_with = "lenient_label")]
    pub ground_truth: VerdictLabel,
    #[serde(deserialize_with = "lenient_label")]
    pub label: VerdictLabel,
    #[serde(default)]
    pub confidence: f32,
}

fn lenient_label<'de, D: Deserializer<'de>>(deserializer: D) -> Result<VerdictLabel, D::Error> {
    let raw = String::deserialize(deserializer)?;
    VerdictLabel::parse(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unknown verdict label '{raw}'")))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// Ground-truth occurrences of the label.
    pub support: usize,
}

/// Macro-averaged classification metrics over the labels that occur in either input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub precision: f64,
    pub recall: f64,
    /// Harmonic mean of the macro precision and macro recall.
    pub f1_score: f64,
    pub accuracy: f64,
    /// `confusion[truth][predicted]`.
    pub confusion: BTreeMap<VerdictLabel, BTreeMap<VerdictLabel, usize>>,
    pub per_label: BTreeMap<VerdictLabel, LabelMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEvaluation {
    pub threshold: f32,
    pub total: usize,
    pub kept: usize,
    /// Share of records at or above the threshold.
    pub coverage: f64,
    pub metrics: EvaluationMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub baseline: EvaluationMetrics,
    pub system: EvaluationMetrics,
    pub precision_delta: f64,
    pub recall_delta: f64,
    pub f1_delta: f64,
    pub accuracy_delta: f64,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn harmonic(p: f64, r: f64) -> f64 {
    if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 }
}

pub fn confusion_matrix(
    truth: &[VerdictLabel],
    predicted: &[VerdictLabel],
) -> BTreeMap<VerdictLabel, BTreeMap<VerdictLabel, usize>> {
    let labels: BTreeSet<VerdictLabel> = truth.iter().chain(predicted).copied().collect();
    let mut matrix: BTreeMap<_, BTreeMap<_, usize>> = labels
        .iter()
        .map(|&t| (t, labels.iter().map(|&p| (p, 0)).collect()))
        .collect();

    for (t, p) in truth.iter().zip(predicted) {
        if let Some(count) = matrix.get_mut(t).and_then(|row| row.get_mut(p)) {
            *count += 1;
        }
    }
    matrix
}

pub fn evaluate(
    truth: &[VerdictLabel],
    predicted: &[VerdictLabel],
) -> Result<EvaluationMetrics, EvaluationError> {
    if truth.len() != predicted.len() {
        return Err(EvaluationError::LengthMismatch {
            truth: truth.len(),
            predicted: predicted.len(),
        });
    }

    let confusion = confusion_matrix(truth, predicted);
    if confusion.is_empty() {
        return Ok(EvaluationMetrics::default());
    }

    let cell = |t: VerdictLabel, p: VerdictLabel| {
        confusion
            .get(&t)
            .and_then(|row| row.get(&p))
            .copied()
            .unwrap_or(0)
    };

    let mut per_label = BTreeMap::new();
    let mut correct = 0;
    for &label in confusion.keys() {
        let tp = cell(label, label);
        let fp: usize = confusion.keys().filter(|&&o| o != label).map(|&o| cell(o, label)).sum();
        let fn_: usize = confusion.keys().filter(|&&o| o != label).map(|&o| cell(label, o)).sum();
        correct += tp;

        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        per_label.insert(
            label,
            LabelMetrics {
                precision,
                recall,
                f1_score: harmonic(precision, recall),
                support: tp + fn_,
            },
        );
    }

    let n = per_label.len() as f64;
    let precision = per_label.values().map(|m| m.precision).sum::<f64>() / n;
    let recall = per_label.values().map(|m| m.recall).sum::<f64>() / n;

    Ok(EvaluationMetrics {
        precision,
        recall,
        f1_score: harmonic(precision, recall),
        accuracy: ratio(correct, truth.len()),
        confusion,
        per_label,
    })
}

pub fn evaluate_records(records: &[EvaluationRecord]) -> EvaluationMetrics {
    let truth: Vec<_> = records.iter().map(|r| r.ground_truth).collect();
    let predicted: Vec<_> = records.iter().map(|r| r.label).collect();
    // Lengths match by construction.
    evaluate(&truth, &predicted).unwrap_or_default()
}

/// Metrics over the records whose confidence reaches `threshold`, with the share kept.
pub fn evaluate_with_confidence(
    records: &[EvaluationRecord],
    threshold: f32,
) -> Result<ThresholdEvaluation, EvaluationError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(EvaluationError::InvalidThreshold(threshold));
    }

    let kept: Vec<_> = records
        .iter()
        .filter(|r| r.confidence >= threshold)
        .cloned()
        .collect();

    Ok(ThresholdEvaluation {
        threshold,
        total: records.len(),
        kept: kept.len(),
        coverage: ratio(kept.len(), records.len()),
        metrics: evaluate_records(&kept),
    })
}

pub fn compare(baseline: &[EvaluationRecord], system: &[EvaluationRecord]) -> Comparison {
    let baseline = evaluate_records(baseline);
    let system = evaluate_records(system);
    Comparison {
        precision_delta: system.precision - baseline.precision,
        recall_delta: system.recall - baseline.recall,
        f1_delta: system.f1_score - baseline.f1_score,
        accuracy_delta: system.accuracy - baseline.accuracy,
        baseline,
        system,
    }
}

/// Reads one [`EvaluationRecord`] per non-blank line.
pub fn read_jsonl<R: BufRead>(reader: R) -> Result<Vec<EvaluationRecord>, EvaluationError> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .map_err(|source| EvaluationError::Parse { line: idx + 1, source })?;
        records.push(record);
    }
    info!(records = records.len(), "Loaded evaluation records");
    Ok(records)
}
