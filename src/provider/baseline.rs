//! Lexical baseline verifier.
//!
//! Counts cue phrases in the evidence snippets and picks the label whose cues dominate. It
//! needs no model and is deterministic, which makes it a useful floor for evaluation runs.

use async_trait::async_trait;

use crate::model::{Evidence, VerdictLabel};

use super::error::ProviderError;
use super::types::VerifierResponse;
use super::Verifier;

pub const SUPPORT_CUES: &[&str] = &[
    "confirmed",
    "verified",
    "proven",
    "established",
    "documented",
    "official",
    "according to",
    "research shows",
    "studies indicate",
    "evidence suggests",
    "data shows",
    "statistics show",
];

pub const REFUTE_CUES: &[&str] = &[
    "debunked",
    "false",
    "hoax",
    "fake",
    "misleading",
    "incorrect",
    "disproven",
    "contradicts",
    "denies",
    "refutes",
    "disputed",
];

pub const UNCERTAIN_CUES: &[&str] = &[
    "may",
    "might",
    "could",
    "possibly",
    "allegedly",
    "reportedly",
    "unclear",
    "uncertain",
    "unknown",
    "unverified",
    "unconfirmed",
];

/// Lowercased text with every non-alphanumeric run replaced by one space, padded on both
/// ends so whole-word phrase matching is a substring search.
fn padded_words(text: &str) -> String {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    format!(" {} ", words.join(" "))
}

fn count_cues(padded: &str, cues: &[&str]) -> usize {
    cues.iter()
        .map(|cue| padded.matches(&format!(" {cue} ")).count())
        .sum()
}

#[derive(Debug, Clone, Copy, Default)]
struct CueCounts {
    support: usize,
    refute: usize,
    uncertain: usize,
}

impl CueCounts {
    fn of(text: &str) -> Self {
        let padded = padded_words(text);
        Self {
            support: count_cues(&padded, SUPPORT_CUES),
            refute: count_cues(&padded, REFUTE_CUES),
            uncertain: count_cues(&padded, UNCERTAIN_CUES),
        }
    }

    fn add(self, other: Self) -> Self {
        Self {
            support: self.support + other.support,
            refute: self.refute + other.refute,
            uncertain: self.uncertain + other.uncertain,
        }
    }

    fn of_label(&self, label: VerdictLabel) -> usize {
        match label {
            VerdictLabel::Supported => self.support,
            VerdictLabel::Refuted => self.refute,
            VerdictLabel::NotEnoughEvidence => self.uncertain,
        }
    }

    /// Refuting cues win only when they outnumber both other kinds; same for support.
    fn decide(&self) -> (VerdictLabel, f32) {
        let ratio = |hits: usize, rest: usize| (hits as f32 / (rest as f32 + 1.0)).min(1.0);

        if self.refute > self.support && self.refute > self.uncertain {
            (
                VerdictLabel::Refuted,
                ratio(self.refute, self.support + self.uncertain),
            )
        } else if self.support > self.refute && self.support > self.uncertain {
            (
                VerdictLabel::Supported,
                ratio(self.support, self.refute + self.uncertain),
            )
        } else {
            (VerdictLabel::NotEnoughEvidence, 0.5)
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordBaselineVerifier;

impl KeywordBaselineVerifier {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core, shared with evaluation tooling.
    pub fn judge(&self, evidence: &[Evidence]) -> VerifierResponse {
        let per_item: Vec<CueCounts> = evidence
            .iter()
            .map(|e| CueCounts::of(&format!("{} {}", e.title, e.snippet)))
            .collect();
        let total = per_item
            .iter()
            .fold(CueCounts::default(), |acc, c| acc.add(*c));

        let (label, confidence) = total.decide();

        let citations = if label == VerdictLabel::NotEnoughEvidence {
            Vec::new()
        } else {
            per_item
                .iter()
                .enumerate()
                .filter(|(_, counts)| counts.of_label(label) > 0)
                .map(|(idx, _)| idx)
                .collect()
        };

        let explanation = format!(
            "cue counts: supporting {}, refuting {}, uncertain {}",
            total.support, total.refute, total.uncertain
        );

        VerifierResponse {
            label,
            confidence,
            explanation,
            citations,
        }
    }
}

#[async_trait]
impl Verifier for KeywordBaselineVerifier {
    async fn verify(
        &self,
        _claim: &str,
        evidence: &[Evidence],
    ) -> Result<VerifierResponse, ProviderError> {
        Ok(self.judge(evidence))
    }
}
