use serde::{Deserialize, Serialize};

use crate::model::{Claim, Evidence, Verification};

use super::state::ClaimFailure;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ClaimOutcome {
    Verified { verification: Verification },
    InsufficientEvidence,
    Failed { failure: ClaimFailure },
}

impl ClaimOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Verified { .. } => "verified",
            Self::InsufficientEvidence => "insufficient_evidence",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Terminal record of one claim: the claim, whatever evidence it kept, and how it ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimResult {
    pub claim: Claim,
    pub evidence: Vec<Evidence>,
    pub outcome: ClaimOutcome,
}

impl ClaimResult {
    pub fn verification(&self) -> Option<&Verification> {
        match &self.outcome {
            ClaimOutcome::Verified { verification } => Some(verification),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&ClaimFailure> {
        match &self.outcome {
            ClaimOutcome::Failed { failure } => Some(failure),
            _ => None,
        }
    }
}
