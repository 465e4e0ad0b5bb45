//! Per-claim state machine.
//!
//! `transition` is total and pure: the driver in [`claim`](super::claim) performs the effect
//! for the current state, turns the result into a [`StageEvent`] and asks for the next state.
//! Terminal states absorb every event.

use serde::{Deserialize, Serialize};

use crate::cancel::CancelReason;
use crate::client::ClientError;
use crate::model::{Evidence, Verification};
use crate::provider::SearchHit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Retrieval,
    Ranking,
    Verification,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retrieval => "retrieval",
            Self::Ranking => "ranking",
            Self::Verification => "verification",
        }
    }
}

/// Where a failed claim is attributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Retrieval,
    Ranking,
    Verification,
    /// A claim or video deadline elapsed.
    Timeout,
    /// The caller aborted the video.
    Cancelled,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retrieval => "retrieval",
            Self::Ranking => "ranking",
            Self::Verification => "verification",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }

    fn from_cancel(reason: CancelReason) -> Self {
        if reason.is_deadline() {
            Self::Timeout
        } else {
            Self::Cancelled
        }
    }
}

impl From<Stage> for FailureStage {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Retrieval => Self::Retrieval,
            Stage::Ranking => Self::Ranking,
            Stage::Verification => Self::Verification,
        }
    }
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimFailure {
    pub stage: FailureStage,
    /// Short code such as `timeout`, `permanent` or `claim_deadline`.
    pub reason: String,
    pub detail: String,
    /// Stage that was running when the failure happened.
    pub during: Stage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClaimState {
    Retrieving,
    Ranking { hits: Vec<SearchHit> },
    Verifying { evidence: Vec<Evidence> },
    Verified {
        evidence: Vec<Evidence>,
        verification: Verification,
    },
    InsufficientEvidence,
    Failed {
        failure: ClaimFailure,
        /// Ranked evidence, if ranking finished before the failure.
        evidence: Vec<Evidence>,
    },
}

#[derive(Debug, Clone)]
pub enum StageEvent {
    Retrieved(Vec<SearchHit>),
    Ranked(Vec<Evidence>),
    Verified(Verification),
    /// The current stage's external call failed for good.
    StageFailed(ClientError),
    /// Cancellation observed between stages.
    Interrupted(CancelReason),
}

impl ClaimState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Verified { .. } | Self::InsufficientEvidence | Self::Failed { .. }
        )
    }

    /// Stage currently running, `None` once terminal.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Retrieving => Some(Stage::Retrieval),
            Self::Ranking { .. } => Some(Stage::Ranking),
            Self::Verifying { .. } => Some(Stage::Verification),
            _ => None,
        }
    }

    fn carried_evidence(self) -> Vec<Evidence> {
        match self {
            Self::Verifying { evidence } => evidence,
            _ => Vec::new(),
        }
    }
}

fn fail(
    state: ClaimState,
    stage: Stage,
    failure_stage: FailureStage,
    reason: &str,
    detail: String,
) -> ClaimState {
    ClaimState::Failed {
        failure: ClaimFailure {
            stage: failure_stage,
            reason: reason.to_string(),
            detail,
            during: stage,
        },
        evidence: state.carried_evidence(),
    }
}

pub fn transition(state: ClaimState, event: StageEvent) -> ClaimState {
    let Some(stage) = state.stage() else {
        return state;
    };

    match (state, event) {
        (ClaimState::Retrieving, StageEvent::Retrieved(hits)) => {
            if hits.is_empty() {
                ClaimState::InsufficientEvidence
            } else {
                ClaimState::Ranking { hits }
            }
        }
        (ClaimState::Ranking { .. }, StageEvent::Ranked(evidence)) => {
            if evidence.is_empty() {
                ClaimState::InsufficientEvidence
            } else {
                ClaimState::Verifying { evidence }
            }
        }
        (ClaimState::Verifying { evidence }, StageEvent::Verified(verification)) => {
            ClaimState::Verified {
                evidence,
                verification,
            }
        }
        (state, StageEvent::StageFailed(err)) => {
            let failure_stage = match err.cancel_reason() {
                Some(reason) => FailureStage::from_cancel(reason),
                None => stage.into(),
            };
            fail(state, stage, failure_stage, err.reason_code(), err.to_string())
        }
        (state, StageEvent::Interrupted(reason)) => fail(
            state,
            stage,
            FailureStage::from_cancel(reason),
            reason.as_str(),
            format!("stopped during {}", stage.as_str()),
        ),
        (state, _) => fail(
            state,
            stage,
            stage.into(),
            "invalid_transition",
            format!("unexpected event during {}", stage.as_str()),
        ),
    }
}
