use serde::{Deserialize, Serialize};

use crate::constants::{
    COMPONENT_DECOMPOSITION, COMPONENT_RETRIEVAL, COMPONENT_SPEECH_TO_TEXT,
    COMPONENT_VERIFICATION,
};

/// External capability a client fronts. Each gets its own permit pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    SpeechToText,
    Decomposition,
    Search,
    Verification,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Self::SpeechToText,
        Self::Decomposition,
        Self::Search,
        Self::Verification,
    ];

    /// Component name written to processing log entries.
    pub fn component(&self) -> &'static str {
        match self {
            Self::SpeechToText => COMPONENT_SPEECH_TO_TEXT,
            Self::Decomposition => COMPONENT_DECOMPOSITION,
            Self::Search => COMPONENT_RETRIEVAL,
            Self::Verification => COMPONENT_VERIFICATION,
        }
    }

    /// Infix of the capability's `CLAIMFLOW_<INFIX>_*` environment variables.
    pub fn env_infix(&self) -> &'static str {
        match self {
            Self::SpeechToText => "SPEECH",
            Self::Decomposition => "DECOMPOSE",
            Self::Search => "SEARCH",
            Self::Verification => "VERIFY",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.component())
    }
}
