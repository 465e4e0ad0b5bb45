use std::env;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BASE_DELAY_MS, DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_JITTER_MS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_DELAY_MS, DEFAULT_MAX_IN_FLIGHT,
};

use super::types::Capability;

/// Retry, timeout and concurrency policy for one capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Permit ceiling shared by every caller of the capability.
    pub max_in_flight: usize,
    /// Total attempts including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound of the random delay added to every backoff.
    pub jitter: Duration,
    /// Bound on a single attempt.
    pub call_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            jitter: Duration::from_millis(DEFAULT_JITTER_MS),
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Defaults tuned per capability. Transcription of long audio is slow.
    pub fn for_capability(capability: Capability) -> Self {
        match capability {
            Capability::SpeechToText => Self {
                call_timeout: Duration::from_secs(300),
                max_attempts: 2,
                ..Self::default()
            },
            Capability::Decomposition | Capability::Verification => Self {
                call_timeout: Duration::from_secs(60),
                ..Self::default()
            },
            Capability::Search => Self::default(),
        }
    }

    /// Reads `CLAIMFLOW_<INFIX>_*` overrides on top of the capability defaults.
    pub fn from_env(capability: Capability) -> Self {
        let defaults = Self::for_capability(capability);
        let var = |suffix: &str| format!("CLAIMFLOW_{}_{suffix}", capability.env_infix());

        Self {
            max_in_flight: parse_from_env(&var("MAX_IN_FLIGHT"), defaults.max_in_flight),
            max_attempts: parse_from_env(&var("MAX_ATTEMPTS"), defaults.max_attempts),
            base_delay: parse_millis_from_env(&var("BASE_DELAY_MS"), defaults.base_delay),
            max_delay: parse_millis_from_env(&var("MAX_DELAY_MS"), defaults.max_delay),
            jitter: parse_millis_from_env(&var("JITTER_MS"), defaults.jitter),
            call_timeout: parse_millis_from_env(&var("CALL_TIMEOUT_MS"), defaults.call_timeout),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_in_flight == 0 {
            return Err("max_in_flight must be at least 1".to_string());
        }
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if self.call_timeout.is_zero() {
            return Err("call_timeout must be non-zero".to_string());
        }
        if self.max_delay < self.base_delay {
            return Err(format!(
                "max_delay ({:?}) must not be below base_delay ({:?})",
                self.max_delay, self.base_delay
            ));
        }
        Ok(())
    }

    /// Backoff after failed attempt `attempt` (1-based), before jitter:
    /// `base_delay * 2^(attempt-1)`, capped at `max_delay`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Backoff honoring a provider hint. The hint can raise the wait, never past `max_delay`.
    pub fn backoff_with_hint(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let base = self.backoff_delay(attempt);
        match retry_after {
            Some(hint) => base.max(hint.min(self.max_delay)),
            None => base,
        }
    }
}

fn parse_from_env<T: std::str::FromStr>(var_name: &str, default: T) -> T {
    env::var(var_name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_millis_from_env(var_name: &str, default: Duration) -> Duration {
    env::var(var_name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}
