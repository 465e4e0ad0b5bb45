use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rand::Rng;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::cancel::CancelToken;
use crate::constants::MALFORMED_RETRY_LIMIT;
use crate::metrics::{CallContext, LogRecorder, LogStatus, ProcessingLogEntry};
use crate::provider::{FailureClass, ProviderError};

use super::config::ClientConfig;
use super::error::ClientError;
use super::types::Capability;

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Tracks the in-flight gauge for one attempt; decrements on every exit path.
struct InFlightGuard<'a> {
    in_flight: &'a AtomicUsize,
}

impl<'a> InFlightGuard<'a> {
    fn enter(in_flight: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        peak.fetch_max(now, Ordering::AcqRel);
        Self { in_flight }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Uniform call wrapper for one external capability.
///
/// Owns the capability's permit pool, so at most `max_in_flight` attempts run at once across
/// every claim and video sharing the client. Each attempt is bounded by `call_timeout` and
/// produces exactly one processing log entry.
pub struct RateLimitedClient {
    capability: Capability,
    config: ClientConfig,
    permits: Semaphore,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    recorder: Arc<LogRecorder>,
}

impl std::fmt::Debug for RateLimitedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedClient")
            .field("capability", &self.capability)
            .field("config", &self.config)
            .field("in_flight", &self.in_flight())
            .field("peak_in_flight", &self.peak_in_flight())
            .finish()
    }
}

impl RateLimitedClient {
    pub fn new(capability: Capability, config: ClientConfig, recorder: Arc<LogRecorder>) -> Self {
        Self {
            capability,
            permits: Semaphore::new(config.max_in_flight.max(1)),
            config,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            recorder,
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn recorder(&self) -> &Arc<LogRecorder> {
        &self.recorder
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Highest in-flight count observed since construction.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Acquire)
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Runs `call` under the retry, timeout and permit policy.
    ///
    /// `call` is invoked once per attempt. Cancellation is checked before each attempt, while
    /// waiting for a permit and during backoff. An attempt that is already running finishes;
    /// if cancellation arrived meanwhile its result is discarded.
    #[instrument(
        level = "debug",
        skip_all,
        fields(capability = %self.capability, video_id = ?ctx.video_id, claim_id = ?ctx.claim_id)
    )]
    pub async fn invoke<T, F, Fut>(
        &self,
        ctx: &CallContext,
        cancel: &CancelToken,
        mut call: F,
    ) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt: u32 = 0;
        let mut malformed_retries: u32 = 0;

        loop {
            attempt += 1;

            if cancel.is_cancelled() {
                return Err(self.cancelled_error(cancel));
            }

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled_error(cancel)),
                permit = self.permits.acquire() => permit,
            };
            let permit = permit.map_err(|_| ClientError::Permanent {
                capability: self.capability,
                error: ProviderError::permanent("permit pool closed"),
            })?;

            let started = Instant::now();
            let result = {
                let _in_flight = InFlightGuard::enter(&self.in_flight, &self.peak_in_flight);
                match tokio::time::timeout(self.config.call_timeout, call()).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout {
                        elapsed_ms: millis(started.elapsed()),
                    }),
                }
            };
            drop(permit);
            let latency_ms = millis(started.elapsed());

            if let Some(reason) = cancel.reason() {
                self.log(
                    ctx,
                    LogStatus::Failure,
                    format!("result discarded: {reason}"),
                    latency_ms,
                    attempt,
                );
                return Err(ClientError::Cancelled {
                    capability: self.capability,
                    reason,
                });
            }

            let error = match result {
                Ok(value) => {
                    self.log(ctx, LogStatus::Success, "ok", latency_ms, attempt);
                    return Ok(value);
                }
                Err(error) => error,
            };

            let class = error.class();
            let retry = match class {
                FailureClass::Permanent => false,
                FailureClass::Transient => attempt < self.config.max_attempts,
                FailureClass::Malformed => {
                    attempt < self.config.max_attempts && malformed_retries < MALFORMED_RETRY_LIMIT
                }
            };

            if !retry {
                self.log(ctx, LogStatus::Failure, error.to_string(), latency_ms, attempt);
                return Err(self.terminal_error(error, attempt));
            }

            if class == FailureClass::Malformed {
                malformed_retries += 1;
            }

            let delay = self.next_delay(attempt, error.retry_after());
            self.log(
                ctx,
                LogStatus::Retry,
                format!("{error}; retrying in {}ms", delay.as_millis()),
                latency_ms,
                attempt,
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled_error(cancel)),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn next_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let delay = self.config.backoff_with_hint(attempt, retry_after);
        let jitter_ms = millis(self.config.jitter);
        if jitter_ms == 0 {
            return delay;
        }
        (delay + Duration::from_millis(rand::rng().random_range(0..=jitter_ms)))
            .min(self.config.max_delay)
    }

    fn terminal_error(&self, error: ProviderError, attempts: u32) -> ClientError {
        match error.class() {
            FailureClass::Permanent => ClientError::Permanent {
                capability: self.capability,
                error,
            },
            FailureClass::Malformed => ClientError::Malformed {
                capability: self.capability,
                attempts,
                reason: error.to_string(),
            },
            FailureClass::Transient => ClientError::Exhausted {
                capability: self.capability,
                attempts,
                last: error,
            },
        }
    }

    fn cancelled_error(&self, cancel: &CancelToken) -> ClientError {
        ClientError::Cancelled {
            capability: self.capability,
            reason: cancel
                .reason()
                .unwrap_or(crate::cancel::CancelReason::Aborted),
        }
    }

    fn log(
        &self,
        ctx: &CallContext,
        status: LogStatus,
        message: impl Into<String>,
        latency_ms: u64,
        attempt: u32,
    ) {
        let message = message.into();
        debug!(
            status = status.as_str(),
            attempt,
            latency_ms,
            message = %message,
            "Call attempt finished"
        );
        self.recorder.emit(
            ctx,
            ProcessingLogEntry::new(
                ctx,
                self.capability.component(),
                status,
                message,
                latency_ms,
                attempt,
            ),
        );
    }
}
