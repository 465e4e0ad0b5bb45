//! Hierarchical cancellation.
//!
//! A video owns a root token; each claim gets a child. Cancelling a parent cancels every
//! descendant, cancelling a child leaves the parent and siblings alone. The first reason
//! recorded on a token wins.


use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

/// Why work was asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// The caller gave up on the video.
    Aborted,
    /// The video-wide deadline elapsed.
    VideoDeadline,
    /// The per-claim deadline elapsed.
    ClaimDeadline,
}

impl CancelReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aborted => "aborted",
            Self::VideoDeadline => "video_deadline",
            Self::ClaimDeadline => "claim_deadline",
        }
    }

    pub fn is_deadline(&self) -> bool {
        matches!(self, Self::VideoDeadline | Self::ClaimDeadline)
    }
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Default)]
struct Inner {
    reason: Mutex<Option<CancelReason>>,
    notify: Notify,
    parent: Option<CancelToken>,
}

/// Cheaply cloneable cancellation handle.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("reason", &self.reason())
            .field("has_parent", &self.inner.parent.is_some())
            .finish()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that is cancelled whenever `self` is.
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(Inner {
                parent: Some(self.clone()),
                ..Inner::default()
            }),
        }
    }

    /// Cancels this token and its descendants. Returns `false` if it was already cancelled.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        {
            let mut slot = self.inner.reason.lock();
            if slot.is_some() {
                return false;
            }
            *slot = Some(reason);
        }
        self.inner.notify.notify_waiters();
        true
    }

    /// The reason on this token, or the nearest cancelled ancestor's.
    pub fn reason(&self) -> Option<CancelReason> {
        let own = *self.inner.reason.lock();
        own.or_else(|| self.inner.parent.as_ref().and_then(CancelToken::reason))
    }

    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }

    /// Resolves once this token or any ancestor is cancelled.
    pub fn cancelled(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent cancel cannot slip between the two.
            notified.as_mut().enable();

            if self.is_cancelled() {
                return;
            }

            match &self.inner.parent {
                Some(parent) => {
                    tokio::select! {
                        _ = &mut notified => {}
                        _ = parent.cancelled() => {}
                    }
                }
                None => notified.await,
            }
        })
    }
}
