use std::collections::VecDeque;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::constants::DEFAULT_SINK_QUEUE_CAPACITY;

use super::sink::MetricsSink;
use super::types::{CallContext, ProcessingLogEntry};

enum SinkMessage {
    Record(ProcessingLogEntry),
    Flush(oneshot::Sender<()>),
}

/// Append-only processing log shared by every client.
///
/// Entries are kept in memory (oldest evicted past `retention`), copied into the caller's
/// [`RunLog`](super::RunLog) when the context carries one, and queued for the sinks. Sink
/// writes run on a background task; a full queue or a failing sink drops the entry.
pub struct LogRecorder {
    entries: Mutex<VecDeque<ProcessingLogEntry>>,
    retention: usize,
    sinks: Vec<Arc<dyn MetricsSink>>,
    queue_capacity: usize,
    dispatch: OnceLock<Option<mpsc::Sender<SinkMessage>>>,
}

impl std::fmt::Debug for LogRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogRecorder")
            .field("entries", &self.entries.lock().len())
            .field("retention", &self.retention)
            .field(
                "sinks",
                &self.sinks.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}

impl LogRecorder {
    pub fn new(retention: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            retention: retention.max(1),
            sinks: Vec::new(),
            queue_capacity: DEFAULT_SINK_QUEUE_CAPACITY,
            dispatch: OnceLock::new(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Records `entry` without waiting on any sink.
    pub fn emit(&self, ctx: &CallContext, entry: ProcessingLogEntry) {
        if let Some(run) = &ctx.run {
            run.push(entry.clone());
        }

        {
            let mut entries = self.entries.lock();
            if entries.len() >= self.retention {
                entries.pop_front();
            }
            entries.push_back(entry.clone());
        }

        let Some(tx) = self.dispatcher() else {
            return;
        };
        match tx.try_send(SinkMessage::Record(entry)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    capacity = self.queue_capacity,
                    "Metrics sink queue full, dropping entry"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Metrics sink task stopped, dropping entry");
            }
        }
    }

    /// Waits until every entry queued so far has been offered to the sinks.
    pub async fn flush(&self) {
        let Some(tx) = self.dispatch.get().and_then(Option::as_ref) else {
            return;
        };
        let (done_tx, done_rx) = oneshot::channel();
        if tx.send(SinkMessage::Flush(done_tx)).await.is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Spawns the sink task on first use. `None` without sinks or outside a runtime.
    fn dispatcher(&self) -> Option<&mpsc::Sender<SinkMessage>> {
        if self.sinks.is_empty() {
            return None;
        }
        self.dispatch
            .get_or_init(|| {
                let Ok(handle) = tokio::runtime::Handle::try_current() else {
                    warn!("No async runtime, metrics sinks disabled");
                    return None;
                };
                let (tx, rx) = mpsc::channel(self.queue_capacity);
                handle.spawn(drain_sinks(self.sinks.clone(), rx));
                Some(tx)
            })
            .as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn entries(&self) -> Vec<ProcessingLogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn entries_for_video(&self, video_id: &str) -> Vec<ProcessingLogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.video_id.as_deref() == Some(video_id))
            .cloned()
            .collect()
    }

    pub fn entries_for_claim(&self, claim_id: &str) -> Vec<ProcessingLogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.claim_id.as_deref() == Some(claim_id))
            .cloned()
            .collect()
    }
}

impl Default for LogRecorder {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_LOG_RETENTION)
    }
}

async fn drain_sinks(sinks: Vec<Arc<dyn MetricsSink>>, mut rx: mpsc::Receiver<SinkMessage>) {
    while let Some(message) = rx.recv().await {
        match message {
            SinkMessage::Record(entry) => {
                for sink in &sinks {
                    if let Err(e) = sink.record(&entry).await {
                        warn!(
                            sink = sink.name(),
                            component = %entry.component,
                            error = %e,
                            "Metrics sink write failed"
                        );
                    }
                }
            }
            SinkMessage::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Metrics sink task finished");
}
