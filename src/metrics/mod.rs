//! Processing log and metrics sinks.

pub mod error;
pub mod recorder;
pub mod sink;
pub mod types;


pub use error::MetricsError;
pub use recorder::LogRecorder;
#[cfg(any(test, feature = "mock"))]
pub use sink::MemorySink;
pub use sink::{InfluxConfig, InfluxLineSink, MetricsSink, TracingSink, to_line_protocol};
pub use types::{CallContext, LogStatus, ProcessingLogEntry, RunLog};
