//! Video-level aggregation and finalization.

pub mod aggregate;
pub mod aggregator;
pub mod types;


pub use aggregate::{aggregate, summarize};
pub use aggregator::{Aggregator, RunScope};
pub use types::{ReportSummary, VideoReport};
