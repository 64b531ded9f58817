//! Domain models - the plain data types of the metrics engine
//!
//! - `SampleSummary` - destructively-read producer-side sample summary
//! - `DistributionSnapshot` - per-push view of one distribution
//! - `MetricsSnapshot` - live view served by the management exporter
//! - `HeapUsage` - process memory reading for the textual report

pub mod sample;
pub mod snapshot;

// Re-export commonly used types at module level
pub use sample::SampleSummary;
pub use snapshot::{DistributionSnapshot, HeapUsage, MetricsSnapshot};
