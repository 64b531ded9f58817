//! IO modules - external interfaces of the metrics engine
//!
//! - `sources` - consumed measurement interfaces (WAL, file reads, store)
//! - `sink` - produced periodic record interface and the log sink
//! - `exporter` - HTTP management exporter republishing live values

pub mod exporter;
pub mod sink;
pub mod sources;

// Re-export commonly used types
pub use sink::{LogSink, ReportSink};
pub use sources::{FileReadStatsSource, StoreWriteStatsSource, WalStatsSource};
