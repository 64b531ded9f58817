//! Services - accumulator primitives and the aggregation engine
//!
//! - `accumulator` - distribution accumulators (regular and persistent)
//! - `counters` - gauges and per-interval rate counters
//! - `aggregator` - the orchestrator driving the periodic push cycle

pub mod accumulator;
pub mod aggregator;
pub mod counters;

// Re-export commonly used types
pub use aggregator::{MetricsAggregator, Tickable};
