//! Point-in-time views pushed to report sinks and served by the exporter

use serde::Serialize;

/// What one push publishes for a distribution: the closed interval's
/// operation count and average, plus the historical extremes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DistributionSnapshot {
    /// Operations in the published interval
    pub ops: u64,
    /// Average time (or size) per operation over the published interval
    pub avg_time: u64,
    /// Historical minimum per-operation value
    pub min: u64,
    /// Historical maximum per-operation value
    pub max: u64,
}

/// Process memory reading used by the textual report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapUsage {
    pub used_mb: u64,
    pub max_mb: u64,
}

/// Live view of every declared metric, republished by the management
/// exporter. Read-only: producing one never rolls a window.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Requests per second over the last closed push interval
    pub requests_per_sec: f32,

    // Gauges
    pub regions: i64,
    pub stores: i64,
    pub storefiles: i64,
    pub storefile_index_size_mb: i64,
    pub root_index_size_kb: i64,
    pub total_static_index_size_kb: i64,
    pub total_static_bloom_size_kb: i64,
    pub memstore_size_mb: i64,
    pub compaction_queue_size: i64,
    pub block_cache_size: i64,
    pub block_cache_free: i64,
    pub block_cache_count: i64,
    pub block_cache_hit_ratio: i64,

    // Distributions
    pub read_latency: DistributionSnapshot,
    pub write_latency: DistributionSnapshot,
    pub write_size: DistributionSnapshot,
    pub sync_latency: DistributionSnapshot,
    pub group_sync_latency: DistributionSnapshot,
    pub memstore_insert_time: DistributionSnapshot,
    pub row_lock_time: DistributionSnapshot,
    pub concurrency_wait_time: DistributionSnapshot,
    pub compaction_time: DistributionSnapshot,
    pub compaction_size: DistributionSnapshot,
    pub flush_time: DistributionSnapshot,
    pub flush_size: DistributionSnapshot,
}
