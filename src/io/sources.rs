//! Measurement sources: the storage-engine subsystems that generate raw
//! measurements
//!
//! Every read is destructive: a source resets its own window once read,
//! so each value covers exactly the span since the previous pull. All
//! methods are fallible; the aggregator logs a failed pull and skips
//! that measurement group for the tick.

use anyhow::Result;

use crate::domain::SampleSummary;

/// Write-ahead-log measurement source.
pub trait WalStatsSource {
    /// Latency of WAL append calls since the previous pull.
    fn take_write_latency(&self) -> Result<SampleSummary>;
    /// Size in bytes of data in WAL append calls.
    fn take_write_size(&self) -> Result<SampleSummary>;
    /// Latency of WAL sync calls.
    fn take_sync_latency(&self) -> Result<SampleSummary>;
    /// Latency of WAL group-sync calls.
    fn take_group_sync_latency(&self) -> Result<SampleSummary>;
}

/// File-read layer source. The time value is only meaningful together
/// with a nonzero op count from the same pull.
pub trait FileReadStatsSource {
    fn take_read_ops(&self) -> Result<u64>;
    fn take_read_time(&self) -> Result<u64>;
}

/// In-memory store source: write counts and the timings attributed to
/// those writes. Each timing covers the same ops as `take_write_ops`.
pub trait StoreWriteStatsSource {
    fn take_write_ops(&self) -> Result<u64>;
    fn take_memstore_insert_time(&self) -> Result<u64>;
    fn take_row_lock_time(&self) -> Result<u64>;
    fn take_concurrency_wait_time(&self) -> Result<u64>;
}
