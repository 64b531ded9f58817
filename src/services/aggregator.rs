//! Periodic metrics aggregation for the storage node
//!
//! One aggregator instance owns every gauge, rate counter, and
//! distribution the node reports. The owning process registers the
//! aggregator with its scheduler, which drives [`Tickable::tick`] once
//! per push interval; producers update metrics concurrently through the
//! aggregator's APIs.
//!
//! All metric state sits behind a single mutex held for the whole of a
//! tick and of each producer call: a tick observes a consistent
//! point-in-time snapshot and no producer update is lost to a race.
//! Nothing inside the critical section blocks on IO.

use parking_lot::Mutex;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::domain::{HeapUsage, MetricsSnapshot, SampleSummary};
use crate::infra::config::Config;
use crate::infra::heap::HeapSampler;
use crate::io::sink::ReportSink;
use crate::io::sources::{FileReadStatsSource, StoreWriteStatsSource, WalStatsSource};
use crate::services::accumulator::{Distribution, PersistentDistribution};
use crate::services::counters::{Gauge, RateCounter};

/// Single-method capability the owning process registers with its
/// periodic scheduler. Ticks are serialized by the scheduler; producer
/// calls may overlap a tick freely.
pub trait Tickable: Send + Sync {
    fn tick(&self);
}

/// Aggregates the node's operational measurements and pushes a record to
/// the report sink once per tick.
pub struct MetricsAggregator {
    inner: Mutex<Inner>,
    wal: Arc<dyn WalStatsSource + Send + Sync>,
    reads: Arc<dyn FileReadStatsSource + Send + Sync>,
    store: Arc<dyn StoreWriteStatsSource + Send + Sync>,
    heap: HeapSampler,
    exporter: Mutex<Option<watch::Sender<bool>>>,
}

struct Inner {
    sink: Box<dyn ReportSink + Send>,
    last_update: Instant,
    last_ext_update: Instant,
    extended_period: Duration,

    requests: RateCounter,

    regions: Gauge,
    stores: Gauge,
    storefiles: Gauge,
    storefile_index_size_mb: Gauge,
    root_index_size_kb: Gauge,
    total_static_index_size_kb: Gauge,
    total_static_bloom_size_kb: Gauge,
    memstore_size_mb: Gauge,
    compaction_queue_size: Gauge,
    block_cache_size: Gauge,
    block_cache_free: Gauge,
    block_cache_count: Gauge,
    block_cache_hit_ratio: Gauge,

    read_latency: Distribution,
    write_latency: Distribution,
    write_size: Distribution,
    sync_latency: Distribution,
    group_sync_latency: Distribution,
    memstore_insert_time: Distribution,
    row_lock_time: Distribution,
    concurrency_wait_time: Distribution,

    compaction_time: PersistentDistribution,
    compaction_size: PersistentDistribution,
    flush_time: PersistentDistribution,
    flush_size: PersistentDistribution,
}

impl Inner {
    fn new(sink: Box<dyn ReportSink + Send>, extended_period: Duration, now: Instant) -> Self {
        Self {
            sink,
            last_update: now,
            last_ext_update: now,
            extended_period,
            requests: RateCounter::new("requests"),
            regions: Gauge::new("regions"),
            stores: Gauge::new("stores"),
            storefiles: Gauge::new("storefiles"),
            storefile_index_size_mb: Gauge::new("storefile_index_size_mb"),
            root_index_size_kb: Gauge::new("root_index_size_kb"),
            total_static_index_size_kb: Gauge::new("total_static_index_size_kb"),
            total_static_bloom_size_kb: Gauge::new("total_static_bloom_size_kb"),
            memstore_size_mb: Gauge::new("memstore_size_mb"),
            compaction_queue_size: Gauge::new("compaction_queue_size"),
            block_cache_size: Gauge::new("block_cache_size"),
            block_cache_free: Gauge::new("block_cache_free"),
            block_cache_count: Gauge::new("block_cache_count"),
            block_cache_hit_ratio: Gauge::new("block_cache_hit_ratio"),
            read_latency: Distribution::new("read_latency"),
            write_latency: Distribution::new("write_latency"),
            write_size: Distribution::new("write_size"),
            sync_latency: Distribution::new("sync_latency"),
            group_sync_latency: Distribution::new("group_sync_latency"),
            memstore_insert_time: Distribution::new("memstore_insert_time"),
            row_lock_time: Distribution::new("row_lock_time"),
            concurrency_wait_time: Distribution::new("concurrency_wait_time"),
            compaction_time: PersistentDistribution::new("compaction_time"),
            compaction_size: PersistentDistribution::new("compaction_size"),
            flush_time: PersistentDistribution::new("flush_time"),
            flush_size: PersistentDistribution::new("flush_size"),
        }
    }

    /// Extended reset: long-lived windows of the persistent accumulators
    /// and historical extremes of the regular ones. Totals, interval
    /// windows, and gauges are untouched.
    fn reset_long_lived(&mut self) {
        self.compaction_time.reset_window();
        self.compaction_size.reset_window();
        self.flush_time.reset_window();
        self.flush_size.reset_window();
        self.read_latency.reset_extremes();
        self.write_latency.reset_extremes();
        self.write_size.reset_extremes();
        self.sync_latency.reset_extremes();
        self.group_sync_latency.reset_extremes();
        self.memstore_insert_time.reset_extremes();
        self.row_lock_time.reset_extremes();
        self.concurrency_wait_time.reset_extremes();
    }

    fn push_gauges(&mut self) {
        let values = [
            (self.regions.name(), self.regions.get()),
            (self.stores.name(), self.stores.get()),
            (self.storefiles.name(), self.storefiles.get()),
            (self.storefile_index_size_mb.name(), self.storefile_index_size_mb.get()),
            (self.root_index_size_kb.name(), self.root_index_size_kb.get()),
            (self.total_static_index_size_kb.name(), self.total_static_index_size_kb.get()),
            (self.total_static_bloom_size_kb.name(), self.total_static_bloom_size_kb.get()),
            (self.memstore_size_mb.name(), self.memstore_size_mb.get()),
            (self.compaction_queue_size.name(), self.compaction_queue_size.get()),
            (self.block_cache_size.name(), self.block_cache_size.get()),
            (self.block_cache_free.name(), self.block_cache_free.get()),
            (self.block_cache_count.name(), self.block_cache_count.get()),
            (self.block_cache_hit_ratio.name(), self.block_cache_hit_ratio.get()),
        ];
        for (name, value) in values {
            self.sink.push_gauge(name, value);
        }
    }

    /// Push rates and distributions in declaration order. The order is
    /// stable across releases; sinks may rely on it.
    fn push_rates_and_distributions(&mut self, elapsed: Duration) {
        let rate = self.requests.roll(elapsed);
        self.sink.push_rate(self.requests.name(), rate);

        let rolled = [
            (self.read_latency.name(), self.read_latency.roll()),
            (self.write_latency.name(), self.write_latency.roll()),
            (self.write_size.name(), self.write_size.roll()),
            (self.sync_latency.name(), self.sync_latency.roll()),
            (self.group_sync_latency.name(), self.group_sync_latency.roll()),
            (self.memstore_insert_time.name(), self.memstore_insert_time.roll()),
            (self.row_lock_time.name(), self.row_lock_time.roll()),
            (self.concurrency_wait_time.name(), self.concurrency_wait_time.roll()),
        ];
        for (name, snapshot) in rolled {
            self.sink.push_distribution(name, snapshot);
        }

        let persistent = [
            (self.compaction_time.name(), self.compaction_time.snapshot()),
            (self.compaction_size.name(), self.compaction_size.snapshot()),
            (self.flush_time.name(), self.flush_time.snapshot()),
            (self.flush_size.name(), self.flush_size.snapshot()),
        ];
        for (name, snapshot) in persistent {
            self.sink.push_distribution(name, snapshot);
        }
    }
}

/// Fold a pre-aggregated sample summary into a distribution without the
/// raw samples: the window min and max go in as single operations, the
/// remainder as one bulk increment, so op count and total time are
/// preserved exactly. Historical extremes only ever see each window's
/// min and max; finer per-operation extremes are deliberately not
/// reconstructed.
fn fold_sample(dist: &mut Distribution, sample: &SampleSummary) {
    if sample.count == 0 {
        return;
    }
    apply(dist, 1, sample.min);
    if sample.count > 1 {
        apply(dist, 1, sample.max);
    }
    if sample.count > 2 {
        let rest = sample
            .total
            .saturating_sub(sample.max)
            .saturating_sub(sample.min);
        apply(dist, sample.count - 2, rest);
    }
}

fn fold_pulled(dist: &mut Distribution, pulled: anyhow::Result<SampleSummary>) {
    match pulled {
        Ok(sample) => fold_sample(dist, &sample),
        Err(e) => warn!(metric = dist.name(), error = %e, "sample_pull_failed"),
    }
}

fn apply(dist: &mut Distribution, ops: u64, time: u64) {
    if let Err(e) = dist.increment(ops, time) {
        warn!(error = %e, "distribution_increment_rejected");
    }
}

fn apply_persistent(dist: &mut PersistentDistribution, ops: u64, time: u64) {
    if let Err(e) = dist.increment(ops, time) {
        warn!(error = %e, "distribution_increment_rejected");
    }
}

impl MetricsAggregator {
    pub fn new(
        config: &Config,
        wal: Arc<dyn WalStatsSource + Send + Sync>,
        reads: Arc<dyn FileReadStatsSource + Send + Sync>,
        store: Arc<dyn StoreWriteStatsSource + Send + Sync>,
        sink: Box<dyn ReportSink + Send>,
    ) -> Self {
        let now = Instant::now();
        info!(
            extended_period_secs = config.extended_period_secs(),
            "metrics_aggregator_initialized"
        );
        Self {
            inner: Mutex::new(Inner::new(sink, config.extended_period(), now)),
            wal,
            reads,
            store,
            heap: HeapSampler::new(),
            exporter: Mutex::new(None),
        }
    }

    /// One push cycle: extended-period check, gauge pushes, collaborator
    /// pulls (each group error-isolated), ordered rate/distribution
    /// pushes, record completion. Runs entirely under the state mutex.
    pub fn tick(&self) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let now = Instant::now();
        let elapsed = now.duration_since(inner.last_update);
        inner.last_update = now;
        debug!(elapsed_ms = elapsed.as_millis() as u64, "metrics_tick");

        // Has the extended period for long-living stats elapsed?
        if !inner.extended_period.is_zero()
            && now.duration_since(inner.last_ext_update) >= inner.extended_period
        {
            inner.last_ext_update = now;
            inner.reset_long_lived();
            debug!("extended_period_reset");
        }

        inner.push_gauges();

        // WAL sample summaries
        fold_pulled(&mut inner.write_latency, self.wal.take_write_latency());
        fold_pulled(&mut inner.write_size, self.wal.take_write_size());
        fold_pulled(&mut inner.sync_latency, self.wal.take_sync_latency());
        fold_pulled(&mut inner.group_sync_latency, self.wal.take_group_sync_latency());

        // File-read layer: the time pull only happens when ops is
        // nonzero, so an idle window leaves the source untouched
        match self.reads.take_read_ops() {
            Ok(0) => {}
            Ok(ops) => match self.reads.take_read_time() {
                Ok(time) => apply(&mut inner.read_latency, ops, time),
                Err(e) => warn!(error = %e, "file_read_pull_failed"),
            },
            Err(e) => warn!(error = %e, "file_read_pull_failed"),
        }

        // Store writes: one op count covers all three timings; a failed
        // timing pull skips only that timing
        match self.store.take_write_ops() {
            Ok(0) => {}
            Ok(ops) => {
                match self.store.take_memstore_insert_time() {
                    Ok(time) => apply(&mut inner.memstore_insert_time, ops, time),
                    Err(e) => warn!(error = %e, "memstore_insert_pull_failed"),
                }
                match self.store.take_row_lock_time() {
                    Ok(time) => apply(&mut inner.row_lock_time, ops, time),
                    Err(e) => warn!(error = %e, "row_lock_pull_failed"),
                }
                match self.store.take_concurrency_wait_time() {
                    Ok(time) => apply(&mut inner.concurrency_wait_time, ops, time),
                    Err(e) => warn!(error = %e, "concurrency_wait_pull_failed"),
                }
            }
            Err(e) => warn!(error = %e, "store_write_pull_failed"),
        }

        inner.push_rates_and_distributions(elapsed);
        inner.sink.complete();
    }

    /// Duration of a compaction and the byte size of the storefiles it
    /// covered.
    pub fn add_compaction(&self, time_ms: u64, size_bytes: u64) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        apply_persistent(&mut inner.compaction_time, 1, time_ms);
        apply_persistent(&mut inner.compaction_size, 1, size_bytes);
    }

    /// Flush history as (duration, size) pairs; each pair is one
    /// increment to flush time and one to flush size.
    pub fn add_flush(&self, flushes: &[(u64, u64)]) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        for &(time_ms, size_bytes) in flushes {
            apply_persistent(&mut inner.flush_time, 1, time_ms);
            apply_persistent(&mut inner.flush_size, 1, size_bytes);
        }
    }

    pub fn increment_requests(&self, n: u64) {
        self.inner.lock().requests.inc(n);
    }

    /// Requests per second over the last closed push interval.
    pub fn requests(&self) -> f32 {
        self.inner.lock().requests.previous_interval_rate()
    }

    pub fn set_regions(&self, value: i64) {
        self.inner.lock().regions.set(value);
    }

    pub fn set_stores(&self, value: i64) {
        self.inner.lock().stores.set(value);
    }

    pub fn set_storefiles(&self, value: i64) {
        self.inner.lock().storefiles.set(value);
    }

    pub fn set_storefile_index_size_mb(&self, value: i64) {
        self.inner.lock().storefile_index_size_mb.set(value);
    }

    pub fn set_root_index_size_kb(&self, value: i64) {
        self.inner.lock().root_index_size_kb.set(value);
    }

    pub fn set_total_static_index_size_kb(&self, value: i64) {
        self.inner.lock().total_static_index_size_kb.set(value);
    }

    pub fn set_total_static_bloom_size_kb(&self, value: i64) {
        self.inner.lock().total_static_bloom_size_kb.set(value);
    }

    pub fn set_memstore_size_mb(&self, value: i64) {
        self.inner.lock().memstore_size_mb.set(value);
    }

    pub fn set_compaction_queue_size(&self, value: i64) {
        self.inner.lock().compaction_queue_size.set(value);
    }

    pub fn set_block_cache_size(&self, value: i64) {
        self.inner.lock().block_cache_size.set(value);
    }

    pub fn set_block_cache_free(&self, value: i64) {
        self.inner.lock().block_cache_free.set(value);
    }

    pub fn set_block_cache_count(&self, value: i64) {
        self.inner.lock().block_cache_count.set(value);
    }

    pub fn set_block_cache_hit_ratio(&self, value: i64) {
        self.inner.lock().block_cache_hit_ratio.set(value);
    }

    /// Human-readable key=value report of the current gauge values plus
    /// process heap usage. Mutates nothing; identical strings absent
    /// intervening writes.
    pub fn report(&self) -> String {
        self.render_report(self.heap.usage())
    }

    fn render_report(&self, heap: HeapUsage) -> String {
        let inner = self.inner.lock();
        let mut out = String::with_capacity(512);
        append_key_value(&mut out, "requests", format_args!("{:.1}", inner.requests.previous_interval_rate()));
        append_key_value(&mut out, "regions", inner.regions.get());
        append_key_value(&mut out, "stores", inner.stores.get());
        append_key_value(&mut out, "storefiles", inner.storefiles.get());
        append_key_value(&mut out, "storefile_index_size_mb", inner.storefile_index_size_mb.get());
        append_key_value(&mut out, "root_index_size_kb", inner.root_index_size_kb.get());
        append_key_value(&mut out, "total_static_index_size_kb", inner.total_static_index_size_kb.get());
        append_key_value(&mut out, "total_static_bloom_size_kb", inner.total_static_bloom_size_kb.get());
        append_key_value(&mut out, "memstore_size_mb", inner.memstore_size_mb.get());
        append_key_value(&mut out, "compaction_queue_size", inner.compaction_queue_size.get());
        append_key_value(&mut out, "used_heap_mb", heap.used_mb);
        append_key_value(&mut out, "max_heap_mb", heap.max_mb);
        append_key_value(&mut out, "block_cache_size", inner.block_cache_size.get());
        append_key_value(&mut out, "block_cache_free", inner.block_cache_free.get());
        append_key_value(&mut out, "block_cache_count", inner.block_cache_count.get());
        append_key_value(&mut out, "block_cache_hit_ratio", inner.block_cache_hit_ratio.get());
        out
    }

    /// Live view of every declared metric; read-only.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock();
        MetricsSnapshot {
            requests_per_sec: inner.requests.previous_interval_rate(),
            regions: inner.regions.get(),
            stores: inner.stores.get(),
            storefiles: inner.storefiles.get(),
            storefile_index_size_mb: inner.storefile_index_size_mb.get(),
            root_index_size_kb: inner.root_index_size_kb.get(),
            total_static_index_size_kb: inner.total_static_index_size_kb.get(),
            total_static_bloom_size_kb: inner.total_static_bloom_size_kb.get(),
            memstore_size_mb: inner.memstore_size_mb.get(),
            compaction_queue_size: inner.compaction_queue_size.get(),
            block_cache_size: inner.block_cache_size.get(),
            block_cache_free: inner.block_cache_free.get(),
            block_cache_count: inner.block_cache_count.get(),
            block_cache_hit_ratio: inner.block_cache_hit_ratio.get(),
            read_latency: inner.read_latency.snapshot(),
            write_latency: inner.write_latency.snapshot(),
            write_size: inner.write_size.snapshot(),
            sync_latency: inner.sync_latency.snapshot(),
            group_sync_latency: inner.group_sync_latency.snapshot(),
            memstore_insert_time: inner.memstore_insert_time.snapshot(),
            row_lock_time: inner.row_lock_time.snapshot(),
            concurrency_wait_time: inner.concurrency_wait_time.snapshot(),
            compaction_time: inner.compaction_time.snapshot(),
            compaction_size: inner.compaction_size.snapshot(),
            flush_time: inner.flush_time.snapshot(),
            flush_size: inner.flush_size.snapshot(),
        }
    }

    /// Start the management exporter on `port`. A port of 0 leaves the
    /// aggregator without an exporter. Bind failures are logged; the
    /// engine keeps running either way.
    pub fn attach_exporter(self: &Arc<Self>, port: u16) {
        if port == 0 {
            return;
        }
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        {
            let mut slot = self.exporter.lock();
            if slot.is_some() {
                warn!("management_exporter_already_attached");
                return;
            }
            *slot = Some(shutdown_tx);
        }
        let aggregator = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = crate::io::exporter::serve(port, aggregator, shutdown_rx).await {
                error!(error = %e, "management_exporter_failed");
            }
        });
    }

    /// Detach the management exporter if attached. Safe to call any
    /// number of times.
    pub fn shutdown(&self) {
        if let Some(shutdown_tx) = self.exporter.lock().take() {
            let _ = shutdown_tx.send(true);
            info!("management_exporter_detached");
        }
    }
}

impl Tickable for MetricsAggregator {
    fn tick(&self) {
        MetricsAggregator::tick(self);
    }
}

fn append_key_value(out: &mut String, key: &str, value: impl std::fmt::Display) {
    if !out.is_empty() {
        out.push_str(", ");
    }
    let _ = write!(out, "{key}={value}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DistributionSnapshot;
    use anyhow::anyhow;
    use parking_lot::Mutex as PlMutex;
    use std::collections::VecDeque;

    /// Records everything pushed to it, one entry per push, in order.
    #[derive(Debug, Clone, PartialEq)]
    enum Pushed {
        Gauge(&'static str, i64),
        Rate(&'static str, f32),
        Distribution(&'static str, DistributionSnapshot),
        Complete,
    }

    #[derive(Default)]
    struct RecordingSink {
        pushed: Arc<PlMutex<Vec<Pushed>>>,
    }

    impl ReportSink for RecordingSink {
        fn push_gauge(&mut self, name: &'static str, value: i64) {
            self.pushed.lock().push(Pushed::Gauge(name, value));
        }
        fn push_rate(&mut self, name: &'static str, events_per_sec: f32) {
            self.pushed.lock().push(Pushed::Rate(name, events_per_sec));
        }
        fn push_distribution(&mut self, name: &'static str, snapshot: DistributionSnapshot) {
            self.pushed.lock().push(Pushed::Distribution(name, snapshot));
        }
        fn complete(&mut self) {
            self.pushed.lock().push(Pushed::Complete);
        }
    }

    /// WAL stub replaying queued summaries for write latency; the other
    /// measurements read empty.
    #[derive(Default)]
    struct StubWal {
        write_latency: PlMutex<VecDeque<SampleSummary>>,
        fail_write_latency: bool,
    }

    impl WalStatsSource for StubWal {
        fn take_write_latency(&self) -> anyhow::Result<SampleSummary> {
            if self.fail_write_latency {
                return Err(anyhow!("wal unavailable"));
            }
            Ok(self.write_latency.lock().pop_front().unwrap_or_default())
        }
        fn take_write_size(&self) -> anyhow::Result<SampleSummary> {
            Ok(SampleSummary::empty())
        }
        fn take_sync_latency(&self) -> anyhow::Result<SampleSummary> {
            Ok(SampleSummary::empty())
        }
        fn take_group_sync_latency(&self) -> anyhow::Result<SampleSummary> {
            Ok(SampleSummary::empty())
        }
    }

    #[derive(Default)]
    struct StubReads {
        ops: PlMutex<u64>,
        time: PlMutex<u64>,
    }

    impl FileReadStatsSource for StubReads {
        fn take_read_ops(&self) -> anyhow::Result<u64> {
            Ok(std::mem::take(&mut *self.ops.lock()))
        }
        fn take_read_time(&self) -> anyhow::Result<u64> {
            Ok(std::mem::take(&mut *self.time.lock()))
        }
    }

    #[derive(Default)]
    struct StubStore {
        write_ops: PlMutex<u64>,
    }

    impl StoreWriteStatsSource for StubStore {
        fn take_write_ops(&self) -> anyhow::Result<u64> {
            Ok(std::mem::take(&mut *self.write_ops.lock()))
        }
        fn take_memstore_insert_time(&self) -> anyhow::Result<u64> {
            Ok(8)
        }
        fn take_row_lock_time(&self) -> anyhow::Result<u64> {
            Ok(4)
        }
        fn take_concurrency_wait_time(&self) -> anyhow::Result<u64> {
            Ok(2)
        }
    }

    struct Harness {
        aggregator: MetricsAggregator,
        #[allow(dead_code)]
        wal: Arc<StubWal>,
        reads: Arc<StubReads>,
        store: Arc<StubStore>,
        pushed: Arc<PlMutex<Vec<Pushed>>>,
    }

    fn harness_with(config: Config, wal: StubWal) -> Harness {
        let wal = Arc::new(wal);
        let reads = Arc::new(StubReads::default());
        let store = Arc::new(StubStore::default());
        let pushed = Arc::new(PlMutex::new(Vec::new()));
        let sink = RecordingSink { pushed: pushed.clone() };
        let aggregator = MetricsAggregator::new(
            &config,
            wal.clone(),
            reads.clone(),
            store.clone(),
            Box::new(sink),
        );
        Harness { aggregator, wal, reads, store, pushed }
    }

    fn harness() -> Harness {
        harness_with(Config::default(), StubWal::default())
    }

    fn distribution_pushes(pushed: &[Pushed]) -> Vec<(&'static str, DistributionSnapshot)> {
        pushed
            .iter()
            .filter_map(|p| match p {
                Pushed::Distribution(name, snap) => Some((*name, *snap)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_wal_sample_folds_into_write_latency() {
        let wal = StubWal::default();
        wal.write_latency
            .lock()
            .push_back(SampleSummary::new(5, 1, 9, 25));
        let h = harness_with(Config::default(), wal);

        h.aggregator.tick();

        let pushed = h.pushed.lock();
        let dists = distribution_pushes(&pushed);
        let (_, write_latency) = dists.iter().find(|(n, _)| *n == "write_latency").unwrap();
        assert_eq!(write_latency.ops, 5);
        assert_eq!(write_latency.avg_time, 5); // 25 / 5
        assert_eq!(write_latency.min, 1);
        assert_eq!(write_latency.max, 9);
    }

    #[test]
    fn test_wal_pull_failure_skips_only_that_metric() {
        let wal = StubWal { fail_write_latency: true, ..Default::default() };
        let h = harness_with(Config::default(), wal);
        *h.reads.ops.lock() = 3;
        *h.reads.time.lock() = 9;

        h.aggregator.tick();

        let pushed = h.pushed.lock();
        let dists = distribution_pushes(&pushed);
        // All twelve distributions still pushed, record completed
        assert_eq!(dists.len(), 12);
        assert_eq!(*pushed.last().unwrap(), Pushed::Complete);
        let (_, read_latency) = dists.iter().find(|(n, _)| *n == "read_latency").unwrap();
        assert_eq!(read_latency.ops, 3);
        assert_eq!(read_latency.avg_time, 3);
    }

    #[test]
    fn test_zero_read_ops_skips_increment() {
        let h = harness();
        h.aggregator.tick();

        let pushed = h.pushed.lock();
        let dists = distribution_pushes(&pushed);
        let (_, read_latency) = dists.iter().find(|(n, _)| *n == "read_latency").unwrap();
        assert_eq!(*read_latency, DistributionSnapshot::default());
    }

    #[test]
    fn test_store_write_timings_guarded_by_ops() {
        let h = harness();
        *h.store.write_ops.lock() = 4;
        h.aggregator.tick();

        let pushed = h.pushed.lock();
        let dists = distribution_pushes(&pushed);
        let (_, memstore) = dists.iter().find(|(n, _)| *n == "memstore_insert_time").unwrap();
        assert_eq!(memstore.ops, 4);
        assert_eq!(memstore.avg_time, 2); // 8 / 4
        let (_, row_lock) = dists.iter().find(|(n, _)| *n == "row_lock_time").unwrap();
        assert_eq!(row_lock.ops, 4);
        assert_eq!(row_lock.avg_time, 1); // 4 / 4
    }

    #[test]
    fn test_push_order_is_stable() {
        let h = harness();
        h.aggregator.tick();
        let first: Vec<Pushed> = h.pushed.lock().drain(..).collect();
        h.aggregator.tick();
        let second: Vec<Pushed> = h.pushed.lock().drain(..).collect();

        let names = |pushes: &[Pushed]| -> Vec<&'static str> {
            pushes
                .iter()
                .map(|p| match p {
                    Pushed::Gauge(n, _) => *n,
                    Pushed::Rate(n, _) => *n,
                    Pushed::Distribution(n, _) => *n,
                    Pushed::Complete => "complete",
                })
                .collect()
        };
        assert_eq!(names(&first), names(&second));
        assert_eq!(names(&first).first(), Some(&"regions"));
        assert_eq!(names(&first).last(), Some(&"complete"));
    }

    #[test]
    fn test_requests_rate_positive_then_zero() {
        let h = harness();
        h.aggregator.increment_requests(10);
        h.aggregator.tick();
        assert!(h.aggregator.requests() > 0.0);

        h.aggregator.tick();
        assert_eq!(h.aggregator.requests(), 0.0);
    }

    #[test]
    fn test_add_flush_is_one_increment_per_pair() {
        let h = harness();
        h.aggregator.add_flush(&[(10, 100), (20, 200), (30, 300)]);
        h.aggregator.tick();

        let pushed = h.pushed.lock();
        let dists = distribution_pushes(&pushed);
        let (_, flush_time) = dists.iter().find(|(n, _)| *n == "flush_time").unwrap();
        assert_eq!(flush_time.ops, 3);
        assert_eq!(flush_time.avg_time, 20); // (10+20+30)/3
        assert_eq!(flush_time.min, 10);
        assert_eq!(flush_time.max, 30);
        let (_, flush_size) = dists.iter().find(|(n, _)| *n == "flush_size").unwrap();
        assert_eq!(flush_size.ops, 3);
        assert_eq!(flush_size.avg_time, 200);
    }

    #[test]
    fn test_add_compaction_feeds_both_accumulators() {
        let h = harness();
        h.aggregator.add_compaction(1200, 4096);
        let snapshot = h.aggregator.snapshot();
        assert_eq!(snapshot.compaction_time.ops, 1);
        assert_eq!(snapshot.compaction_time.avg_time, 1200);
        assert_eq!(snapshot.compaction_size.ops, 1);
        assert_eq!(snapshot.compaction_size.avg_time, 4096);
    }

    #[test]
    fn test_extended_reset_fires_after_period() {
        let config = Config::default().with_extended_period_secs(1);
        let h = harness_with(config, StubWal::default());
        h.aggregator.add_compaction(500, 1000);
        h.aggregator.tick();
        assert_eq!(h.aggregator.snapshot().compaction_time.ops, 1);

        std::thread::sleep(Duration::from_millis(1100));
        h.aggregator.tick();

        let snapshot = h.aggregator.snapshot();
        assert_eq!(snapshot.compaction_time.ops, 0);
        assert_eq!(snapshot.compaction_time.min, 0);
        assert_eq!(snapshot.compaction_time.max, 0);
    }

    #[test]
    fn test_zero_period_never_resets() {
        let wal = StubWal::default();
        wal.write_latency
            .lock()
            .push_back(SampleSummary::new(1, 7, 7, 7));
        let h = harness_with(Config::default(), wal);
        h.aggregator.tick();

        for _ in 0..5 {
            std::thread::sleep(Duration::from_millis(10));
            h.aggregator.tick();
        }

        let snapshot = h.aggregator.snapshot();
        assert_eq!(snapshot.write_latency.min, 7);
        assert_eq!(snapshot.write_latency.max, 7);
    }

    #[test]
    fn test_report_idempotent_and_harmless() {
        let h = harness();
        h.aggregator.set_regions(12);
        h.aggregator.set_memstore_size_mb(256);
        h.aggregator.increment_requests(5);

        let first = h.aggregator.report();
        let second = h.aggregator.report();
        assert_eq!(first, second);
        assert!(first.contains("regions=12"));
        assert!(first.contains("memstore_size_mb=256"));
        assert!(first.contains("used_heap_mb="));
        assert!(first.contains("max_heap_mb="));

        // Reading the report did not consume the pending request count
        h.aggregator.tick();
        assert!(h.aggregator.requests() > 0.0);
    }

    #[test]
    fn test_shutdown_idempotent_without_exporter() {
        let h = harness();
        h.aggregator.shutdown();
        h.aggregator.shutdown();
    }
}
