//! storenode-metrics - storage-node metrics engine demo
//!
//! Drives the aggregation engine against simulated storage subsystems so
//! the push cycle, log sink, and management exporter can be observed
//! without a real node.
//!
//! Module structure:
//! - `domain/` - Plain data types (sample summaries, snapshots)
//! - `io/` - External interfaces (sources, sinks, exporter)
//! - `services/` - Accumulator primitives and the aggregator
//! - `infra/` - Infrastructure (config, process memory sampling)

use anyhow::Result;
use clap::Parser;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use storenode_metrics::domain::SampleSummary;
use storenode_metrics::infra::Config;
use storenode_metrics::io::{FileReadStatsSource, LogSink, StoreWriteStatsSource, WalStatsSource};
use storenode_metrics::services::{MetricsAggregator, Tickable};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Storage-node metrics engine - simulated node harness
#[derive(Parser, Debug)]
#[command(name = "storenode-metrics", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/node.toml")]
    config: String,
}

/// WAL stand-in: synthesizes a small batch of appends per pull.
struct SimulatedWal {
    pulls: AtomicU64,
}

impl SimulatedWal {
    fn new() -> Self {
        Self { pulls: AtomicU64::new(0) }
    }

    fn summary(&self, spread: u64) -> SampleSummary {
        let seq = self.pulls.fetch_add(1, Ordering::Relaxed);
        let count = seq % 6 + 1;
        let min = 1 + seq % 3;
        let max = min + spread;
        let total = if count >= 2 {
            min + max + (count - 2) * (min + spread / 2)
        } else {
            min
        };
        SampleSummary::new(count, min, max, total)
    }
}

impl WalStatsSource for SimulatedWal {
    fn take_write_latency(&self) -> Result<SampleSummary> {
        Ok(self.summary(8))
    }
    fn take_write_size(&self) -> Result<SampleSummary> {
        Ok(self.summary(4096))
    }
    fn take_sync_latency(&self) -> Result<SampleSummary> {
        Ok(self.summary(12))
    }
    fn take_group_sync_latency(&self) -> Result<SampleSummary> {
        Ok(self.summary(20))
    }
}

/// File-read stand-in; idle every few pulls to exercise the zero-op skip.
struct SimulatedReads {
    pulls: AtomicU64,
    last_ops: AtomicU64,
}

impl SimulatedReads {
    fn new() -> Self {
        Self { pulls: AtomicU64::new(0), last_ops: AtomicU64::new(0) }
    }
}

impl FileReadStatsSource for SimulatedReads {
    fn take_read_ops(&self) -> Result<u64> {
        let ops = self.pulls.fetch_add(1, Ordering::Relaxed) % 5;
        self.last_ops.store(ops, Ordering::Relaxed);
        Ok(ops)
    }
    fn take_read_time(&self) -> Result<u64> {
        Ok(self.last_ops.load(Ordering::Relaxed) * 3)
    }
}

struct SimulatedStore {
    pulls: AtomicU64,
    last_ops: AtomicU64,
}

impl SimulatedStore {
    fn new() -> Self {
        Self { pulls: AtomicU64::new(0), last_ops: AtomicU64::new(0) }
    }
}

impl StoreWriteStatsSource for SimulatedStore {
    fn take_write_ops(&self) -> Result<u64> {
        let ops = (self.pulls.fetch_add(1, Ordering::Relaxed) % 4) * 10;
        self.last_ops.store(ops, Ordering::Relaxed);
        Ok(ops)
    }
    fn take_memstore_insert_time(&self) -> Result<u64> {
        Ok(self.last_ops.load(Ordering::Relaxed) * 2)
    }
    fn take_row_lock_time(&self) -> Result<u64> {
        Ok(self.last_ops.load(Ordering::Relaxed))
    }
    fn take_concurrency_wait_time(&self) -> Result<u64> {
        Ok(self.last_ops.load(Ordering::Relaxed) / 2)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Structured logging, level configurable via RUST_LOG
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!("storenode-metrics starting");

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        node_id = %config.node_id(),
        interval_secs = %config.metrics_interval_secs(),
        extended_period_secs = %config.extended_period_secs(),
        exporter_port = %config.exporter_port(),
        "config_loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let aggregator = Arc::new(MetricsAggregator::new(
        &config,
        Arc::new(SimulatedWal::new()),
        Arc::new(SimulatedReads::new()),
        Arc::new(SimulatedStore::new()),
        Box::new(LogSink::new()),
    ));

    aggregator.attach_exporter(config.exporter_port());

    // Simulated producers: request traffic plus occasional compactions
    // and flushes
    let producer = aggregator.clone();
    let mut producer_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_millis(200));
        let mut rounds: u64 = 0;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    rounds += 1;
                    producer.increment_requests(rounds % 17 + 1);
                    producer.set_regions(12);
                    producer.set_stores(40);
                    producer.set_storefiles(160);
                    producer.set_memstore_size_mb((rounds % 64) as i64);
                    producer.set_compaction_queue_size((rounds % 3) as i64);
                    if rounds % 25 == 0 {
                        producer.add_compaction(900 + rounds % 300, 64 << 20);
                    }
                    if rounds % 40 == 0 {
                        producer.add_flush(&[(35, 8 << 20), (42, 12 << 20)]);
                    }
                }
                _ = producer_shutdown.changed() => {
                    if *producer_shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    });

    // The periodic scheduler: drives the registered tickable once per
    // push interval
    let tickable: Arc<dyn Tickable> = aggregator.clone();
    let mut tick_shutdown = shutdown_rx.clone();
    let tick_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(tick_interval));
        loop {
            tokio::select! {
                _ = interval.tick() => tickable.tick(),
                _ = tick_shutdown.changed() => {
                    if *tick_shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    });

    tokio::signal::ctrl_c().await.ok();
    info!("shutdown_signal_received");
    aggregator.shutdown();
    let _ = shutdown_tx.send(true);

    info!(report = %aggregator.report(), "final_report");
    info!("storenode-metrics shutdown complete");
    Ok(())
}
