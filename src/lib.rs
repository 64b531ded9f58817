//! Storage-node metrics aggregation engine
//!
//! Collects operational measurements from the node's subsystems (WAL,
//! file-read layer, in-memory store, compaction and flush jobs) and rolls
//! them into a coherent record on a fixed push cadence.
//!
//! Module structure:
//! - `domain/` - Plain data types (sample summaries, snapshots)
//! - `io/` - External interfaces (measurement sources, report sinks, exporter)
//! - `services/` - Accumulator primitives and the aggregator
//! - `infra/` - Infrastructure (config, process memory sampling)

pub mod domain;
pub mod infra;
pub mod io;
pub mod services;
