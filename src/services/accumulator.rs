//! Distribution accumulators
//!
//! Running count/min/max/total trackers over per-operation timing or
//! sizing data. The regular [`Distribution`] rolls its interval window on
//! every push; the [`PersistentDistribution`] keeps publishing the same
//! window until an extended reset. Historical extremes are tracked over
//! the per-operation averages fed in, never over raw samples.

use thiserror::Error;

use crate::domain::DistributionSnapshot;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccumulatorError {
    /// An increment must carry at least one operation: a zero-op update
    /// has no per-operation value to feed the extremes.
    #[error("increment on `{0}` called with zero ops")]
    ZeroOps(&'static str),
}

/// Min/max over the per-operation averages an accumulator has seen since
/// its last extremes reset. After a reset the next observed value becomes
/// both the new min and the new max.
#[derive(Debug, Clone, Copy, Default)]
struct Extremes {
    seen: bool,
    min: u64,
    max: u64,
}

impl Extremes {
    fn update(&mut self, value: u64) {
        if self.seen {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        } else {
            self.seen = true;
            self.min = value;
            self.max = value;
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn min(&self) -> u64 {
        if self.seen {
            self.min
        } else {
            0
        }
    }

    fn max(&self) -> u64 {
        if self.seen {
            self.max
        } else {
            0
        }
    }
}

/// Running tracker for one distribution-style measurement.
///
/// Tracks the current push interval, the previously closed interval,
/// lifetime totals, and historical extremes. [`Distribution::roll`]
/// closes the interval window; totals and extremes survive it.
#[derive(Debug)]
pub struct Distribution {
    name: &'static str,
    interval_ops: u64,
    interval_time: u64,
    prev_ops: u64,
    prev_time: u64,
    total_ops: u64,
    total_time: u64,
    extremes: Extremes,
}

impl Distribution {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            interval_ops: 0,
            interval_time: 0,
            prev_ops: 0,
            prev_time: 0,
            total_ops: 0,
            total_time: 0,
            extremes: Extremes::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Fold `ops` operations taking `time` (milliseconds or bytes,
    /// depending on the metric) into the current interval. The
    /// per-operation average becomes a candidate historical extreme.
    /// Rejects `ops == 0` before touching any state.
    pub fn increment(&mut self, ops: u64, time: u64) -> Result<(), AccumulatorError> {
        if ops == 0 {
            return Err(AccumulatorError::ZeroOps(self.name));
        }
        self.interval_ops += ops;
        self.interval_time += time;
        self.total_ops += ops;
        self.total_time += time;
        self.extremes.update(time / ops);
        Ok(())
    }

    /// Average per-operation value over the previously closed interval.
    pub fn previous_interval_average(&self) -> u64 {
        if self.prev_ops == 0 {
            0
        } else {
            self.prev_time / self.prev_ops
        }
    }

    /// Close the current interval and return what a push publishes.
    pub fn roll(&mut self) -> DistributionSnapshot {
        self.prev_ops = self.interval_ops;
        self.prev_time = self.interval_time;
        self.interval_ops = 0;
        self.interval_time = 0;
        self.snapshot()
    }

    /// Last-pushed view; does not touch any window.
    pub fn snapshot(&self) -> DistributionSnapshot {
        DistributionSnapshot {
            ops: self.prev_ops,
            avg_time: self.previous_interval_average(),
            min: self.extremes.min(),
            max: self.extremes.max(),
        }
    }

    /// Clear the historical extremes only; intervals and totals are
    /// untouched.
    pub fn reset_extremes(&mut self) {
        self.extremes.reset();
    }

    pub fn total_ops(&self) -> u64 {
        self.total_ops
    }

    pub fn total_time(&self) -> u64 {
        self.total_time
    }
}

/// Distribution whose published window and extremes survive ordinary
/// pushes. Only [`PersistentDistribution::reset_window`] (the extended
/// reset) clears them; lifetime totals are never cleared.
#[derive(Debug)]
pub struct PersistentDistribution {
    name: &'static str,
    window_ops: u64,
    window_time: u64,
    total_ops: u64,
    total_time: u64,
    extremes: Extremes,
}

impl PersistentDistribution {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            window_ops: 0,
            window_time: 0,
            total_ops: 0,
            total_time: 0,
            extremes: Extremes::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Same contract as [`Distribution::increment`]: `ops == 0` is
    /// rejected before any state changes.
    pub fn increment(&mut self, ops: u64, time: u64) -> Result<(), AccumulatorError> {
        if ops == 0 {
            return Err(AccumulatorError::ZeroOps(self.name));
        }
        self.window_ops += ops;
        self.window_time += time;
        self.total_ops += ops;
        self.total_time += time;
        self.extremes.update(time / ops);
        Ok(())
    }

    /// Published view: average over the current long-lived window plus
    /// the extremes. Pushing does not roll anything.
    pub fn snapshot(&self) -> DistributionSnapshot {
        let avg_time = if self.window_ops == 0 {
            0
        } else {
            self.window_time / self.window_ops
        };
        DistributionSnapshot {
            ops: self.window_ops,
            avg_time,
            min: self.extremes.min(),
            max: self.extremes.max(),
        }
    }

    /// Extended reset: clears the window and the extremes. Lifetime
    /// totals are untouched.
    pub fn reset_window(&mut self) {
        self.window_ops = 0;
        self.window_time = 0;
        self.extremes.reset();
    }

    pub fn total_ops(&self) -> u64 {
        self.total_ops
    }

    pub fn total_time(&self) -> u64 {
        self.total_time
    }
}
