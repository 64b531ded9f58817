//! Scalar metrics: settable gauges and per-interval rate counters

use std::time::Duration;

/// Settable point-in-time scalar. Read on every push, never reset.
#[derive(Debug)]
pub struct Gauge {
    name: &'static str,
    value: i64,
}

impl Gauge {
    pub fn new(name: &'static str) -> Self {
        Self { name, value: 0 }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn set(&mut self, value: i64) {
        self.value = value;
    }

    pub fn get(&self) -> i64 {
        self.value
    }
}

/// Counts events within a push interval and publishes events/sec for the
/// interval that just closed.
#[derive(Debug)]
pub struct RateCounter {
    name: &'static str,
    count: u64,
    prev_rate: f32,
}

impl RateCounter {
    pub fn new(name: &'static str) -> Self {
        Self { name, count: 0, prev_rate: 0.0 }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn inc(&mut self, n: u64) {
        self.count += n;
    }

    /// Close the interval: compute events/sec over `elapsed` and start a
    /// fresh window. A zero elapsed is treated as one second so the rate
    /// is always finite.
    pub fn roll(&mut self, elapsed: Duration) -> f32 {
        let secs = elapsed.as_secs_f32();
        let secs = if secs > 0.0 { secs } else { 1.0 };
        self.prev_rate = self.count as f32 / secs;
        self.count = 0;
        self.prev_rate
    }

    pub fn previous_interval_rate(&self) -> f32 {
        self.prev_rate
    }
}
