//! Process memory sampling for the textual report

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use sysinfo::{Pid, System};

use crate::domain::HeapUsage;

const MB: u64 = 1024 * 1024;

/// Readings are held for at least this long, so back-to-back reports see
/// the same numbers.
const REFRESH_FLOOR: Duration = Duration::from_secs(1);

/// Samples process resident memory and total system memory.
pub struct HeapSampler {
    inner: Mutex<Sampler>,
}

struct Sampler {
    system: System,
    pid: Option<Pid>,
    taken_at: Option<Instant>,
    cached: HeapUsage,
}

impl HeapSampler {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Sampler {
                system: System::new(),
                pid: sysinfo::get_current_pid().ok(),
                taken_at: None,
                cached: HeapUsage::default(),
            }),
        }
    }

    /// Current used/max memory in megabytes. Used is this process's
    /// resident set; max is total system memory.
    pub fn usage(&self) -> HeapUsage {
        let mut sampler = self.inner.lock();
        let fresh = sampler
            .taken_at
            .is_some_and(|taken| taken.elapsed() < REFRESH_FLOOR);
        if fresh {
            return sampler.cached;
        }

        sampler.system.refresh_memory();
        let used = match sampler.pid {
            Some(pid) => {
                sampler.system.refresh_process(pid);
                sampler
                    .system
                    .process(pid)
                    .map(|process| process.memory())
                    .unwrap_or(0)
            }
            None => sampler.system.used_memory(),
        };
        let max = sampler.system.total_memory();

        sampler.cached = HeapUsage { used_mb: used / MB, max_mb: max / MB };
        sampler.taken_at = Some(Instant::now());
        sampler.cached
    }
}

impl Default for HeapSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consecutive_readings_identical() {
        let sampler = HeapSampler::new();
        let first = sampler.usage();
        let second = sampler.usage();
        assert_eq!(first, second);
    }

    #[test]
    fn test_max_is_nonzero() {
        let sampler = HeapSampler::new();
        let usage = sampler.usage();
        assert!(usage.max_mb > 0);
        assert!(usage.used_mb <= usage.max_mb);
    }
}
