//! Report sinks: consumers of the periodic metric record

use tracing::info;

use crate::domain::DistributionSnapshot;

/// Receives one periodic record per push cycle. Values arrive in the
/// aggregator's declared order; `complete` marks the record done.
pub trait ReportSink {
    fn push_gauge(&mut self, name: &'static str, value: i64);
    fn push_rate(&mut self, name: &'static str, events_per_sec: f32);
    fn push_distribution(&mut self, name: &'static str, snapshot: DistributionSnapshot);
    fn complete(&mut self);
}

/// Sink that emits each completed record as one structured log line.
#[derive(Debug, Default)]
pub struct LogSink {
    fields: Vec<(&'static str, String)>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportSink for LogSink {
    fn push_gauge(&mut self, name: &'static str, value: i64) {
        self.fields.push((name, value.to_string()));
    }

    fn push_rate(&mut self, name: &'static str, events_per_sec: f32) {
        self.fields.push((name, format!("{events_per_sec:.1}")));
    }

    fn push_distribution(&mut self, name: &'static str, snapshot: DistributionSnapshot) {
        self.fields.push((
            name,
            format!(
                "ops={},avg={},min={},max={}",
                snapshot.ops, snapshot.avg_time, snapshot.min, snapshot.max
            ),
        ));
    }

    fn complete(&mut self) {
        let record = self
            .fields
            .drain(..)
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(" ");
        info!(%record, "metrics");
    }
}
