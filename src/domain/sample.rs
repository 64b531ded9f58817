//! Pre-aggregated sample summaries handed over by measurement sources

/// Summary of every operation a source observed since its previous read.
///
/// Sources reset their own window once read, so a summary is consumed
/// exactly once and covers exactly the span between two pulls.
/// `count == 0` means nothing was observed; the other fields are
/// meaningless in that case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleSummary {
    /// Operations observed in the window
    pub count: u64,
    /// Smallest single-operation value in the window
    pub min: u64,
    /// Largest single-operation value in the window
    pub max: u64,
    /// Sum over all operations in the window
    pub total: u64,
}

impl SampleSummary {
    pub fn new(count: u64, min: u64, max: u64, total: u64) -> Self {
        Self { count, min, max, total }
    }

    /// A window in which nothing was observed.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
