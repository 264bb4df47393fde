use crate::Distribution;

/// Common summary statistics of a size point's samples, in nanoseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub count: u64,
    pub mean: f64,
    pub stdev: f64,
    pub min: u64,
    pub median: u64,
    pub p90: u64,
    pub p99: u64,
    pub max: u64,
}

impl SummaryStats {
    /// Computes summary statistics from the given distribution. All fields are zero when it is
    /// empty.
    pub fn new(dist: &Distribution) -> Self {
        let hist = dist.histogram();
        if hist.is_empty() {
            return Self::empty();
        }
        Self {
            count: hist.len(),
            mean: hist.mean(),
            stdev: hist.stdev(),
            min: dist.min().unwrap_or(0),
            median: dist.percentile(0.50),
            p90: dist.percentile(0.90),
            p99: dist.percentile(0.99),
            max: dist.max().unwrap_or(0),
        }
    }

    fn empty() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            stdev: 0.0,
            min: 0,
            median: 0,
            p90: 0,
            p99: 0,
            max: 0,
        }
    }
}

/// Computes a [`SummaryStats`] from a [`Distribution`].
pub fn summary_stats(dist: &Distribution) -> SummaryStats {
    SummaryStats::new(dist)
}
