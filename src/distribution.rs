//! Latency samples and per-iteration timing.

use crate::error::Result;
use hdrhistogram::Histogram;
use std::time::Instant;

/// Highest latency the histogram tracks before auto-resizing: 60 seconds.
const HIST_HIGH_NANOS: u64 = 60 * 1000 * 1000 * 1000;

/// Significant figures kept by the histogram.
const HIST_SIGFIG: u8 = 3;

/// Collection of latency samples in nanoseconds.
///
/// Backed by an auto-resizing [`Histogram`]. The smallest and largest samples are kept exactly;
/// quantiles come from histogram buckets clamped to that range, so an interior quantile is within
/// one part in a thousand of a recorded sample and the extremes are exact.
#[derive(Clone, Debug)]
pub struct Distribution {
    hist: Histogram<u64>,
    min_nanos: Option<u64>,
    max_nanos: Option<u64>,
}

impl Distribution {
    pub fn new() -> Result<Self> {
        let mut hist = Histogram::<u64>::new_with_bounds(1, HIST_HIGH_NANOS, HIST_SIGFIG)?;
        hist.auto(true);
        Ok(Self {
            hist,
            min_nanos: None,
            max_nanos: None,
        })
    }

    pub fn add(&mut self, nanos: u64) -> Result<()> {
        self.hist.record(nanos)?;
        self.min_nanos = Some(self.min_nanos.map_or(nanos, |m| m.min(nanos)));
        self.max_nanos = Some(self.max_nanos.map_or(nanos, |m| m.max(nanos)));
        Ok(())
    }

    /// Records the time elapsed since `timer` was started.
    pub fn add_elapsed(&mut self, timer: &Timer) -> Result<()> {
        self.add(timer.elapsed_nanos())
    }

    /// Value at quantile `p` in `[0.0, 1.0]`; `0` when empty.
    pub fn percentile(&self, p: f64) -> u64 {
        match (self.min_nanos, self.max_nanos) {
            (Some(min), Some(max)) => self.hist.value_at_quantile(p).clamp(min, max),
            _ => 0,
        }
    }

    /// Smallest recorded value, exactly, or `None` when empty.
    pub fn min(&self) -> Option<u64> {
        self.min_nanos
    }

    /// Largest recorded value, exactly, or `None` when empty.
    pub fn max(&self) -> Option<u64> {
        self.max_nanos
    }

    pub fn len(&self) -> u64 {
        self.hist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hist.is_empty()
    }

    pub fn clear(&mut self) {
        self.hist.reset();
        self.min_nanos = None;
        self.max_nanos = None;
    }

    pub(crate) fn histogram(&self) -> &Histogram<u64> {
        &self.hist
    }
}

/// Wall-clock stopwatch for a single repetition.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_nanos(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}
