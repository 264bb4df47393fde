//! Fixed-width latency table printed by the coordinating participant.

use crate::SummaryStats;
use std::io::{self, Write};

const COLUMN_WIDTH: usize = 11;

const HEADER: [&str; 6] = [
    "elements", "min (us)", "p50 (us)", "p90 (us)", "p99 (us)", "samples",
];

pub fn write_header(out: &mut impl Write) -> io::Result<()> {
    for label in HEADER {
        write!(out, "{label:>w$}", w = COLUMN_WIDTH)?;
    }
    writeln!(out)
}

/// Writes one row; latencies are truncated to whole microseconds.
pub fn write_row(out: &mut impl Write, elements: usize, stats: &SummaryStats) -> io::Result<()> {
    let micros = [stats.min, stats.median, stats.p90, stats.p99].map(|ns| ns / 1000);
    write!(out, "{elements:>w$}", w = COLUMN_WIDTH)?;
    for us in micros {
        write!(out, "{us:>w$}", w = COLUMN_WIDTH)?;
    }
    writeln!(out, "{:>w$}", stats.count, w = COLUMN_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let mut out = Vec::new();
        write_header(&mut out).unwrap();
        let line = String::from_utf8(out).unwrap();
        assert_eq!(
            line,
            "   elements   min (us)   p50 (us)   p90 (us)   p99 (us)    samples\n"
        );
    }

    #[test]
    fn row_truncates_to_micros() {
        let stats = SummaryStats {
            count: 100,
            mean: 0.0,
            stdev: 0.0,
            min: 1_999,
            median: 2_500,
            p90: 9_999,
            p99: 12_000,
            max: 20_000,
        };
        let mut out = Vec::new();
        write_row(&mut out, 1000, &stats).unwrap();
        let line = String::from_utf8(out).unwrap();
        let cols: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(cols, ["1000", "1", "2", "9", "12", "100"]);
        assert_eq!(line.len(), 6 * COLUMN_WIDTH + 1);
    }

    #[test]
    fn single_sample_row_repeats_the_sample() {
        let mut dist = crate::Distribution::new().unwrap();
        dist.add(130_999).unwrap();
        let mut out = Vec::new();
        write_row(&mut out, 1, &crate::summary_stats(&dist)).unwrap();
        let line = String::from_utf8(out).unwrap();
        let cols: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(cols, ["1", "130", "130", "130", "130", "1"]);
    }
}
