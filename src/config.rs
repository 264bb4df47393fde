//! Driver configuration.

use crate::error::{Error, Result};
use std::{path::PathBuf, time::Duration};

/// Default port of the TCP rendezvous store.
pub const DEFAULT_STORE_PORT: u16 = 29500;

/// Default port of a Redis rendezvous store.
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// Selects and parameterizes the transport device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Transport selector, e.g. `tcp`.
    pub name: String,
    /// Host name or address that listeners bind to and advertise to peers.
    pub hostname: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            name: "tcp".to_owned(),
            hostname: "127.0.0.1".to_owned(),
        }
    }
}

/// Location of the shared rendezvous store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// A [`crate::StoreServer`] reachable over TCP.
    Tcp { host: String, port: u16 },
    /// A Redis server.
    Redis { host: String, port: u16 },
    /// A directory visible to every participant.
    File { path: PathBuf },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Tcp {
            host: "127.0.0.1".to_owned(),
            port: DEFAULT_STORE_PORT,
        }
    }
}

/// Immutable per-process settings of a benchmark run.
#[derive(Debug, Clone)]
pub struct Config {
    pub transport: TransportConfig,
    /// This participant's rank, in `0..size`.
    pub rank: usize,
    /// Number of participants.
    pub size: usize,
    /// Prefix of every rendezvous namespace created by the driver.
    pub prefix: String,
    pub store: StoreConfig,
    /// Run only this element count instead of the logarithmic sweep.
    pub elements: Option<usize>,
    /// Run exactly this many timed iterations per size; `None` or `Some(0)` selects the
    /// adaptive sizing protocol.
    pub iteration_count: Option<u64>,
    /// Target wall time per size point for adaptive sizing.
    pub iteration_time: Option<Duration>,
    pub warmup_iteration_count: u64,
    /// Run and check one untimed iteration before timing.
    pub verify: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            rank: 0,
            size: 1,
            prefix: "prefix".to_owned(),
            store: StoreConfig::default(),
            elements: None,
            iteration_count: None,
            iteration_time: Some(Duration::from_secs(2)),
            warmup_iteration_count: 5,
            verify: false,
        }
    }
}

impl Config {
    /// Checks participant identity and naming. Sizing parameters are checked when the sizing
    /// protocol needs them.
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::config("size must be positive"));
        }
        if self.rank >= self.size {
            return Err(Error::config(format!(
                "rank {} out of range for size {}",
                self.rank, self.size
            )));
        }
        if self.prefix.is_empty() {
            return Err(Error::config("prefix must not be empty"));
        }
        Ok(())
    }

    /// Fixed iteration count, if one greater than zero is configured.
    pub fn fixed_iteration_count(&self) -> Option<u64> {
        self.iteration_count.filter(|&k| k > 0)
    }

    /// Fixed element count, if one greater than zero is configured.
    pub fn fixed_elements(&self) -> Option<usize> {
        self.elements.filter(|&n| n > 0)
    }

    pub fn is_coordinator(&self) -> bool {
        self.rank == 0
    }
}

/// Parses durations such as `2s`, `500ms`, `750us` or `100ns`. A bare number is taken as
/// seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| Error::config(format!("invalid duration `{s}`")))?;
    let d = match unit {
        "" | "s" => Duration::from_secs(value),
        "ms" => Duration::from_millis(value),
        "us" => Duration::from_micros(value),
        "ns" => Duration::from_nanos(value),
        _ => return Err(Error::config(format!("unknown duration unit in `{s}`"))),
    };
    Ok(d)
}
