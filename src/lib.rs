//! Measures the latency distribution of collective operations across networked participants.
//!
//! Every participant runs the same [`Runner`] with its own rank. For each element count the
//! participants connect a fresh [`Context`] under a unique rendezvous namespace, agree on a shared
//! iteration count, time that many runs of a [`Benchmark`] and meet at a barrier before moving on.
//! Rank 0 prints one row of latency percentiles per element count.
//!
//! Latencies are recorded in **nanoseconds** in [hdrhistogram](https://crates.io/crates/hdrhistogram)
//! histograms and reported in whole microseconds.
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
pub use error::*;

mod config;
pub use config::*;

mod distribution;
pub use distribution::*;

mod summary_stats;
pub use summary_stats::*;

mod store;
pub use store::*;

mod file_store;
pub use file_store::*;

mod tcp_store;
pub use tcp_store::*;

mod redis_store;
pub use redis_store::*;

mod transport;
pub use transport::*;

mod context;
pub use context::*;

mod collectives;
pub use collectives::*;

mod benchmark;
pub use benchmark::*;

pub mod report;

mod runner;
pub use runner::*;
