//! Participant entry point. Launch one process per rank, all with the same arguments except
//! `--rank`; rank 0 prints the latency table.

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use collective_bench::{
    parse_duration, BarrierBenchmark, Benchmark, BroadcastBenchmark, Config, Context, StoreConfig,
    TransportConfig, DEFAULT_REDIS_PORT, DEFAULT_STORE_PORT,
};
use std::{path::PathBuf, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    Tcp,
    Redis,
    File,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "snake_case")]
enum BenchmarkKind {
    BroadcastOneToAll,
    BarrierAllToOne,
}

/// Measures collective operation latency across participants.
#[derive(Parser, Debug)]
#[command(name = "collective_bench", version, about)]
struct Args {
    /// Operation to benchmark.
    #[arg(value_enum)]
    benchmark: BenchmarkKind,

    /// Transport device.
    #[arg(long, default_value = "tcp")]
    transport: String,

    /// Address that this participant listens on and advertises to its peers.
    #[arg(long, default_value = "127.0.0.1")]
    hostname: String,

    #[arg(long, default_value_t = 0)]
    rank: usize,

    /// Number of participants.
    #[arg(long)]
    size: usize,

    /// Prefix of the rendezvous namespaces; must differ between concurrent runs.
    #[arg(long, default_value = "prefix")]
    prefix: String,

    /// Kind of rendezvous store.
    #[arg(long, value_enum, default_value_t = StoreKind::Tcp)]
    store: StoreKind,

    /// Host of the rendezvous server (tcp or redis).
    #[arg(long, default_value = "127.0.0.1")]
    store_host: String,

    /// Port of the rendezvous server; defaults to 29500 for tcp and 6379 for redis.
    #[arg(long)]
    store_port: Option<u16>,

    /// Shared directory used by the file store. Addresses are removed once each group has
    /// connected; a run that aborted mid-connect may leave some behind, so use a fresh
    /// --prefix or clear the directory before rerunning.
    #[arg(long, required_if_eq("store", "file"))]
    store_path: Option<PathBuf>,

    /// Benchmark only this element count instead of the 1..5M sweep.
    #[arg(long)]
    elements: Option<usize>,

    /// Timed iterations per element count; overrides --iteration-time.
    #[arg(long)]
    iteration_count: Option<u64>,

    /// Target time per element count, e.g. 2s or 500ms.
    #[arg(long, default_value = "2s", value_parser = parse_duration)]
    iteration_time: Duration,

    #[arg(long, default_value_t = 5)]
    warmup_iters: u64,

    /// Check the result of one untimed run before timing.
    #[arg(long)]
    verify: bool,
}

impl Args {
    fn config(&self) -> anyhow::Result<Config> {
        let store = match self.store {
            StoreKind::Tcp => StoreConfig::Tcp {
                host: self.store_host.clone(),
                port: self.store_port.unwrap_or(DEFAULT_STORE_PORT),
            },
            StoreKind::Redis => StoreConfig::Redis {
                host: self.store_host.clone(),
                port: self.store_port.unwrap_or(DEFAULT_REDIS_PORT),
            },
            StoreKind::File => StoreConfig::File {
                path: self
                    .store_path
                    .clone()
                    .context("--store-path is required for the file store")?,
            },
        };
        Ok(Config {
            transport: TransportConfig {
                name: self.transport.clone(),
                hostname: self.hostname.clone(),
            },
            rank: self.rank,
            size: self.size,
            prefix: self.prefix.clone(),
            store,
            elements: self.elements,
            iteration_count: self.iteration_count,
            iteration_time: Some(self.iteration_time),
            warmup_iteration_count: self.warmup_iters,
            verify: self.verify,
        })
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = args.config()?;
    log::info!(
        "rank {}/{} running {:?} with prefix `{}`",
        config.rank,
        config.size,
        args.benchmark,
        config.prefix
    );

    let mut runner = collective_bench::Runner::new(config)
        .context("failed to initialize benchmark driver")?;

    let kind = args.benchmark;
    let mut factory = move |context: Context| -> collective_bench::Result<Box<dyn Benchmark>> {
        let benchmark: Box<dyn Benchmark> = match kind {
            BenchmarkKind::BroadcastOneToAll => Box::new(BroadcastBenchmark::new(context)),
            BenchmarkKind::BarrierAllToOne => Box::new(BarrierBenchmark::new(context)),
        };
        Ok(benchmark)
    };

    if let Err(e) = runner.run(&mut factory) {
        log::error!("rank {} aborting ({:?}): {e}", args.rank, e.category());
        return Err(e).with_context(|| format!("{kind:?} benchmark aborted"));
    }
    Ok(())
}
