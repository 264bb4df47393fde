//! Hosts the TCP rendezvous store that `collective_bench` participants connect to.

use anyhow::Context as _;
use clap::Parser;
use collective_bench::{parse_duration, StoreServer, DEFAULT_STORE_PORT};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "rendezvous_server", version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value_t = format!("0.0.0.0:{DEFAULT_STORE_PORT}"))]
    bind: String,

    /// How long a lookup waits for its key before reporting a timeout.
    #[arg(long, default_value = "30s", value_parser = parse_duration)]
    timeout: Duration,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let server = StoreServer::bind_with_timeout(&args.bind, args.timeout)
        .with_context(|| format!("cannot bind {}", args.bind))?;
    server.serve()?;
    Ok(())
}
