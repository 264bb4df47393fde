//! Benchmark driver: sweeps element counts, sizes iterations, times runs and reports.

use crate::{
    benchmark::{Benchmark, BenchmarkFactory},
    collectives::{Algorithm, BarrierAllToOne, BroadcastOneToAll},
    config::{Config, StoreConfig},
    context::ContextFactory,
    distribution::{Distribution, Timer},
    error::{Error, Result},
    file_store::FileStore,
    redis_store::RedisStore,
    report,
    store::Store,
    summary_stats::{summary_stats, SummaryStats},
    tcp_store::TcpStore,
    transport::Device,
};
use std::{
    io::{self, Write},
    sync::Arc,
};

/// Root of the coordination broadcast.
const SYNC_ROOT: usize = 0;

/// How many timed iterations a size point runs, and how that was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationPlan {
    pub iterations: u64,
    /// Fastest warmup iteration observed locally, when warmup ran.
    pub local_min_nanos: Option<u64>,
    /// Warmup minimum adopted from the broadcast root, when warmup ran.
    pub agreed_min_nanos: Option<u64>,
}

impl IterationPlan {
    fn fixed(iterations: u64) -> Self {
        Self {
            iterations,
            local_min_nanos: None,
            agreed_min_nanos: None,
        }
    }
}

/// Outcome of one size point, available on every participant.
#[derive(Debug, Clone)]
pub struct SizePoint {
    pub elements: usize,
    pub plan: IterationPlan,
    pub stats: SummaryStats,
}

/// Element counts of the default sweep: 1, 2, 5, 10, 20, 50, ..., 5,000,000.
pub fn sweep_sizes() -> Vec<usize> {
    std::iter::successors(Some(1usize), |m| Some(m * 10))
        .take_while(|&m| m <= 1_000_000)
        .flat_map(|m| [m, 2 * m, 5 * m])
        .collect()
}

/// Opens the store named by the configuration.
pub fn connect_store(cfg: &StoreConfig) -> Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match cfg {
        StoreConfig::Tcp { host, port } => Arc::new(TcpStore::connect((host.as_str(), *port))?),
        StoreConfig::Redis { host, port } => Arc::new(RedisStore::connect(host, *port)?),
        StoreConfig::File { path } => Arc::new(FileStore::new(path)?),
    };
    Ok(store)
}

/// Drives a benchmark across size points in lockstep with the other participants.
pub struct Runner {
    config: Config,
    contexts: ContextFactory,
    broadcast: BroadcastOneToAll<u64>,
    barrier: BarrierAllToOne,
    samples: Distribution,
    out: Box<dyn Write + Send>,
}

impl Runner {
    /// Connects to the configured rendezvous store and initializes the driver.
    pub fn new(config: Config) -> Result<Self> {
        let store = connect_store(&config.store)?;
        Self::with_store(config, store)
    }

    /// Initializes the driver over an already opened rendezvous store: resolves the transport
    /// and builds the coordination broadcast and barrier, each over its own context. Blocks until
    /// every participant has done the same.
    pub fn with_store(config: Config, store: Arc<dyn Store>) -> Result<Self> {
        config.validate()?;
        let device = Device::resolve(&config.transport)?;
        let mut contexts = ContextFactory::new(&config, store, device);

        let broadcast = BroadcastOneToAll::new(contexts.create()?, SYNC_ROOT, 1);
        let barrier = BarrierAllToOne::new(contexts.create()?);
        log::debug!(
            "rank {}/{} initialized coordination contexts",
            config.rank,
            config.size
        );

        Ok(Self {
            config,
            contexts,
            broadcast,
            barrier,
            samples: Distribution::new()?,
            out: Box::new(io::stdout()),
        })
    }

    /// Sends the report table to `out` instead of stdout.
    pub fn with_output(mut self, out: impl Write + Send + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of contexts created so far, coordination contexts included.
    pub fn contexts_created(&self) -> u64 {
        self.contexts.created()
    }

    /// Runs the fixed element count if one is configured, the full sweep otherwise.
    pub fn run<F: BenchmarkFactory>(&mut self, factory: &mut F) -> Result<Vec<SizePoint>> {
        if self.config.is_coordinator() {
            report::write_header(&mut self.out)?;
        }

        let sizes = match self.config.fixed_elements() {
            Some(n) => vec![n],
            None => sweep_sizes(),
        };

        let mut points = Vec::with_capacity(sizes.len());
        for n in sizes {
            points.push(self.run_size(factory, n)?);
        }
        Ok(points)
    }

    /// Runs a single size point of `elements` elements.
    pub fn run_size<F: BenchmarkFactory>(
        &mut self,
        factory: &mut F,
        elements: usize,
    ) -> Result<SizePoint> {
        let context = self.contexts.create()?;
        let mut benchmark = factory(context)?;
        benchmark.initialize(elements)?;

        if self.config.verify {
            benchmark.run()?;
            if !benchmark.verify() {
                return Err(Error::Verification { elements });
            }
        }

        let plan = self.plan_iterations(benchmark.as_mut())?;

        self.samples.clear();
        for _ in 0..plan.iterations {
            let timer = Timer::start();
            benchmark.run()?;
            self.samples.add_elapsed(&timer)?;
        }

        let stats = summary_stats(&self.samples);
        if self.config.is_coordinator() {
            report::write_row(&mut self.out, elements, &stats)?;
            self.out.flush()?;
        }

        // Nobody may start the next size point's rendezvous until everybody is done with this
        // one's context.
        self.barrier.run()?;
        drop(benchmark);

        Ok(SizePoint {
            elements,
            plan,
            stats,
        })
    }

    /// Decides how many timed iterations to run. A configured fixed count wins; otherwise every
    /// participant runs the warmup, rank 0's fastest warmup iteration is broadcast, and the
    /// target time divided by that minimum becomes the count on every participant.
    pub fn plan_iterations(&mut self, benchmark: &mut dyn Benchmark) -> Result<IterationPlan> {
        if let Some(k) = self.config.fixed_iteration_count() {
            return Ok(IterationPlan::fixed(k));
        }

        let target = self
            .config
            .iteration_time
            .filter(|t| !t.is_zero())
            .ok_or_else(|| {
                Error::config("an iteration time is required when no iteration count is set")
            })?;
        if self.config.warmup_iteration_count == 0 {
            return Err(Error::config(
                "warmup iteration count must be positive when no iteration count is set",
            ));
        }

        let mut warmup = Distribution::new()?;
        for _ in 0..self.config.warmup_iteration_count {
            let timer = Timer::start();
            benchmark.run()?;
            warmup.add_elapsed(&timer)?;
        }
        let local_min = warmup
            .min()
            .ok_or_else(|| Error::Histogram("empty warmup distribution".to_owned()))?;

        let agreed_min = self.broadcast_value(local_min)?;
        let target_nanos = u64::try_from(target.as_nanos()).unwrap_or(u64::MAX);
        let iterations = target_nanos / agreed_min.max(1);
        log::debug!(
            "rank {}: warmup min {local_min} ns, agreed {agreed_min} ns, {iterations} iterations",
            self.config.rank
        );

        Ok(IterationPlan {
            iterations,
            local_min_nanos: Some(local_min),
            agreed_min_nanos: Some(agreed_min),
        })
    }

    /// Broadcasts `value` from rank 0; returns rank 0's value on every participant.
    fn broadcast_value(&mut self, value: u64) -> Result<u64> {
        self.broadcast.buffer_mut()[0] = value;
        self.broadcast.run()?;
        Ok(self.broadcast.buffer()[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::Context, store::MemoryStore};
    use std::{cell::Cell, rc::Rc, time::Duration};

    struct Noop {
        _context: Context,
        runs: Rc<Cell<u64>>,
    }

    impl Benchmark for Noop {
        fn initialize(&mut self, _elements: usize) -> Result<()> {
            Ok(())
        }

        fn run(&mut self) -> Result<()> {
            self.runs.set(self.runs.get() + 1);
            Ok(())
        }

        fn verify(&self) -> bool {
            true
        }
    }

    fn runner(config: Config) -> Runner {
        Runner::with_store(config, Arc::new(MemoryStore::new()))
            .unwrap()
            .with_output(io::sink())
    }

    #[test]
    fn sweep_has_21_ascending_sizes() {
        let sizes = sweep_sizes();
        assert_eq!(sizes.len(), 21);
        assert_eq!(&sizes[..6], &[1, 2, 5, 10, 20, 50]);
        assert_eq!(&sizes[18..], &[1_000_000, 2_000_000, 5_000_000]);
        assert!(sizes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn coordination_contexts_use_first_namespaces() {
        let r = runner(Config::default());
        assert_eq!(r.broadcast.context().namespace(), "prefix-0");
        assert_eq!(r.barrier.context().namespace(), "prefix-1");
        assert_eq!(r.contexts_created(), 2);
    }

    #[test]
    fn fixed_count_skips_warmup() {
        let mut r = runner(Config {
            iteration_count: Some(7),
            ..Config::default()
        });
        let runs = Rc::new(Cell::new(0));
        let mut b = Noop {
            _context: Context::new(0, 1, "t"),
            runs: runs.clone(),
        };
        let plan = r.plan_iterations(&mut b).unwrap();
        assert_eq!(plan, IterationPlan::fixed(7));
        assert_eq!(runs.get(), 0);
    }

    #[test]
    fn adaptive_sizing_runs_warmup() {
        let mut r = runner(Config {
            iteration_time: Some(Duration::from_millis(1)),
            warmup_iteration_count: 3,
            ..Config::default()
        });
        let runs = Rc::new(Cell::new(0));
        let mut b = Noop {
            _context: Context::new(0, 1, "t"),
            runs: runs.clone(),
        };
        let plan = r.plan_iterations(&mut b).unwrap();
        assert_eq!(runs.get(), 3);
        assert_eq!(plan.local_min_nanos, plan.agreed_min_nanos);
        let agreed = plan.agreed_min_nanos.unwrap().max(1);
        assert_eq!(plan.iterations, 1_000_000 / agreed);
    }

    #[test]
    fn missing_iteration_time_is_a_config_error() {
        let mut r = runner(Config {
            iteration_time: None,
            ..Config::default()
        });
        let mut b = Noop {
            _context: Context::new(0, 1, "t"),
            runs: Rc::new(Cell::new(0)),
        };
        assert!(matches!(r.plan_iterations(&mut b), Err(Error::Config(_))));

        let mut r = runner(Config {
            iteration_time: Some(Duration::ZERO),
            ..Config::default()
        });
        assert!(matches!(r.plan_iterations(&mut b), Err(Error::Config(_))));
    }

    #[test]
    fn unknown_transport_fails_initialization() {
        let cfg = Config {
            transport: crate::TransportConfig {
                name: "carrier-pigeon".to_owned(),
                ..Default::default()
            },
            ..Config::default()
        };
        let err = Runner::with_store(cfg, Arc::new(MemoryStore::new())).err();
        assert!(matches!(err, Some(Error::UnknownTransport(_))));
    }
}
