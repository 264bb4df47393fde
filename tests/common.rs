#![allow(dead_code)]

use collective_bench::{Benchmark, Config, Context, Result, StoreConfig};
use std::{
    io::{self, Write},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

/// Runs `f` once per rank, each on its own thread, and returns the results in rank order.
pub fn run_participants<T, F>(size: usize, f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(usize) -> T + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let handles: Vec<_> = (0..size)
        .map(|rank| {
            let f = f.clone();
            thread::spawn(move || f(rank))
        })
        .collect();
    handles
        .into_iter()
        .map(|h| h.join().expect("participant thread panicked"))
        .collect()
}

/// Default configuration for `rank` of `size`.
pub fn participant_config(rank: usize, size: usize) -> Config {
    Config {
        rank,
        size,
        prefix: "test".to_owned(),
        ..Config::default()
    }
}

pub fn file_store_config(path: &std::path::Path) -> StoreConfig {
    StoreConfig::File {
        path: path.to_path_buf(),
    }
}

/// Report sink whose contents can be read after the runner is done with it.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Counts what the driver does with a benchmark.
#[derive(Default)]
pub struct Probe {
    runs: AtomicU64,
    initialized: Mutex<Vec<usize>>,
}

impl Probe {
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn initialized(&self) -> Vec<usize> {
        self.initialized.lock().unwrap().clone()
    }
}

/// Local-only benchmark that sleeps for `delay` per run.
pub struct ProbeBenchmark {
    _context: Context,
    probe: Arc<Probe>,
    delay: Duration,
    verifies: bool,
}

impl ProbeBenchmark {
    pub fn new(context: Context, probe: Arc<Probe>) -> Self {
        Self {
            _context: context,
            probe,
            delay: Duration::ZERO,
            verifies: true,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_verification(mut self) -> Self {
        self.verifies = false;
        self
    }
}

impl Benchmark for ProbeBenchmark {
    fn initialize(&mut self, elements: usize) -> Result<()> {
        self.probe.initialized.lock().unwrap().push(elements);
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        self.probe.runs.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        Ok(())
    }

    fn verify(&self) -> bool {
        self.verifies
    }
}
