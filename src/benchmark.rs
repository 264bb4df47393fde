//! Benchmarked operations.

use crate::{
    collectives::{Algorithm, BarrierAllToOne, BroadcastOneToAll},
    context::Context,
    error::{Error, Result},
};

/// One benchmarked operation, bound to the context it runs over.
pub trait Benchmark {
    /// Prepares buffers for `elements` elements.
    fn initialize(&mut self, elements: usize) -> Result<()>;

    /// Executes the operation once.
    fn run(&mut self) -> Result<()>;

    /// Checks the result of the last [`Self::run`].
    fn verify(&self) -> bool;
}

/// Creates a benchmark for each size point, taking ownership of that size point's context.
pub trait BenchmarkFactory: FnMut(Context) -> Result<Box<dyn Benchmark>> {}

impl<F> BenchmarkFactory for F where F: FnMut(Context) -> Result<Box<dyn Benchmark>> {}

//=================
// Broadcast

/// Broadcasts `f32` values from rank 0.
pub struct BroadcastBenchmark {
    context: Option<Context>,
    algorithm: Option<BroadcastOneToAll<f32>>,
}

impl BroadcastBenchmark {
    pub const ROOT: usize = 0;

    /// Initial value of non-root buffers; never a valid index.
    const UNSET: f32 = -1.0;

    pub fn new(context: Context) -> Self {
        Self {
            context: Some(context),
            algorithm: None,
        }
    }
}

impl Benchmark for BroadcastBenchmark {
    fn initialize(&mut self, elements: usize) -> Result<()> {
        let context = self
            .context
            .take()
            .ok_or_else(|| Error::config("broadcast benchmark initialized twice"))?;
        let is_root = context.rank() == Self::ROOT;
        let mut algorithm = BroadcastOneToAll::new(context, Self::ROOT, elements);
        for (i, v) in algorithm.buffer_mut().iter_mut().enumerate() {
            *v = if is_root { i as f32 } else { Self::UNSET };
        }
        self.algorithm = Some(algorithm);
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        match self.algorithm.as_mut() {
            Some(algorithm) => algorithm.run(),
            None => Err(Error::config("broadcast benchmark run before initialize")),
        }
    }

    fn verify(&self) -> bool {
        self.algorithm.as_ref().is_some_and(|a| {
            a.buffer()
                .iter()
                .enumerate()
                .all(|(i, v)| *v == i as f32)
        })
    }
}

//=================
// Barrier

/// Times the all-to-one barrier. The element count has no effect.
pub struct BarrierBenchmark {
    algorithm: BarrierAllToOne,
}

impl BarrierBenchmark {
    pub fn new(context: Context) -> Self {
        Self {
            algorithm: BarrierAllToOne::new(context),
        }
    }
}

impl Benchmark for BarrierBenchmark {
    fn initialize(&mut self, _elements: usize) -> Result<()> {
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        self.algorithm.run()
    }

    fn verify(&self) -> bool {
        true
    }
}
