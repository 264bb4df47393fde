mod common;

use collective_bench::{Benchmark, Config, Context, MemoryStore, Result, Runner, Store};
use common::{participant_config, run_participants, Probe, ProbeBenchmark, SharedBuffer};
use std::sync::Arc;

#[test]
fn single_participant_fixed_count() {
    let out = SharedBuffer::default();
    let config = Config {
        elements: Some(1000),
        iteration_count: Some(100),
        verify: false,
        ..participant_config(0, 1)
    };
    let mut runner = Runner::with_store(config, Arc::new(MemoryStore::new()))
        .unwrap()
        .with_output(out.clone());

    let probe = Arc::new(Probe::default());
    let mut factory = {
        let probe = probe.clone();
        move |context: Context| -> Result<Box<dyn Benchmark>> {
            Ok(Box::new(ProbeBenchmark::new(context, probe.clone())))
        }
    };

    let points = runner.run(&mut factory).unwrap();

    assert_eq!(points.len(), 1, "one size point");
    let point = &points[0];
    assert_eq!(point.elements, 1000);
    assert_eq!(point.plan.iterations, 100);
    assert_eq!(point.plan.agreed_min_nanos, None, "sizing protocol skipped");
    assert_eq!(point.stats.count, 100);

    // Fixed count means no warmup and no verification run.
    assert_eq!(probe.runs(), 100);
    assert_eq!(probe.initialized(), vec![1000]);

    // Two coordination contexts plus one for the size point.
    assert_eq!(runner.contexts_created(), 3);

    let lines = out.lines();
    assert_eq!(lines.len(), 2, "header and one row: {lines:?}");
    let row: Vec<&str> = lines[1].split_whitespace().collect();
    assert_eq!(row.len(), 6);
    assert_eq!(row[0], "1000");
    assert_eq!(row[5], "100");
}

#[test]
fn every_participant_runs_exactly_k_iterations() {
    let size = 3;
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());

    let results = run_participants(size, move |rank| {
        let out = SharedBuffer::default();
        let config = Config {
            elements: Some(64),
            iteration_count: Some(25),
            ..participant_config(rank, size)
        };
        let mut runner = Runner::with_store(config, store.clone())
            .unwrap()
            .with_output(out.clone());

        let probe = Arc::new(Probe::default());
        let mut factory = {
            let probe = probe.clone();
            // Warmup delays would skew an adaptive count; a fixed count must ignore them.
            move |context: Context| -> Result<Box<dyn Benchmark>> {
                let delay = std::time::Duration::from_micros(50 * (rank as u64 + 1));
                Ok(Box::new(
                    ProbeBenchmark::new(context, probe.clone()).with_delay(delay),
                ))
            }
        };
        let points = runner.run(&mut factory).unwrap();
        (points, probe.runs(), out.contents())
    });

    for (rank, (points, runs, output)) in results.iter().enumerate() {
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].stats.count, 25, "rank {rank} samples");
        assert_eq!(*runs, 25, "rank {rank} runs");
        if rank == 0 {
            assert_eq!(output.lines().count(), 2);
        } else {
            assert!(output.is_empty(), "rank {rank} must not print");
        }
    }
}
