mod common;

use collective_bench::{
    Algorithm, BarrierAllToOne, BroadcastOneToAll, Config, ContextFactory, Device, MemoryStore,
    Store, TransportConfig,
};
use common::{participant_config, run_participants};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

fn context_factory(config: &Config, store: Arc<dyn Store>) -> ContextFactory {
    let device = Device::resolve(&TransportConfig::default()).unwrap();
    ContextFactory::new(config, store, device)
}

#[test]
fn broadcast_delivers_root_buffer() {
    let size = 3;
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());

    let buffers = run_participants(size, move |rank| {
        let config = participant_config(rank, size);
        let mut contexts = context_factory(&config, store.clone());
        let mut bcast = BroadcastOneToAll::<i64>::new(contexts.create().unwrap(), 0, 256);
        if rank == 0 {
            for (i, v) in bcast.buffer_mut().iter_mut().enumerate() {
                *v = -(i as i64);
            }
        }
        bcast.run().unwrap();
        bcast.buffer().to_vec()
    });

    let expected: Vec<i64> = (0..256).map(|i| -i).collect();
    for (rank, buffer) in buffers.iter().enumerate() {
        assert_eq!(buffer, &expected, "rank {rank}");
    }
}

#[test]
fn broadcast_from_non_zero_root() {
    let size = 2;
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());

    let buffers = run_participants(size, move |rank| {
        let config = participant_config(rank, size);
        let mut contexts = context_factory(&config, store.clone());
        let mut bcast = BroadcastOneToAll::<f64>::new(contexts.create().unwrap(), 1, 4);
        if rank == 1 {
            bcast.buffer_mut().copy_from_slice(&[0.5, 1.5, 2.5, 3.5]);
        }
        bcast.run().unwrap();
        bcast.buffer().to_vec()
    });

    assert_eq!(buffers[0], buffers[1]);
    assert_eq!(buffers[0], [0.5, 1.5, 2.5, 3.5]);
}

#[test]
fn barrier_holds_everyone_until_the_last_arrival() {
    let size = 4;
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let arrived = Arc::new(AtomicUsize::new(0));

    let seen = run_participants(size, move |rank| {
        let config = participant_config(rank, size);
        let mut contexts = context_factory(&config, store.clone());
        let mut barrier = BarrierAllToOne::new(contexts.create().unwrap());

        if rank == size - 1 {
            thread::sleep(Duration::from_millis(50));
        }
        arrived.fetch_add(1, Ordering::SeqCst);
        barrier.run().unwrap();
        arrived.load(Ordering::SeqCst)
    });

    for (rank, n) in seen.iter().enumerate() {
        assert_eq!(*n, size, "rank {rank} left the barrier early");
    }
}
