//! Flat collective algorithms over a connected [`Context`].

use crate::{context::Context, error::Result};

/// A collective operation jointly executed by every participant of its context.
pub trait Algorithm {
    /// Runs one instance of the collective, blocking until this participant's part is done.
    fn run(&mut self) -> Result<()>;
}

/// Fixed-size value that can travel over a pair as little-endian bytes.
pub trait Element: Copy + Default + PartialEq + std::fmt::Debug {
    const SIZE: usize;
    fn write_le(&self, out: &mut [u8]);
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                fn write_le(&self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(bytes);
                    <$t>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_element!(u64, i64, f32, f64);

//=================
// Broadcast

/// Root sends its buffer directly to every other participant.
pub struct BroadcastOneToAll<T: Element> {
    context: Context,
    root: usize,
    buffer: Vec<T>,
    wire: Vec<u8>,
}

impl<T: Element> BroadcastOneToAll<T> {
    pub fn new(context: Context, root: usize, count: usize) -> Self {
        Self {
            context,
            root,
            buffer: vec![T::default(); count],
            wire: vec![0u8; count * T::SIZE],
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn buffer(&self) -> &[T] {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut [T] {
        &mut self.buffer
    }
}

impl<T: Element> Algorithm for BroadcastOneToAll<T> {
    fn run(&mut self) -> Result<()> {
        let rank = self.context.rank();
        if rank == self.root {
            for (v, chunk) in self.buffer.iter().zip(self.wire.chunks_exact_mut(T::SIZE)) {
                v.write_le(chunk);
            }
            for peer in (0..self.context.size()).filter(|&p| p != self.root) {
                self.context.pair(peer)?.send(&self.wire)?;
            }
        } else {
            self.context.pair(self.root)?.recv(&mut self.wire)?;
            for (v, chunk) in self.buffer.iter_mut().zip(self.wire.chunks_exact(T::SIZE)) {
                *v = T::read_le(chunk);
            }
        }
        log::trace!(
            "[{}] broadcast of {} elements done on rank {rank}",
            self.context.namespace(),
            self.buffer.len()
        );
        Ok(())
    }
}

//=================
// Barrier

/// Every participant checks in with rank 0, which releases them once all have arrived.
pub struct BarrierAllToOne {
    context: Context,
}

impl BarrierAllToOne {
    const ROOT: usize = 0;

    pub fn new(context: Context) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }
}

impl Algorithm for BarrierAllToOne {
    fn run(&mut self) -> Result<()> {
        let mut token = [0u8; 1];
        if self.context.rank() == Self::ROOT {
            for peer in 1..self.context.size() {
                self.context.pair(peer)?.recv(&mut token)?;
            }
            for peer in 1..self.context.size() {
                self.context.pair(peer)?.send(&token)?;
            }
        } else {
            let root = self.context.pair(Self::ROOT)?;
            root.send(&token)?;
            root.recv(&mut token)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_encoding() {
        let mut buf = [0u8; 8];
        (-42i64).write_le(&mut buf);
        assert_eq!(i64::read_le(&buf), -42);

        let mut buf = [0u8; 4];
        1.5f32.write_le(&mut buf);
        assert_eq!(f32::read_le(&buf), 1.5);
        assert_eq!(<f32 as Element>::SIZE, 4);
        assert_eq!(<u64 as Element>::SIZE, 8);
    }

    #[test]
    fn single_participant_collectives_are_local() {
        let mut bcast = BroadcastOneToAll::<u64>::new(Context::new(0, 1, "t-0"), 0, 1);
        bcast.buffer_mut()[0] = 7;
        bcast.run().unwrap();
        assert_eq!(bcast.buffer(), &[7]);

        let mut barrier = BarrierAllToOne::new(Context::new(0, 1, "t-1"));
        barrier.run().unwrap();
    }

    #[test]
    fn unconnected_context_is_rejected() {
        let mut barrier = BarrierAllToOne::new(Context::new(1, 2, "t-0"));
        assert!(matches!(
            barrier.run(),
            Err(crate::Error::NotConnected(0))
        ));
    }
}
