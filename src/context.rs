//! Participant groups and the factory that namespaces their rendezvous.

use crate::{
    config::Config,
    error::{Error, Result},
    store::{PrefixStore, Store},
    transport::{Device, Pair},
};
use std::sync::Arc;

/// A group of `size` participants connected pairwise over one transport.
#[derive(Debug)]
pub struct Context {
    rank: usize,
    size: usize,
    namespace: String,
    pairs: Vec<Option<Pair>>,
}

impl Context {
    /// Creates an unconnected context; see [`Self::connect_full_mesh`].
    pub fn new(rank: usize, size: usize, namespace: impl Into<String>) -> Self {
        Self {
            rank,
            size,
            namespace: namespace.into(),
            pairs: (0..size).map(|_| None).collect(),
        }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Rendezvous namespace this context connected under.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Connects to every other participant. Each rank publishes its listener address under its
    /// own rank, dials every lower rank and accepts one connection from every higher rank.
    /// Blocks until all pairs exist, then withdraws the published address.
    pub fn connect_full_mesh(&mut self, store: &dyn Store, device: &Device) -> Result<()> {
        if self.size <= 1 {
            return Ok(());
        }

        let listener = device.listen()?;
        let addr = listener.local_addr()?;
        store.set(&self.rank.to_string(), addr.to_string().as_bytes())?;
        log::debug!(
            "[{}] rank {} listening on {addr}",
            self.namespace,
            self.rank
        );

        for peer in 0..self.rank {
            let raw = store.get(&peer.to_string())?;
            let peer_addr = String::from_utf8(raw)
                .map_err(|e| Error::store(&peer.to_string(), e))?;
            let pair = device.connect(self.rank, peer, &peer_addr)?;
            log::trace!("[{}] connected to rank {peer}", self.namespace);
            self.pairs[peer] = Some(pair);
        }

        for _ in self.rank + 1..self.size {
            let pair = device.accept(&listener)?;
            let peer = pair.peer();
            if peer <= self.rank || peer >= self.size {
                return Err(Error::Handshake(format!(
                    "rank {} accepted unexpected rank {peer}",
                    self.rank
                )));
            }
            if self.pairs[peer].is_some() {
                return Err(Error::Handshake(format!(
                    "rank {} accepted rank {peer} twice",
                    self.rank
                )));
            }
            self.pairs[peer] = Some(pair);
            log::trace!("[{}] accepted rank {peer}", self.namespace);
        }

        // Every higher rank has dialed in, so nobody reads this rank's address again. Removing
        // it keeps a later run under the same namespace from dialing a dead listener.
        store.delete(&self.rank.to_string())?;

        log::debug!("[{}] full mesh connected", self.namespace);
        Ok(())
    }

    /// Connection to `peer`.
    ///
    /// # Errors
    /// [`Error::NotConnected`] if the mesh has not been connected or `peer` is this rank.
    pub fn pair(&self, peer: usize) -> Result<&Pair> {
        self.pairs
            .get(peer)
            .and_then(Option::as_ref)
            .ok_or(Error::NotConnected(peer))
    }
}

/// Creates connected contexts, each under a fresh rendezvous namespace.
///
/// Owns the prefix counter: every call to [`Self::create`] consumes one counter value, whether
/// or not the connect succeeds, so no namespace is ever reused within a driver.
pub struct ContextFactory {
    rank: usize,
    size: usize,
    prefix: String,
    counter: u64,
    store: Arc<dyn Store>,
    device: Device,
}

impl ContextFactory {
    pub fn new(config: &Config, store: Arc<dyn Store>, device: Device) -> Self {
        Self {
            rank: config.rank,
            size: config.size,
            prefix: config.prefix.clone(),
            counter: 0,
            store,
            device,
        }
    }

    /// Number of namespaces handed out so far.
    pub fn created(&self) -> u64 {
        self.counter
    }

    fn next_namespace(&mut self) -> String {
        let ns = format!("{}-{}", self.prefix, self.counter);
        self.counter += 1;
        ns
    }

    pub fn create(&mut self) -> Result<Context> {
        let namespace = self.next_namespace();
        let store = PrefixStore::new(namespace.clone(), self.store.clone());
        let mut context = Context::new(self.rank, self.size, namespace);
        context.connect_full_mesh(&store, &self.device)?;
        Ok(context)
    }
}
