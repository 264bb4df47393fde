//! Rendezvous key-value stores used to exchange endpoint addresses while a context connects.

use crate::error::{Error, Result};
use std::{
    collections::HashMap,
    sync::{Arc, Condvar, Mutex},
    time::{Duration, Instant},
};

/// How long a `get` waits for a key before giving up.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared key-value service for peer discovery.
pub trait Store: Send + Sync {
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Returns the value of `key`, blocking until some participant sets it or the store's
    /// timeout expires.
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Removes `key`; removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<()>;
}

/// View of a shared store that confines all keys to one namespace.
pub struct PrefixStore {
    prefix: String,
    inner: Arc<dyn Store>,
}

impl PrefixStore {
    pub fn new(prefix: impl Into<String>, inner: Arc<dyn Store>) -> Self {
        Self {
            prefix: prefix.into(),
            inner,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}/{}", self.prefix, key)
    }
}

impl Store for PrefixStore {
    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.inner.set(&self.scoped(key), value)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.inner.get(&self.scoped(key))
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(&self.scoped(key))
    }
}

/// In-process store. Also backs [`crate::StoreServer`].
pub struct MemoryStore {
    data: Mutex<HashMap<String, Vec<u8>>>,
    changed: Condvar,
    timeout: Duration,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_STORE_TIMEOUT)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
            changed: Condvar::new(),
            timeout,
        }
    }

    /// Number of keys currently set.
    pub fn len(&self) -> Result<usize> {
        self.data
            .lock()
            .map(|d| d.len())
            .map_err(|_| Error::store("<len>", "store mutex poisoned"))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Store for MemoryStore {
    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut data = self
            .data
            .lock()
            .map_err(|_| Error::store(key, "store mutex poisoned"))?;
        data.insert(key.to_owned(), value.to_vec());
        self.changed.notify_all();
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let deadline = Instant::now() + self.timeout;
        let mut data = self
            .data
            .lock()
            .map_err(|_| Error::store(key, "store mutex poisoned"))?;
        loop {
            if let Some(value) = data.get(key) {
                return Ok(value.clone());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(Error::StoreTimeout(key.to_owned()));
            }
            data = self
                .changed
                .wait_timeout(data, deadline - now)
                .map_err(|_| Error::store(key, "store mutex poisoned"))?
                .0;
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.data
            .lock()
            .map_err(|_| Error::store(key, "store mutex poisoned"))?
            .remove(key);
        Ok(())
    }
}
