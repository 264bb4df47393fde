//! Rendezvous store over a directory shared by all participants, e.g. on NFS.

use crate::{
    error::{Error, Result},
    store::{Store, DEFAULT_STORE_TIMEOUT},
};
use std::{
    fmt::Write as _,
    fs, io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
    thread,
    time::{Duration, Instant},
};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Process-wide, so that stores opened on the same directory never share a temporary file.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct FileStore {
    path: PathBuf,
    timeout: Duration,
}

impl FileStore {
    /// Opens the store rooted at `path`, creating the directory if needed.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_timeout(path, DEFAULT_STORE_TIMEOUT)
    }

    pub fn with_timeout(path: impl AsRef<Path>, timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;
        Ok(Self { path, timeout })
    }

    /// File names are the hex encoding of the key, so keys may contain `/`.
    fn object_path(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len() * 2);
        for b in key.bytes() {
            let _ = write!(name, "{b:02x}");
        }
        self.path.join(name)
    }
}

impl Store for FileStore {
    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let target = self.object_path(key);
        let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .path
            .join(format!(".tmp-{}-{}", std::process::id(), n));
        fs::write(&tmp, value).map_err(|e| Error::store(key, e))?;
        fs::rename(&tmp, &target).map_err(|e| Error::store(key, e))?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let target = self.object_path(key);
        let deadline = Instant::now() + self.timeout;
        loop {
            match fs::read(&target) {
                Ok(value) => return Ok(value),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::store(key, e)),
            }
            if Instant::now() >= deadline {
                return Err(Error::StoreTimeout(key.to_owned()));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.object_path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(Error::store(key, e)),
            _ => Ok(()),
        }
    }
}
