//! Rendezvous store on a Redis server, for deployments that already run one.

use crate::{
    error::{Error, Result},
    store::{Store, DEFAULT_STORE_TIMEOUT},
};
use redis::{Client, Connection};
use std::{
    sync::Mutex,
    thread,
    time::{Duration, Instant},
};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Keys map to plain Redis strings: `set` is `SET`, `get` polls `GET` until the key appears and
/// `delete` is `DEL`. Requests are serialized over a single connection.
pub struct RedisStore {
    conn: Mutex<Connection>,
    timeout: Duration,
}

impl RedisStore {
    /// Connects to `host:port`, retrying until [`DEFAULT_STORE_TIMEOUT`] elapses so that
    /// participants may start before the server does.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        Self::connect_with_timeout(host, port, DEFAULT_STORE_TIMEOUT)
    }

    /// Like [`Self::connect`]; `timeout` bounds both the connect retries and every `get`.
    pub fn connect_with_timeout(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let url = format!("redis://{host}:{port}/");
        let client = Client::open(url.as_str()).map_err(|e| Error::store("<connect>", e))?;
        let deadline = Instant::now() + timeout;
        loop {
            match client.get_connection() {
                Ok(conn) => {
                    log::debug!("connected to redis rendezvous store at {url}");
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        timeout,
                    });
                }
                Err(e) if Instant::now() < deadline => {
                    log::trace!("redis at {url} not reachable yet: {e}");
                    thread::sleep(CONNECT_RETRY_INTERVAL);
                }
                Err(e) => return Err(Error::store("<connect>", e)),
            }
        }
    }

    fn query<T: redis::FromRedisValue>(&self, key: &str, cmd: &redis::Cmd) -> Result<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| Error::store(key, "connection mutex poisoned"))?;
        cmd.query(&mut *conn).map_err(|e| Error::store(key, e))
    }
}

impl Store for RedisStore {
    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.query(key, redis::cmd("SET").arg(key).arg(value))
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let value: Option<Vec<u8>> = self.query(key, redis::cmd("GET").arg(key))?;
            if let Some(value) = value {
                return Ok(value);
            }
            if Instant::now() >= deadline {
                return Err(Error::StoreTimeout(key.to_owned()));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        let _removed: i64 = self.query(key, redis::cmd("DEL").arg(key))?;
        Ok(())
    }
}
