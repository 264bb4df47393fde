//! Rendezvous store served over TCP.
//!
//! Frames are length-prefixed: a request is an opcode byte (`1` set, `2` get, `3` delete), a
//! `u32` key length and the key, followed for `set` by a `u32` value length and the value. A response is a status byte and,
//! for a successful `get`, a `u32` length and the value. Integers are little-endian.

use crate::{
    error::{Error, Result},
    store::{MemoryStore, Store, DEFAULT_STORE_TIMEOUT},
};
use std::{
    io::{self, Read, Write},
    net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs},
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

const OP_SET: u8 = 1;
const OP_GET: u8 = 2;
const OP_DELETE: u8 = 3;

const STATUS_OK: u8 = 0;
const STATUS_TIMEOUT: u8 = 1;

/// Upper bound on key and value sizes accepted by the server.
const MAX_FRAME_LEN: u32 = 1 << 20;

const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

fn write_bytes(w: &mut impl Write, bytes: &[u8]) -> io::Result<()> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame too large"))?;
    w.write_all(&len.to_le_bytes())?;
    w.write_all(bytes)
}

fn read_bytes(r: &mut impl Read) -> io::Result<Vec<u8>> {
    let mut len = [0u8; 4];
    r.read_exact(&mut len)?;
    let len = u32::from_le_bytes(len);
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {len} bytes exceeds limit"),
        ));
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_u8(r: &mut impl Read) -> io::Result<u8> {
    let mut b = [0u8; 1];
    r.read_exact(&mut b)?;
    Ok(b[0])
}

//=================
// Client

/// Client of a [`StoreServer`]. Requests are serialized over a single connection.
pub struct TcpStore {
    stream: Mutex<TcpStream>,
}

impl TcpStore {
    /// Connects to the server at `addr`, retrying until [`DEFAULT_STORE_TIMEOUT`] elapses so that
    /// participants may start before the server does.
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let addrs: Vec<SocketAddr> = addr.to_socket_addrs()?.collect();
        let deadline = Instant::now() + DEFAULT_STORE_TIMEOUT;
        loop {
            match TcpStream::connect(&addrs[..]) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    log::debug!("connected to rendezvous store at {:?}", stream.peer_addr());
                    return Ok(Self {
                        stream: Mutex::new(stream),
                    });
                }
                Err(e) if Instant::now() < deadline => {
                    log::trace!("rendezvous store not reachable yet: {e}");
                    thread::sleep(CONNECT_RETRY_INTERVAL);
                }
                Err(e) => return Err(Error::store("<connect>", e)),
            }
        }
    }

    fn request(
        &self,
        key: &str,
        f: impl FnOnce(&mut TcpStream) -> io::Result<Vec<u8>>,
    ) -> Result<Vec<u8>> {
        let mut stream = self
            .stream
            .lock()
            .map_err(|_| Error::store(key, "connection mutex poisoned"))?;
        f(&mut stream).map_err(|e| {
            if e.kind() == io::ErrorKind::TimedOut {
                Error::StoreTimeout(key.to_owned())
            } else {
                Error::store(key, e)
            }
        })
    }
}

fn check_status(status: u8) -> io::Result<()> {
    match status {
        STATUS_OK => Ok(()),
        STATUS_TIMEOUT => Err(io::Error::new(io::ErrorKind::TimedOut, "key not set in time")),
        other => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unexpected status {other}"),
        )),
    }
}

impl Store for TcpStore {
    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.request(key, |s| {
            s.write_all(&[OP_SET])?;
            write_bytes(s, key.as_bytes())?;
            write_bytes(s, value)?;
            check_status(read_u8(s)?)?;
            Ok(Vec::new())
        })?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.request(key, |s| {
            s.write_all(&[OP_GET])?;
            write_bytes(s, key.as_bytes())?;
            check_status(read_u8(s)?)?;
            read_bytes(s)
        })
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.request(key, |s| {
            s.write_all(&[OP_DELETE])?;
            write_bytes(s, key.as_bytes())?;
            check_status(read_u8(s)?)?;
            Ok(Vec::new())
        })?;
        Ok(())
    }
}

//=================
// Server

/// Serves a [`MemoryStore`] to [`TcpStore`] clients, one thread per connection.
pub struct StoreServer {
    listener: TcpListener,
    store: Arc<MemoryStore>,
}

impl StoreServer {
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        Self::bind_with_timeout(addr, DEFAULT_STORE_TIMEOUT)
    }

    /// Binds with a custom wait timeout for `get` requests.
    pub fn bind_with_timeout(addr: impl ToSocketAddrs, timeout: Duration) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self {
            listener,
            store: Arc::new(MemoryStore::with_timeout(timeout)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts clients until the listener fails.
    pub fn serve(self) -> Result<()> {
        log::info!("rendezvous store listening on {}", self.listener.local_addr()?);
        for stream in self.listener.incoming() {
            let stream = stream?;
            let store = self.store.clone();
            thread::spawn(move || {
                let peer = stream.peer_addr().ok();
                if let Err(e) = handle_client(stream, &store) {
                    if e.kind() != io::ErrorKind::UnexpectedEof {
                        log::warn!("rendezvous client {peer:?} failed: {e}");
                    }
                }
            });
        }
        Ok(())
    }

    /// Runs [`Self::serve`] on a background thread.
    pub fn spawn(self) -> Result<SocketAddr> {
        let addr = self.local_addr()?;
        thread::spawn(move || {
            if let Err(e) = self.serve() {
                log::error!("rendezvous store stopped: {e}");
            }
        });
        Ok(addr)
    }
}

fn handle_client(mut stream: TcpStream, store: &MemoryStore) -> io::Result<()> {
    stream.set_nodelay(true)?;
    loop {
        let op = read_u8(&mut stream)?;
        let key = read_bytes(&mut stream)?;
        let key = String::from_utf8(key)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        match op {
            OP_SET => {
                let value = read_bytes(&mut stream)?;
                log::trace!("set {key}");
                store
                    .set(&key, &value)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
                stream.write_all(&[STATUS_OK])?;
            }
            OP_GET => match store.get(&key) {
                Ok(value) => {
                    stream.write_all(&[STATUS_OK])?;
                    write_bytes(&mut stream, &value)?;
                }
                Err(Error::StoreTimeout(_)) => stream.write_all(&[STATUS_TIMEOUT])?,
                Err(e) => return Err(io::Error::new(io::ErrorKind::Other, e.to_string())),
            },
            OP_DELETE => {
                log::trace!("delete {key}");
                store
                    .delete(&key)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
                stream.write_all(&[STATUS_OK])?;
            }
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unknown opcode {other}"),
                ))
            }
        }
    }
}
