//! Transport devices and point-to-point pairs.

use crate::{
    config::TransportConfig,
    error::{Error, Result},
};
use std::{
    io::{Read, Write},
    net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs},
};

/// A transport device, resolved once per driver and shared by every context it connects.
#[derive(Debug, Clone)]
pub enum Device {
    Tcp(TcpDevice),
}

impl Device {
    /// Resolves the device named by `cfg.name`.
    ///
    /// # Errors
    /// [`Error::UnknownTransport`] if the name is not recognized.
    pub fn resolve(cfg: &TransportConfig) -> Result<Self> {
        match cfg.name.as_str() {
            "tcp" => Ok(Device::Tcp(TcpDevice::new(&cfg.hostname)?)),
            other => Err(Error::UnknownTransport(other.to_owned())),
        }
    }

    /// Opens a listener whose address peers can connect to.
    pub(crate) fn listen(&self) -> Result<TcpListener> {
        match self {
            Device::Tcp(d) => d.listen(),
        }
    }

    /// Connects to the listener that `peer` advertised at `addr`, announcing `rank` as the
    /// caller's identity.
    pub(crate) fn connect(&self, rank: usize, peer: usize, addr: &str) -> Result<Pair> {
        match self {
            Device::Tcp(_) => {
                let stream = TcpStream::connect(addr).map_err(|e| Error::transport(peer, e))?;
                let pair = Pair::new(peer, stream)?;
                pair.send(&(rank as u32).to_le_bytes())?;
                Ok(pair)
            }
        }
    }

    /// Accepts one connection and reads the rank the dialing peer announced.
    pub(crate) fn accept(&self, listener: &TcpListener) -> Result<Pair> {
        let (mut stream, from) = listener.accept()?;
        let mut hello = [0u8; 4];
        stream
            .read_exact(&mut hello)
            .map_err(|e| Error::Handshake(format!("no rank received from {from}: {e}")))?;
        let peer = u32::from_le_bytes(hello) as usize;
        Pair::new(peer, stream)
    }
}

/// TCP device bound to one local interface.
#[derive(Debug, Clone)]
pub struct TcpDevice {
    addr: SocketAddr,
}

impl TcpDevice {
    pub fn new(hostname: &str) -> Result<Self> {
        let addr = (hostname, 0)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| Error::config(format!("cannot resolve hostname `{hostname}`")))?;
        Ok(Self { addr })
    }

    fn listen(&self) -> Result<TcpListener> {
        Ok(TcpListener::bind(self.addr)?)
    }
}

/// Connected, bidirectional byte channel to one peer.
#[derive(Debug)]
pub struct Pair {
    peer: usize,
    stream: TcpStream,
}

impl Pair {
    fn new(peer: usize, stream: TcpStream) -> Result<Self> {
        stream
            .set_nodelay(true)
            .map_err(|e| Error::transport(peer, e))?;
        Ok(Self { peer, stream })
    }

    pub fn peer(&self) -> usize {
        self.peer
    }

    pub fn send(&self, buf: &[u8]) -> Result<()> {
        (&self.stream)
            .write_all(buf)
            .map_err(|e| Error::transport(self.peer, e))
    }

    /// Fills `buf` completely.
    pub fn recv(&self, buf: &mut [u8]) -> Result<()> {
        (&self.stream)
            .read_exact(buf)
            .map_err(|e| Error::transport(self.peer, e))
    }
}
