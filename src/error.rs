//! Error type shared by all driver components.

use std::{fmt::Display, io};
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classes of failure. None of them is retried: any error on any participant invalidates
/// the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Verification,
    Coordination,
    Statistics,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unknown transport: {0}")]
    UnknownTransport(String),

    #[error("benchmark verification failed for {elements} elements")]
    Verification { elements: usize },

    #[error("rendezvous store error on key `{key}`: {reason}")]
    Store { key: String, reason: String },

    #[error("timed out waiting for rendezvous key `{0}`")]
    StoreTimeout(String),

    #[error("transport failure with peer {peer}: {source}")]
    Transport {
        peer: usize,
        #[source]
        source: io::Error,
    },

    #[error("bad handshake: {0}")]
    Handshake(String),

    #[error("no connection to peer {0} in this context")]
    NotConnected(usize),

    #[error("histogram error: {0}")]
    Histogram(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::UnknownTransport(_) => ErrorCategory::Configuration,
            Error::Verification { .. } => ErrorCategory::Verification,
            Error::Histogram(_) => ErrorCategory::Statistics,
            Error::Store { .. }
            | Error::StoreTimeout(_)
            | Error::Transport { .. }
            | Error::Handshake(_)
            | Error::NotConnected(_)
            | Error::Io(_) => ErrorCategory::Coordination,
        }
    }

    pub(crate) fn config(msg: impl Display) -> Self {
        Error::Config(msg.to_string())
    }

    pub(crate) fn store(key: &str, reason: impl Display) -> Self {
        Error::Store {
            key: key.to_owned(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn transport(peer: usize, source: io::Error) -> Self {
        Error::Transport { peer, source }
    }
}

impl From<hdrhistogram::CreationError> for Error {
    fn from(e: hdrhistogram::CreationError) -> Self {
        Error::Histogram(format!("{e:?}"))
    }
}

impl From<hdrhistogram::RecordError> for Error {
    fn from(e: hdrhistogram::RecordError) -> Self {
        Error::Histogram(format!("{e:?}"))
    }
}
