use std::{io, net::SocketAddr, result::Result as StdResult};

use thiserror::Error;

pub type Result<T> = StdResult<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Bind Error on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("Register Error: {0}")]
    Register(#[source] io::Error),
    #[error("Accept Error: {0}")]
    Accept(#[source] io::Error),
    #[error("Signal Error: {0}")]
    Signals(#[source] io::Error),
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
    #[error("Configuration Error: {0}")]
    Configuration(String),
    #[error("Event loop is gone")]
    LoopGone,
}

impl Error {
    /// Whether the error happened before the loop started serving clients.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            Error::Bind { .. } | Error::Register(_) | Error::Signals(_) | Error::Configuration(_)
        )
    }
}
