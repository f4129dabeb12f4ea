//! Error types for binding and running the listener.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use tether_config::ConfigError;

/// Errors surfaced while binding, starting, or stopping the listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The server settings were rejected before binding.
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
    /// The host name could not be resolved.
    #[error("failed to resolve TCP address {host}:{port}: {source}")]
    Resolve {
        /// Host as configured.
        host: String,
        /// Port as configured.
        port: u16,
        /// Resolver failure.
        #[source]
        source: io::Error,
    },
    /// The listening socket could not be created or configured.
    #[error("failed to configure listening socket: {source}")]
    Socket {
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// The address is unavailable, usually because it is already in use.
    #[error("failed to bind TCP listener at {addr}: {source}")]
    BindTcp {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying bind error.
        #[source]
        source: io::Error,
    },
    /// `listen` failed after a successful bind.
    #[error("failed to listen on {addr}: {source}")]
    Listen {
        /// Bound address.
        addr: SocketAddr,
        /// Underlying listen error.
        #[source]
        source: io::Error,
    },
    /// The accept loop could not switch the socket to non-blocking mode.
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// The bound address could not be read back.
    #[error("failed to read listener address: {source}")]
    LocalAddr {
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// The accept thread could not be spawned.
    #[error("failed to spawn accept thread: {source}")]
    Spawn {
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },
    /// The accept thread panicked.
    #[error("listener thread panicked")]
    ThreadPanic,
}
