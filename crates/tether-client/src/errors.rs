//! Error types for the client runtime.

use std::io;

use thiserror::Error;

use tether_config::ConfigError;

/// Failures raised while connecting to or talking with a server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The client settings were rejected before connecting.
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
    /// The server host name could not be resolved.
    #[error("failed to resolve server address {endpoint}: {source}")]
    Resolve {
        /// `host:port` as configured.
        endpoint: String,
        /// Resolver failure.
        #[source]
        source: io::Error,
    },
    /// The TCP connection could not be established.
    #[error("failed to connect to server at {endpoint}: {source}")]
    Connect {
        /// `host:port` as configured.
        endpoint: String,
        /// Underlying connect error.
        #[source]
        source: io::Error,
    },
    /// Socket options could not be applied after connecting.
    #[error("failed to configure client socket: {source}")]
    Configure {
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// Writing to the server failed.
    #[error("failed to send to server: {source}")]
    Send {
        /// Underlying write error.
        #[source]
        source: io::Error,
    },
    /// The connection is shutting down and no longer accepts sends.
    #[error("connection is shutting down")]
    ShuttingDown,
    /// The receive thread could not be spawned.
    #[error("failed to spawn receive thread: {source}")]
    Spawn {
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },
    /// The receive thread panicked.
    #[error("receive thread panicked: {message}")]
    ReceiverPanicked {
        /// Panic payload rendered as text.
        message: String,
    },
}

impl ClientError {
    /// Reports whether retrying the same operation could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Send { .. })
    }
}
