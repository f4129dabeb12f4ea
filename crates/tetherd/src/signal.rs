//! Termination signal handling for the binary.

use std::io;

use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until the server should stop.
    fn wait(&self) -> Result<(), SignalError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Waits for `SIGINT` or `SIGTERM`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), SignalError> {
        let mut signals =
            Signals::new([SIGINT, SIGTERM]).map_err(|source| SignalError::Install { source })?;
        if let Some(signal) = signals.forever().next() {
            tracing::info!(target: crate::SERVER_TARGET, signal, "shutdown signal received");
        }
        Ok(())
    }
}
