//! Built-in observers.

use std::io::{self, Stdout, Write};
use std::sync::{Mutex, PoisonError};

use crate::observer::{Observer, ObserverError, ReceiveContext};

const OBSERVER_TARGET: &str = "tether_client::observer";

/// Writes each message as lossy UTF-8 text followed by a newline.
#[derive(Debug)]
pub struct EchoObserver<W> {
    writer: Mutex<W>,
}

impl EchoObserver<Stdout> {
    /// Echoes to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> EchoObserver<W> {
    /// Echoes to `writer`.
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the writer, consuming the observer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> Observer for EchoObserver<W> {
    fn notify(&self, _context: &ReceiveContext, message: &[u8]) -> Result<(), ObserverError> {
        let text = String::from_utf8_lossy(message);
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{text}")?;
        writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// Logs each message at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDebugObserver;

impl Observer for LogDebugObserver {
    fn notify(&self, context: &ReceiveContext, message: &[u8]) -> Result<(), ObserverError> {
        let text = String::from_utf8_lossy(message);
        tracing::debug!(
            target: OBSERVER_TARGET,
            server = %context.server,
            sequence = context.sequence,
            "Observer message: {text}"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "debug"
    }
}

/// Logs each message at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogInfoObserver;

impl Observer for LogInfoObserver {
    fn notify(&self, context: &ReceiveContext, message: &[u8]) -> Result<(), ObserverError> {
        let text = String::from_utf8_lossy(message);
        tracing::info!(
            target: OBSERVER_TARGET,
            server = %context.server,
            sequence = context.sequence,
            "Observer message: {text}"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "info"
    }
}
