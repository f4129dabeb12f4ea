//! Lifecycle reporting for the server.
//!
//! The listener, sessions, and registry never log on their own; they call the
//! [`ServerReporter`] they were built with. [`NoopServerReporter`] is the
//! default, [`StructuredServerReporter`] forwards events to `tracing`.

use std::io;
use std::net::SocketAddr;

use crate::dispatch::HandlerError;
use crate::transport::{CloseReason, Connection, RegistryError, StopReport};

const REPORTER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Observer trait used to surface server lifecycle events to a logging sink.
pub trait ServerReporter: Send + Sync {
    /// The listener is bound and accepting.
    fn listening(&self, addr: SocketAddr);

    /// A session registered its connection.
    fn connection_opened(&self, connection: &Connection);

    /// A session finished and its socket was closed.
    fn connection_closed(&self, connection: &Connection, reason: &CloseReason);

    /// A session could not register its connection.
    fn registration_failed(&self, connection: &Connection, error: &RegistryError);

    /// A handler failed; the connection is being closed.
    fn handler_failed(&self, connection: &Connection, error: &HandlerError);

    /// A broadcast write to one connection failed and was skipped.
    fn delivery_failed(&self, connection: &Connection, error: &io::Error);

    /// Shutting a socket down failed during session teardown.
    fn close_failed(&self, connection: &Connection, error: &io::Error);

    /// Accepting or preparing a connection failed.
    fn accept_failed(&self, error: &io::Error);

    /// Shutdown was requested.
    fn shutdown_requested(&self, addr: SocketAddr);

    /// All sessions were joined or abandoned.
    fn shutdown_completed(&self, report: &StopReport);
}

/// Reporter that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopServerReporter;

impl ServerReporter for NoopServerReporter {
    fn listening(&self, _addr: SocketAddr) {}

    fn connection_opened(&self, _connection: &Connection) {}

    fn connection_closed(&self, _connection: &Connection, _reason: &CloseReason) {}

    fn registration_failed(&self, _connection: &Connection, _error: &RegistryError) {}

    fn handler_failed(&self, _connection: &Connection, _error: &HandlerError) {}

    fn delivery_failed(&self, _connection: &Connection, _error: &io::Error) {}

    fn close_failed(&self, _connection: &Connection, _error: &io::Error) {}

    fn accept_failed(&self, _error: &io::Error) {}

    fn shutdown_requested(&self, _addr: SocketAddr) {}

    fn shutdown_completed(&self, _report: &StopReport) {}
}

/// Reporter that records events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredServerReporter;

impl StructuredServerReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ServerReporter for StructuredServerReporter {
    fn listening(&self, addr: SocketAddr) {
        tracing::info!(
            target: REPORTER_TARGET,
            event = "listening",
            addr = %addr,
            "server listening"
        );
    }

    fn connection_opened(&self, connection: &Connection) {
        tracing::info!(
            target: REPORTER_TARGET,
            event = "connection_opened",
            connection = connection.name(),
            peer = %connection.peer_addr(),
            "client connected"
        );
    }

    fn connection_closed(&self, connection: &Connection, reason: &CloseReason) {
        tracing::info!(
            target: REPORTER_TARGET,
            event = "connection_closed",
            connection = connection.name(),
            peer = %connection.peer_addr(),
            reason = %reason,
            "client disconnected"
        );
    }

    fn registration_failed(&self, connection: &Connection, error: &RegistryError) {
        tracing::error!(
            target: REPORTER_TARGET,
            event = "registration_failed",
            connection = connection.name(),
            error = %error,
            "connection could not be registered"
        );
    }

    fn handler_failed(&self, connection: &Connection, error: &HandlerError) {
        tracing::warn!(
            target: REPORTER_TARGET,
            event = "handler_failed",
            connection = connection.name(),
            error = %error,
            "handler failed; closing connection"
        );
    }

    fn delivery_failed(&self, connection: &Connection, error: &io::Error) {
        tracing::warn!(
            target: REPORTER_TARGET,
            event = "delivery_failed",
            connection = connection.name(),
            error = %error,
            "broadcast skipped connection"
        );
    }

    fn close_failed(&self, connection: &Connection, error: &io::Error) {
        tracing::debug!(
            target: REPORTER_TARGET,
            event = "close_failed",
            connection = connection.name(),
            error = %error,
            "socket shutdown failed"
        );
    }

    fn accept_failed(&self, error: &io::Error) {
        tracing::warn!(
            target: REPORTER_TARGET,
            event = "accept_failed",
            error = %error,
            "socket accept error"
        );
    }

    fn shutdown_requested(&self, addr: SocketAddr) {
        tracing::info!(
            target: REPORTER_TARGET,
            event = "shutdown_requested",
            addr = %addr,
            "closing connections"
        );
    }

    fn shutdown_completed(&self, report: &StopReport) {
        tracing::info!(
            target: REPORTER_TARGET,
            event = "shutdown_completed",
            joined = report.joined,
            abandoned = report.abandoned,
            "server shutdown complete"
        );
    }
}
