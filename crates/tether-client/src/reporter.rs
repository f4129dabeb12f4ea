//! Lifecycle reporting for the client.
//!
//! The connection and observer registry report through a [`ClientReporter`].
//! [`NoopClientReporter`] is the default; [`StructuredClientReporter`]
//! forwards events to `tracing`.

use std::io;
use std::net::SocketAddr;

use crate::connection::Disconnect;
use crate::observer::ObserverError;

const REPORTER_TARGET: &str = "tether_client::transport";

/// Observer trait used to surface client lifecycle events to a logging sink.
pub trait ClientReporter: Send + Sync {
    /// The connection to `server` is established.
    fn connected(&self, server: SocketAddr);

    /// An observer failed on a message; later observers still ran.
    fn observer_failed(&self, observer: &str, error: &ObserverError);

    /// An observer was registered a second time and ignored.
    fn observer_already_registered(&self, observer: &str);

    /// An observer was unregistered without being registered.
    fn observer_not_registered(&self, observer: &str);

    /// The server sent end-of-stream.
    fn server_closed(&self, server: SocketAddr);

    /// Reading from the server failed.
    fn receive_failed(&self, error: &io::Error);

    /// Shutting the socket down failed.
    fn close_failed(&self, error: &io::Error);

    /// Both paths have exited and the socket is closed.
    fn disconnected(&self, server: SocketAddr, reason: &Disconnect);
}

/// Reporter that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopClientReporter;

impl ClientReporter for NoopClientReporter {
    fn connected(&self, _server: SocketAddr) {}

    fn observer_failed(&self, _observer: &str, _error: &ObserverError) {}

    fn observer_already_registered(&self, _observer: &str) {}

    fn observer_not_registered(&self, _observer: &str) {}

    fn server_closed(&self, _server: SocketAddr) {}

    fn receive_failed(&self, _error: &io::Error) {}

    fn close_failed(&self, _error: &io::Error) {}

    fn disconnected(&self, _server: SocketAddr, _reason: &Disconnect) {}
}

/// Reporter that records events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredClientReporter;

impl StructuredClientReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ClientReporter for StructuredClientReporter {
    fn connected(&self, server: SocketAddr) {
        tracing::info!(
            target: REPORTER_TARGET,
            event = "connected",
            server = %server,
            "connected to server"
        );
    }

    fn observer_failed(&self, observer: &str, error: &ObserverError) {
        tracing::warn!(
            target: REPORTER_TARGET,
            event = "observer_failed",
            observer,
            error = %error,
            "observer failed"
        );
    }

    fn observer_already_registered(&self, observer: &str) {
        tracing::warn!(
            target: REPORTER_TARGET,
            event = "observer_already_registered",
            observer,
            "observer already registered"
        );
    }

    fn observer_not_registered(&self, observer: &str) {
        tracing::warn!(
            target: REPORTER_TARGET,
            event = "observer_not_registered",
            observer,
            "observer not registered"
        );
    }

    fn server_closed(&self, server: SocketAddr) {
        tracing::info!(
            target: REPORTER_TARGET,
            event = "server_closed",
            server = %server,
            "server closed the connection"
        );
    }

    fn receive_failed(&self, error: &io::Error) {
        tracing::error!(
            target: REPORTER_TARGET,
            event = "receive_failed",
            error = %error,
            "receive failed"
        );
    }

    fn close_failed(&self, error: &io::Error) {
        tracing::debug!(
            target: REPORTER_TARGET,
            event = "close_failed",
            error = %error,
            "socket shutdown failed"
        );
    }

    fn disconnected(&self, server: SocketAddr, reason: &Disconnect) {
        tracing::info!(
            target: REPORTER_TARGET,
            event = "disconnected",
            server = %server,
            reason = %reason,
            "client shut down"
        );
    }
}
