//! Threaded TCP message server.
//!
//! A [`ServerListener`] accepts connections on a background thread and serves
//! each one with a [`ConnectionSession`] on a dedicated thread. Every chunk a
//! session reads is passed to a [`MessageHandler`], which may reply to its
//! sender or broadcast to all connected clients through the shared
//! [`ConnectionRegistry`].
//!
//! Shutdown is cooperative. Sessions block only inside a receive bounded by
//! the configured poll interval and re-check the server's
//! [`ShutdownFlag`](tether_core::ShutdownFlag) each time it expires, so
//! [`ServerHandle::stop`] completes within roughly one interval unless a
//! handler is itself blocked.
//!
//! Lifecycle events are surfaced through a [`ServerReporter`]. The libraries
//! default to [`NoopServerReporter`]; the binary swaps in
//! [`StructuredServerReporter`] when logging is enabled.

mod cli;
mod dispatch;
pub mod handlers;
mod reporter;
mod server;
mod signal;
mod transport;

pub use cli::{AppError, Cli, HandlerKind, run};
pub use dispatch::{HandlerError, HandlerSource, MessageHandler};
pub use reporter::{NoopServerReporter, ServerReporter, StructuredServerReporter};
pub use server::Server;
pub use signal::{ShutdownSignal, SignalError, SystemShutdownSignal};
pub use transport::{
    CloseReason, Connection, ConnectionId, ConnectionRegistry, ConnectionSession, Delivery,
    ListenerError, ListenerState, RegistryError, ServerHandle, ServerListener, SessionState,
    StopReport,
};

const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

#[cfg(test)]
mod tests;
