//! Threaded TCP message client.
//!
//! A [`ClientConnection`] runs two paths against one socket. The caller's
//! thread repeatedly invokes a step closure that may send; a scoped receive
//! thread delivers every chunk to the registered [`Observer`]s in order.
//! Whichever path finishes first sets the shared shutdown flag, the other
//! notices within one receive timeout, and the socket is closed once both
//! have joined.

mod cli;
pub mod console;
mod connection;
mod errors;
mod observer;
pub mod observers;
mod reporter;

pub use cli::{AppError, Cli, ObserverKind, run};
pub use connection::{Client, ClientConnection, Disconnect, RunSummary};
pub use errors::ClientError;
pub use observer::{Observer, ObserverError, ObserverRegistry, ReceiveContext};
pub use reporter::{ClientReporter, NoopClientReporter, StructuredClientReporter};
