//! TCP transport for the server.
//!
//! The listener accepts sockets on a background thread and hands each one to
//! a [`ConnectionSession`] running on its own thread. Sessions register with
//! the shared [`ConnectionRegistry`], which serialises every outbound write.

use std::time::Duration;

mod connection;
mod errors;
mod listener;
mod registry;
mod session;
#[cfg(test)]
pub(crate) mod test_utils;

pub use self::connection::{Connection, ConnectionId};
pub use self::errors::ListenerError;
pub use self::listener::{ListenerState, ServerHandle, ServerListener, StopReport};
pub use self::registry::{ConnectionRegistry, RegistryError};
pub use self::session::{CloseReason, ConnectionSession, Delivery, SessionState};

/// Upper bound on the accept loop's idle sleep.
const ACCEPT_BACKOFF_CAP: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
const JOIN_BACKOFF: Duration = Duration::from_millis(10);
