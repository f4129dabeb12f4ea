//! Thread-safe set of live connections.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::reporter::ServerReporter;

use super::{Connection, ConnectionId};

/// Errors surfaced by registry membership and unicast operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The connection was registered twice.
    #[error("connection {name} is already registered")]
    DuplicateConnection {
        /// Display name of the connection.
        name: String,
    },
    /// The target has left the registry or its socket rejected the write.
    #[error("connection {name} is closed")]
    ConnectionClosed {
        /// Display name of the connection.
        name: String,
        /// Write failure, when the target was still registered.
        #[source]
        source: Option<io::Error>,
    },
}

impl RegistryError {
    fn closed(connection: &Connection, source: Option<io::Error>) -> Self {
        Self::ConnectionClosed {
            name: connection.name().to_owned(),
            source,
        }
    }
}

/// Live connections of one server, keyed by identity.
///
/// Every operation runs under a single mutex, including the writes performed
/// by [`broadcast`](Self::broadcast) and [`send_to`](Self::send_to). A
/// connection is only closed after it has been unregistered, so no write can
/// reach a socket that is mid-teardown. The reporter is called with the lock
/// held and must not call back into the registry.
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, Arc<Connection>>>,
    reporter: Arc<dyn ServerReporter>,
}

impl ConnectionRegistry {
    /// Builds an empty registry that reports delivery failures to `reporter`.
    #[must_use]
    pub fn new(reporter: Arc<dyn ServerReporter>) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            reporter,
        }
    }

    /// Adds a connection.
    pub fn register(&self, connection: Arc<Connection>) -> Result<(), RegistryError> {
        let mut connections = self.lock();
        if connections.contains_key(&connection.id()) {
            return Err(RegistryError::DuplicateConnection {
                name: connection.name().to_owned(),
            });
        }
        connections.insert(connection.id(), connection);
        Ok(())
    }

    /// Removes a connection. Returns whether it was present; absence is not
    /// an error so cleanup paths can call this unconditionally.
    pub fn unregister(&self, connection: &Connection) -> bool {
        self.lock().remove(&connection.id()).is_some()
    }

    /// Sends `message` to every registered connection.
    ///
    /// Failed writes are reported and skipped. Returns the number of
    /// connections that accepted the whole message.
    pub fn broadcast(&self, message: &[u8]) -> usize {
        let connections = self.lock();
        let mut delivered = 0;
        for connection in connections.values() {
            match connection.write_all(message) {
                Ok(()) => delivered += 1,
                Err(error) => self.reporter.delivery_failed(connection, &error),
            }
        }
        delivered
    }

    /// Sends `message` to one connection.
    pub fn send_to(&self, connection: &Connection, message: &[u8]) -> Result<(), RegistryError> {
        let connections = self.lock();
        let Some(target) = connections.get(&connection.id()) else {
            return Err(RegistryError::closed(connection, None));
        };
        target
            .write_all(message)
            .map_err(|source| RegistryError::closed(connection, Some(source)))
    }

    /// Reports whether the connection is currently registered.
    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Reports whether no connection is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Each critical section is a single insert, remove, or iteration, so the
    // map is consistent even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Arc<Connection>>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
