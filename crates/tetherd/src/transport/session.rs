//! Per-connection receive, poll, and dispatch loop.

use std::fmt;
use std::io;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

use tether_core::{ReceiveBuffer, Received, ShutdownFlag};

use crate::dispatch::{MessageHandler, dispatch};
use crate::reporter::ServerReporter;

use super::{Connection, ConnectionId, ConnectionRegistry, RegistryError};

/// Lifecycle of a session.
///
/// `Accepted → Receiving ⇄ Dispatching → Closing → Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Socket accepted, not yet registered.
    Accepted,
    /// Waiting for the next chunk.
    Receiving,
    /// Running the handler on a chunk.
    Dispatching,
    /// Leaving the registry and closing the socket.
    Closing,
    /// Terminal.
    Closed,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The server's shutdown flag was observed.
    Shutdown,
    /// The peer sent end-of-stream.
    PeerClosed,
    /// The handler returned an error or panicked.
    HandlerFailed,
    /// Reading from the socket failed.
    ReceiveFailed(io::ErrorKind),
    /// The connection could not join the registry.
    RegistrationFailed,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => formatter.write_str("server shutdown"),
            Self::PeerClosed => formatter.write_str("peer closed"),
            Self::HandlerFailed => formatter.write_str("handler failed"),
            Self::ReceiveFailed(kind) => write!(formatter, "receive failed: {kind}"),
            Self::RegistrationFailed => formatter.write_str("registration failed"),
        }
    }
}

/// Target of an outbound message chosen at the send site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Only the connection that sent the chunk being handled.
    Reply,
    /// Every registered connection, including the sender.
    Broadcast,
}

/// One accepted connection being served on its own thread.
///
/// Handlers receive a shared reference and use it to reply or broadcast.
pub struct ConnectionSession {
    connection: Arc<Connection>,
    registry: Arc<ConnectionRegistry>,
    shutdown: ShutdownFlag,
    reporter: Arc<dyn ServerReporter>,
    receive_buffer_size: usize,
    state: SessionState,
}

impl ConnectionSession {
    /// The stream must already carry the poll interval as its read timeout.
    pub(crate) fn new(
        connection: Arc<Connection>,
        registry: Arc<ConnectionRegistry>,
        shutdown: ShutdownFlag,
        reporter: Arc<dyn ServerReporter>,
        receive_buffer_size: usize,
    ) -> Self {
        Self {
            connection,
            registry,
            shutdown,
            reporter,
            receive_buffer_size,
            state: SessionState::Accepted,
        }
    }

    /// Registry identity of this connection.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.connection.id()
    }

    /// Display name, also the session thread name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.connection.name()
    }

    /// Remote address of the peer.
    #[must_use]
    pub fn peer_addr(&self) -> SocketAddr {
        self.connection.peer_addr()
    }

    /// Raw socket. Writes should go through [`send`](Self::send) so they
    /// are serialised with broadcasts.
    #[must_use]
    pub fn stream(&self) -> &TcpStream {
        self.connection.stream()
    }

    /// Registry shared by every session of the server.
    #[must_use]
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Reports whether the server has requested shutdown.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_triggered()
    }

    /// Sends `message` to this connection only.
    pub fn send(&self, message: &[u8]) -> Result<(), RegistryError> {
        self.registry.send_to(&self.connection, message)
    }

    /// Sends `message` to every connection; returns the delivery count.
    pub fn broadcast(&self, message: &[u8]) -> usize {
        self.registry.broadcast(message)
    }

    /// Sends `message` to the target named by `delivery`; returns the number
    /// of connections that received it.
    pub fn deliver(&self, delivery: Delivery, message: &[u8]) -> Result<usize, RegistryError> {
        match delivery {
            Delivery::Reply => self.send(message).map(|()| 1),
            Delivery::Broadcast => Ok(self.broadcast(message)),
        }
    }

    /// Serves the connection until shutdown, peer close, or failure.
    pub(crate) fn run(mut self, handler: &dyn MessageHandler) -> CloseReason {
        if let Err(error) = self.registry.register(Arc::clone(&self.connection)) {
            self.reporter.registration_failed(&self.connection, &error);
            self.close_socket();
            self.state = SessionState::Closed;
            return CloseReason::RegistrationFailed;
        }
        self.state = SessionState::Receiving;
        self.reporter.connection_opened(&self.connection);

        let mut buffer = ReceiveBuffer::new(self.receive_buffer_size);
        let reason = loop {
            if self.shutdown.is_triggered() {
                break CloseReason::Shutdown;
            }
            let mut reader = self.connection.stream();
            match buffer.receive(&mut reader) {
                Ok(Received::Timeout) => {}
                Ok(Received::Closed) => break CloseReason::PeerClosed,
                Ok(Received::Chunk(data)) => {
                    self.state = SessionState::Dispatching;
                    if let Err(error) = dispatch(handler, data, &self) {
                        self.reporter.handler_failed(&self.connection, &error);
                        break CloseReason::HandlerFailed;
                    }
                    self.state = SessionState::Receiving;
                }
                Err(error) => break CloseReason::ReceiveFailed(error.kind()),
            }
        };
        self.close(reason)
    }

    fn close(&mut self, reason: CloseReason) -> CloseReason {
        self.state = SessionState::Closing;
        self.registry.unregister(&self.connection);
        self.close_socket();
        self.state = SessionState::Closed;
        self.reporter.connection_closed(&self.connection, &reason);
        reason
    }

    fn close_socket(&self) {
        if let Err(error) = self.connection.close() {
            self.reporter.close_failed(&self.connection, &error);
        }
    }
}
