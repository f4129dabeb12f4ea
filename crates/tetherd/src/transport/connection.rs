//! Accepted socket plus its generated identity.

use std::fmt;
use std::io::{self, Write};
use std::net::{SocketAddr, TcpStream};

use tether_core::shutdown_stream;

/// Sequence number assigned to each accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw sequence number.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw sequence number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// One accepted TCP connection.
///
/// The owning session reads from the stream; the registry writes to it while
/// holding its lock. Identity is the [`ConnectionId`]; the display name
/// (`session-<id>`) doubles as the worker thread name.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    name: String,
    peer: SocketAddr,
    stream: TcpStream,
}

impl Connection {
    /// Wraps an accepted stream.
    #[must_use]
    pub fn new(id: ConnectionId, stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            id,
            name: format!("session-{id}"),
            peer,
            stream,
        }
    }

    /// Registry identity.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Display name, also used as the session thread name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Remote address of the peer.
    #[must_use]
    pub const fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Raw socket.
    #[must_use]
    pub const fn stream(&self) -> &TcpStream {
        &self.stream
    }

    pub(crate) fn write_all(&self, message: &[u8]) -> io::Result<()> {
        let mut writer = &self.stream;
        writer.write_all(message)?;
        writer.flush()
    }

    pub(crate) fn close(&self) -> io::Result<()> {
        shutdown_stream(&self.stream)
    }
}
