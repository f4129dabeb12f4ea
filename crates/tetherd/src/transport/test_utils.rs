//! Test helpers for the transport module.

use std::io::Read;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use super::{Connection, ConnectionId};

const DRAIN_TIMEOUT: Duration = Duration::from_millis(200);

/// Builds a server-side connection and returns it with its client peer.
pub(crate) fn accepted_connection(id: u64) -> (Arc<Connection>, TcpStream) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
    let addr = listener.local_addr().expect("listener address");
    let client = TcpStream::connect(addr).expect("connect client");
    let (stream, peer) = listener.accept().expect("accept connection");
    (
        Arc::new(Connection::new(ConnectionId::new(id), stream, peer)),
        client,
    )
}

/// Reads whatever arrives until the stream stays quiet for a short interval.
pub(crate) fn read_available(stream: &mut TcpStream) -> Vec<u8> {
    stream
        .set_read_timeout(Some(DRAIN_TIMEOUT))
        .expect("set read timeout");
    let mut received = Vec::new();
    let mut chunk = [0_u8; 1024];
    while let Ok(read) = stream.read(&mut chunk) {
        if read == 0 {
            break;
        }
        received.extend_from_slice(&chunk[..read]);
    }
    received
}
