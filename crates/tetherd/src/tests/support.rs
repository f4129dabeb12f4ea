//! Shared fixtures for the behavioural suites.
//!
//! [`RecordingServerReporter`] captures lifecycle events so scenarios can
//! assert on what the server observed, not only on what clients received.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tether_config::ServerConfig;

use crate::dispatch::{HandlerError, HandlerSource, MessageHandler};
use crate::reporter::ServerReporter;
use crate::server::Server;
use crate::transport::{
    CloseReason, Connection, ConnectionId, ConnectionSession, Delivery, RegistryError,
    ServerHandle, StopReport,
};

pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(50);
const WAIT_LIMIT: Duration = Duration::from_secs(2);

/// Server lifecycle events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ServerEvent {
    Listening,
    Opened(ConnectionId),
    Closed(ConnectionId, CloseReason),
    RegistrationFailed(ConnectionId),
    HandlerFailed(ConnectionId),
    DeliveryFailed(ConnectionId),
    CloseFailed(ConnectionId),
    AcceptFailed(io::ErrorKind),
    ShutdownRequested,
    ShutdownCompleted(StopReport),
}

/// Records server events for assertions.
#[derive(Debug, Default)]
pub(crate) struct RecordingServerReporter {
    events: Mutex<Vec<ServerEvent>>,
}

impl RecordingServerReporter {
    pub(crate) fn events(&self) -> Vec<ServerEvent> {
        self.events
            .lock()
            .expect("server reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: ServerEvent) {
        self.events
            .lock()
            .expect("server reporter mutex poisoned")
            .push(event);
    }
}

impl ServerReporter for RecordingServerReporter {
    fn listening(&self, _addr: SocketAddr) {
        self.record(ServerEvent::Listening);
    }

    fn connection_opened(&self, connection: &Connection) {
        self.record(ServerEvent::Opened(connection.id()));
    }

    fn connection_closed(&self, connection: &Connection, reason: &CloseReason) {
        self.record(ServerEvent::Closed(connection.id(), *reason));
    }

    fn registration_failed(&self, connection: &Connection, _error: &RegistryError) {
        self.record(ServerEvent::RegistrationFailed(connection.id()));
    }

    fn handler_failed(&self, connection: &Connection, _error: &HandlerError) {
        self.record(ServerEvent::HandlerFailed(connection.id()));
    }

    fn delivery_failed(&self, connection: &Connection, _error: &io::Error) {
        self.record(ServerEvent::DeliveryFailed(connection.id()));
    }

    fn close_failed(&self, connection: &Connection, _error: &io::Error) {
        self.record(ServerEvent::CloseFailed(connection.id()));
    }

    fn accept_failed(&self, error: &io::Error) {
        self.record(ServerEvent::AcceptFailed(error.kind()));
    }

    fn shutdown_requested(&self, _addr: SocketAddr) {
        self.record(ServerEvent::ShutdownRequested);
    }

    fn shutdown_completed(&self, report: &StopReport) {
        self.record(ServerEvent::ShutdownCompleted(*report));
    }
}

/// Relays chunks with the chosen delivery, but rejects the literal payload
/// `fail` and panics on `panic`.
#[derive(Debug)]
pub(crate) struct FussyRelay {
    delivery: Delivery,
}

impl FussyRelay {
    pub(crate) const fn new(delivery: Delivery) -> Self {
        Self { delivery }
    }
}

impl MessageHandler for FussyRelay {
    fn handle(&self, data: &[u8], session: &ConnectionSession) -> Result<(), HandlerError> {
        match data {
            b"fail" => Err(HandlerError::rejected("refused payload")),
            b"panic" => panic!("handler exploded"),
            _ => {
                session.deliver(self.delivery, data)?;
                Ok(())
            }
        }
    }
}

/// Starts a loopback server with a short poll interval.
pub(crate) fn start_server(
    handlers: HandlerSource,
    reporter: Arc<RecordingServerReporter>,
) -> ServerHandle {
    let config = ServerConfig::new("127.0.0.1", 0).with_poll_interval(POLL_INTERVAL);
    Server::new(config, handlers)
        .with_reporter(reporter)
        .start()
        .expect("start server")
}

/// Connects `count` clients and waits until the server registered them all.
pub(crate) fn connect_clients(handle: &ServerHandle, count: usize) -> Vec<TcpStream> {
    let expected = handle.connection_count() + count;
    let clients = (0..count)
        .map(|_| TcpStream::connect(handle.local_addr()).expect("connect client"))
        .collect();
    assert!(
        wait_until(|| handle.connection_count() == expected),
        "expected {expected} registered connections, found {}",
        handle.connection_count()
    );
    clients
}

/// Writes `payload` as one chunk.
pub(crate) fn send(client: &mut TcpStream, payload: &[u8]) {
    client.write_all(payload).expect("write payload");
}

/// Reads until the peer closes the stream or the wait limit elapses.
pub(crate) fn closed_by_server(client: &mut TcpStream) -> bool {
    client
        .set_read_timeout(Some(WAIT_LIMIT))
        .expect("set read timeout");
    let mut scratch = [0_u8; 64];
    loop {
        match client.read(&mut scratch) {
            Ok(0) => return true,
            Ok(_) => {}
            Err(error) if error.kind() == io::ErrorKind::ConnectionReset => return true,
            Err(_) => return false,
        }
    }
}

/// Polls `condition` until it holds or the wait limit elapses.
pub(crate) fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + WAIT_LIMIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
