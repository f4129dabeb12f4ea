//! Client connection with a caller-driven send path and a background
//! receive path.
//!
//! [`ClientConnection::run`] drives both. The caller's thread repeatedly
//! invokes the step closure; a scoped thread receives chunks and hands them
//! to the observers. Either side may end the session by setting the shared
//! [`ShutdownFlag`]. The socket is closed once, after both paths have joined.

use std::fmt;
use std::io::{self, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tether_config::ClientConfig;
use tether_core::{
    ReceiveBuffer, Received, ShutdownFlag, panic_message, resolve_socket_addr, shutdown_stream,
};

use crate::errors::ClientError;
use crate::observer::{Observer, ObserverRegistry, ReceiveContext};
use crate::reporter::{ClientReporter, NoopClientReporter};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Why the receive path stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disconnect {
    /// The shutdown flag was set locally.
    Local,
    /// The server closed the connection.
    ServerClosed,
    /// Reading from the socket failed.
    ReceiveFailed(io::ErrorKind),
}

impl fmt::Display for Disconnect {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => formatter.write_str("local shutdown"),
            Self::ServerClosed => formatter.write_str("server closed"),
            Self::ReceiveFailed(kind) => write!(formatter, "receive failed: {kind}"),
        }
    }
}

/// Outcome of a finished [`ClientConnection::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Chunks delivered to the observers.
    pub received: u64,
    /// Why the receive path stopped.
    pub disconnect: Disconnect,
}

/// Builder for a [`ClientConnection`].
pub struct Client {
    config: ClientConfig,
    observers: ObserverRegistry,
    reporter: Arc<dyn ClientReporter>,
}

impl Client {
    /// Builds a client with no observers that reports nothing.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let reporter: Arc<dyn ClientReporter> = Arc::new(NoopClientReporter);
        Self {
            config,
            observers: ObserverRegistry::new(Arc::clone(&reporter)),
            reporter,
        }
    }

    /// Replaces the lifecycle reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ClientReporter>) -> Self {
        self.observers.set_reporter(Arc::clone(&reporter));
        self.reporter = reporter;
        self
    }

    /// Appends an observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.register(observer);
        self
    }

    /// Observers notified for every received chunk.
    #[must_use]
    pub const fn observers(&self) -> &ObserverRegistry {
        &self.observers
    }

    /// Mutable access for registering or removing observers before connecting.
    pub const fn observers_mut(&mut self) -> &mut ObserverRegistry {
        &mut self.observers
    }

    /// Validates the settings and opens the TCP connection.
    pub fn connect(self) -> Result<ClientConnection, ClientError> {
        self.config.validate()?;
        let endpoint = self.config.endpoint();
        let server = resolve_socket_addr(&self.config.host, self.config.port).map_err(|source| {
            ClientError::Resolve {
                endpoint: endpoint.clone(),
                source,
            }
        })?;
        let stream = TcpStream::connect_timeout(&server, CONNECT_TIMEOUT)
            .map_err(|source| ClientError::Connect { endpoint, source })?;
        stream
            .set_read_timeout(Some(self.config.time_out))
            .map_err(|source| ClientError::Configure { source })?;
        self.reporter.connected(server);
        Ok(ClientConnection {
            stream,
            server,
            shutdown: ShutdownFlag::new(),
            observers: self.observers,
            reporter: self.reporter,
            receive_buffer_size: self.config.receive_buffer_size,
        })
    }
}

/// An open connection to a server.
pub struct ClientConnection {
    stream: TcpStream,
    server: SocketAddr,
    shutdown: ShutdownFlag,
    observers: ObserverRegistry,
    reporter: Arc<dyn ClientReporter>,
    receive_buffer_size: usize,
}

impl ClientConnection {
    /// Address of the connected server.
    #[must_use]
    pub const fn server_addr(&self) -> SocketAddr {
        self.server
    }

    /// Writes all of `data` to the server.
    pub fn send(&self, data: &[u8]) -> Result<(), ClientError> {
        if self.shutdown.is_triggered() {
            return Err(ClientError::ShuttingDown);
        }
        let mut writer = &self.stream;
        writer
            .write_all(data)
            .and_then(|()| writer.flush())
            .map_err(|source| ClientError::Send { source })
    }

    /// Initiates shutdown of both paths. Repeated calls are harmless.
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Reports whether shutdown has been initiated by either path.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_triggered()
    }

    /// Flag shared by the send and receive paths.
    #[must_use]
    pub fn shutdown_flag(&self) -> ShutdownFlag {
        self.shutdown.clone()
    }

    /// Runs `step` until it returns `false` or shutdown is initiated, while
    /// the receive path delivers chunks to the observers.
    ///
    /// Returns after both paths have exited and the socket is closed.
    pub fn run<F>(self, mut step: F) -> Result<RunSummary, ClientError>
    where
        F: FnMut(&Self) -> bool,
    {
        let outcome = thread::scope(|scope| {
            let receiver = thread::Builder::new()
                .name("tether-receive".to_owned())
                .spawn_scoped(scope, || self.receive_loop())
                .map_err(|source| ClientError::Spawn { source })?;
            self.send_loop(&mut step);
            receiver.join().map_err(|payload| ClientError::ReceiverPanicked {
                message: panic_message(payload.as_ref()),
            })
        });
        self.close();
        let summary = outcome?;
        self.reporter.disconnected(self.server, &summary.disconnect);
        Ok(summary)
    }

    /// Runs `step` once, then shuts down.
    pub fn run_once<F>(self, step: F) -> Result<RunSummary, ClientError>
    where
        F: FnOnce(&Self) -> bool,
    {
        let mut pending = Some(step);
        self.run(move |connection| {
            if let Some(once) = pending.take() {
                once(connection);
            }
            false
        })
    }

    fn send_loop<F>(&self, step: &mut F)
    where
        F: FnMut(&Self) -> bool,
    {
        // Set on every exit, including a panicking step.
        let _guard = self.shutdown.trigger_on_drop();
        while !self.shutdown.is_triggered() {
            if !step(self) {
                break;
            }
        }
    }

    fn receive_loop(&self) -> RunSummary {
        let _guard = self.shutdown.trigger_on_drop();
        let mut buffer = ReceiveBuffer::new(self.receive_buffer_size);
        let mut reader = &self.stream;
        let mut received = 0;
        let disconnect = loop {
            if self.shutdown.is_triggered() {
                break Disconnect::Local;
            }
            match buffer.receive(&mut reader) {
                Ok(Received::Timeout) => {}
                Ok(Received::Closed) => {
                    self.reporter.server_closed(self.server);
                    break Disconnect::ServerClosed;
                }
                Ok(Received::Chunk(message)) => {
                    received += 1;
                    let context = ReceiveContext {
                        server: self.server,
                        sequence: received,
                    };
                    self.observers.notify_all(&context, message);
                }
                Err(error) => {
                    self.reporter.receive_failed(&error);
                    break Disconnect::ReceiveFailed(error.kind());
                }
            }
        };
        RunSummary {
            received,
            disconnect,
        }
    }

    fn close(&self) {
        if let Err(error) = shutdown_stream(&self.stream) {
            self.reporter.close_failed(&error);
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Client")
            .field("endpoint", &self.config.endpoint())
            .field("observers", &self.observers)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for ClientConnection {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ClientConnection")
            .field("server", &self.server)
            .field("shutting_down", &self.shutdown.is_triggered())
            .field("observers", &self.observers)
            .finish_non_exhaustive()
    }
}
