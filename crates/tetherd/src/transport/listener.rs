//! TCP listener, accept loop, and server handle.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, Socket, Type};

use tether_config::{ConfigError, ServerConfig};
use tether_core::{ShutdownFlag, resolve_socket_addr};

use crate::dispatch::HandlerSource;
use crate::reporter::ServerReporter;

use super::{
    ACCEPT_BACKOFF_CAP, Connection, ConnectionId, ConnectionRegistry, ConnectionSession,
    ERROR_BACKOFF, JOIN_BACKOFF, ListenerError,
};

/// Lifecycle of a server.
///
/// `Stopped → Listening → Stopping → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Not accepting. Either never started or fully stopped.
    Stopped,
    /// Accept loop running.
    Listening,
    /// Shutdown requested; sessions are draining.
    Stopping,
}

/// Outcome of draining sessions during shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopReport {
    /// Sessions that exited within the grace period.
    pub joined: usize,
    /// Sessions still running when the grace period elapsed.
    pub abandoned: usize,
}

/// Bound listening socket that has not started accepting yet.
#[derive(Debug)]
pub struct ServerListener {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: ServerConfig,
}

impl ServerListener {
    /// Validates `config`, then binds and listens with `SO_REUSEADDR` and a
    /// backlog of `request_queue_size`.
    pub fn bind(config: &ServerConfig) -> Result<Self, ListenerError> {
        config.validate()?;
        let host = config.bind_host();
        let addr = resolve_socket_addr(host, config.port).map_err(|source| {
            ListenerError::Resolve {
                host: host.to_owned(),
                port: config.port,
                source,
            }
        })?;
        let listener = bind_socket(addr, config.request_queue_size)?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenerError::LocalAddr { source })?;
        Ok(Self {
            listener,
            local_addr,
            config: config.clone(),
        })
    }

    /// Address actually bound; resolves port `0` to the assigned port.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Spawns the accept loop. Each accepted socket is served on its own
    /// thread by a handler resolved from `handlers`.
    pub fn start(
        self,
        handlers: HandlerSource,
        reporter: Arc<dyn ServerReporter>,
    ) -> Result<ServerHandle, ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;

        let shutdown = ShutdownFlag::new();
        let registry = Arc::new(ConnectionRegistry::new(Arc::clone(&reporter)));
        let local_addr = self.local_addr;
        let shutdown_grace = self.config.shutdown_grace;
        let accept_loop = AcceptLoop {
            listener: self.listener,
            config: self.config,
            handlers,
            registry: Arc::clone(&registry),
            shutdown: shutdown.clone(),
            reporter: Arc::clone(&reporter),
            next_id: 0,
        };
        let accept = thread::Builder::new()
            .name("tetherd-accept".to_owned())
            .spawn(move || accept_loop.run())
            .map_err(|source| ListenerError::Spawn { source })?;

        reporter.listening(local_addr);
        Ok(ServerHandle {
            local_addr,
            registry,
            shutdown,
            reporter,
            shutdown_grace,
            accept: Some(accept),
        })
    }
}

fn bind_socket(addr: SocketAddr, queue_size: u32) -> Result<TcpListener, ListenerError> {
    let backlog = i32::try_from(queue_size)
        .map_err(|_| ConfigError::BacklogTooLarge { value: queue_size })?;
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(|source| ListenerError::Socket { source })?;
    socket
        .set_reuse_address(true)
        .map_err(|source| ListenerError::Socket { source })?;
    socket
        .bind(&addr.into())
        .map_err(|source| ListenerError::BindTcp { addr, source })?;
    socket
        .listen(backlog)
        .map_err(|source| ListenerError::Listen { addr, source })?;
    Ok(socket.into())
}

/// Handle to a running server.
///
/// Dropping the handle requests shutdown but does not wait for sessions.
pub struct ServerHandle {
    local_addr: SocketAddr,
    registry: Arc<ConnectionRegistry>,
    shutdown: ShutdownFlag,
    reporter: Arc<dyn ServerReporter>,
    shutdown_grace: Duration,
    accept: Option<JoinHandle<Vec<JoinHandle<()>>>>,
}

impl ServerHandle {
    /// Address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of currently registered connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Registry shared by every session of this server.
    #[must_use]
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Flag observed by the accept loop and every session.
    #[must_use]
    pub fn shutdown_flag(&self) -> ShutdownFlag {
        self.shutdown.clone()
    }

    /// Sets the shutdown flag without waiting.
    pub fn request_stop(&self) {
        self.shutdown.trigger();
    }

    /// Current lifecycle state.
    ///
    /// Once shutdown is requested the server reports `Stopping` until the
    /// accept loop has exited and every session has left the registry.
    #[must_use]
    pub fn state(&self) -> ListenerState {
        let Some(accept) = &self.accept else {
            return ListenerState::Stopped;
        };
        if !self.shutdown.is_triggered() {
            ListenerState::Listening
        } else if accept.is_finished() && self.registry.is_empty() {
            ListenerState::Stopped
        } else {
            ListenerState::Stopping
        }
    }

    /// Requests shutdown and waits up to the grace period for sessions.
    pub fn stop(mut self) -> Result<StopReport, ListenerError> {
        self.request_stop();
        self.drain()
    }

    /// Blocks until shutdown is requested through the flag, then drains
    /// sessions like [`stop`](Self::stop).
    pub fn wait(mut self) -> Result<StopReport, ListenerError> {
        self.drain()
    }

    fn drain(&mut self) -> Result<StopReport, ListenerError> {
        let Some(accept) = self.accept.take() else {
            return Ok(StopReport::default());
        };
        let sessions = accept.join().map_err(|_| ListenerError::ThreadPanic)?;
        self.reporter.shutdown_requested(self.local_addr);
        let report = join_within(sessions, self.shutdown_grace);
        self.reporter.shutdown_completed(&report);
        Ok(report)
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

fn join_within(mut pending: Vec<JoinHandle<()>>, grace: Duration) -> StopReport {
    let deadline = Instant::now() + grace;
    let mut report = StopReport::default();
    loop {
        let (finished, running): (Vec<_>, Vec<_>) =
            pending.into_iter().partition(JoinHandle::is_finished);
        // A session thread only panics outside the handler; it has still exited.
        report.joined += finished.into_iter().map(JoinHandle::join).count();
        pending = running;
        if pending.is_empty() || Instant::now() >= deadline {
            break;
        }
        thread::sleep(JOIN_BACKOFF);
    }
    report.abandoned = pending.len();
    report
}

struct AcceptLoop {
    listener: TcpListener,
    config: ServerConfig,
    handlers: HandlerSource,
    registry: Arc<ConnectionRegistry>,
    shutdown: ShutdownFlag,
    reporter: Arc<dyn ServerReporter>,
    next_id: u64,
}

impl AcceptLoop {
    fn run(mut self) -> Vec<JoinHandle<()>> {
        let idle_backoff = self.config.poll_interval.min(ACCEPT_BACKOFF_CAP);
        let mut sessions = Vec::new();
        let mut last_error = None::<io::ErrorKind>;
        while !self.shutdown.is_triggered() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    last_error = None;
                    if let Some(session) = self.spawn_session(stream, peer) {
                        sessions.push(session);
                    }
                    sessions.retain(|session| !session.is_finished());
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(idle_backoff);
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => {
                    let kind = error.kind();
                    if last_error != Some(kind) {
                        self.reporter.accept_failed(&error);
                    }
                    last_error = Some(kind);
                    thread::sleep(ERROR_BACKOFF);
                }
            }
        }
        sessions
    }

    fn spawn_session(&mut self, stream: TcpStream, peer: SocketAddr) -> Option<JoinHandle<()>> {
        if let Err(error) = self.prepare_stream(&stream) {
            self.reporter.accept_failed(&error);
            return None;
        }
        self.next_id += 1;
        let connection = Arc::new(Connection::new(ConnectionId::new(self.next_id), stream, peer));
        let session = ConnectionSession::new(
            Arc::clone(&connection),
            Arc::clone(&self.registry),
            self.shutdown.clone(),
            Arc::clone(&self.reporter),
            self.config.receive_buffer_size,
        );
        let handler = self.handlers.resolve();
        let spawned = thread::Builder::new()
            .name(connection.name().to_owned())
            .spawn(move || {
                session.run(handler.as_ref());
            });
        match spawned {
            Ok(handle) => Some(handle),
            Err(error) => {
                self.reporter.accept_failed(&error);
                if let Err(close_error) = connection.close() {
                    self.reporter.close_failed(&connection, &close_error);
                }
                None
            }
        }
    }

    fn prepare_stream(&self, stream: &TcpStream) -> io::Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(self.config.poll_interval))?;
        stream.set_write_timeout(Some(self.config.write_timeout))
    }
}
