//! End-to-end tests running the server and clients over loopback.
//!
//! The crate exports the fixtures shared by its `tests/` suites:
//! [`start_server`] binds an ephemeral port with a short poll interval and
//! [`CollectingObserver`] records what a client received so tests can wait
//! for it.

use std::net::SocketAddr;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tether_client::{Client, Observer, ObserverError, ReceiveContext};
use tether_config::{ClientConfig, ServerConfig};
use tetherd::{HandlerSource, ListenerError, Server, ServerHandle};

/// Poll interval and client receive timeout used by every fixture.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Upper bound for any wait in the suites.
pub const WAIT_LIMIT: Duration = Duration::from_secs(3);

/// Starts a loopback server on an ephemeral port.
pub fn start_server(handlers: HandlerSource) -> Result<ServerHandle, ListenerError> {
    let config = ServerConfig::new("127.0.0.1", 0).with_poll_interval(POLL_INTERVAL);
    Server::new(config, handlers).start()
}

/// Builds a client for `server` that notifies `observer`.
#[must_use]
pub fn client_for(server: SocketAddr, observer: &Arc<CollectingObserver>) -> Client {
    let config =
        ClientConfig::new(server.ip().to_string(), server.port()).with_time_out(POLL_INTERVAL);
    Client::new(config).with_observer(Arc::clone(observer) as Arc<dyn Observer>)
}

/// Records every received message and wakes waiters.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    messages: Mutex<Vec<Vec<u8>>>,
    arrived: Condvar,
}

impl CollectingObserver {
    /// Messages received so far, in order.
    #[must_use]
    pub fn messages(&self) -> Vec<Vec<u8>> {
        self.lock().clone()
    }

    /// All received bytes concatenated, since chunk boundaries are not
    /// preserved on the wire.
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        self.lock().concat()
    }

    /// Blocks until at least `len` bytes have arrived or `limit` elapses.
    /// Returns whether the bytes arrived.
    #[must_use]
    pub fn wait_for_bytes(&self, len: usize, limit: Duration) -> bool {
        let guard = self.lock();
        let (messages, _) = self
            .arrived
            .wait_timeout_while(guard, limit, |messages| {
                messages.iter().map(Vec::len).sum::<usize>() < len
            })
            .unwrap_or_else(PoisonError::into_inner);
        messages.iter().map(Vec::len).sum::<usize>() >= len
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Vec<u8>>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Observer for CollectingObserver {
    fn notify(&self, _context: &ReceiveContext, message: &[u8]) -> Result<(), ObserverError> {
        self.lock().push(message.to_vec());
        self.arrived.notify_all();
        Ok(())
    }

    fn name(&self) -> &str {
        "collector"
    }
}
