//! Default values shared by the server and client configuration.

use std::time::Duration;

/// Default TCP port for both the server and the client.
pub const DEFAULT_PORT: u16 = 4000;

/// Host the server binds to when none is configured (every interface).
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Host the client connects to when none is configured.
pub const DEFAULT_CLIENT_HOST: &str = "127.0.0.1";

/// Receive timeout used by server sessions between shutdown checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Receive timeout used by the client between shutdown checks.
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_millis(500);

/// Listen backlog for the server socket.
pub const DEFAULT_REQUEST_QUEUE_SIZE: u32 = 5;

/// Bytes read per `recv` call on the server.
pub const DEFAULT_SERVER_RECEIVE_BUFFER: usize = 1024;

/// Bytes read per `recv` call on the client.
pub const DEFAULT_CLIENT_RECEIVE_BUFFER: usize = 2048;

/// Upper bound on a single blocked write to a peer.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long `stop` waits for sessions to observe shutdown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Normalises an empty host to the unrestricted bind address.
///
/// An empty host string means "listen everywhere", matching the behaviour of
/// binding to `("", port)` with the BSD socket API.
#[must_use]
pub fn normalise_bind_host(host: &str) -> &str {
    let trimmed = host.trim();
    if trimmed.is_empty() {
        DEFAULT_SERVER_HOST
    } else {
        trimmed
    }
}
