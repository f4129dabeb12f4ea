//! Resolved server and client settings.

use std::time::Duration;

use crate::defaults::{
    DEFAULT_CLIENT_HOST, DEFAULT_CLIENT_RECEIVE_BUFFER, DEFAULT_CLIENT_TIMEOUT, DEFAULT_PORT,
    DEFAULT_POLL_INTERVAL, DEFAULT_REQUEST_QUEUE_SIZE, DEFAULT_SERVER_HOST,
    DEFAULT_SERVER_RECEIVE_BUFFER, DEFAULT_SHUTDOWN_GRACE, DEFAULT_WRITE_TIMEOUT,
    normalise_bind_host,
};
use crate::{ConfigError, LoggingConfig};

/// Settings for a listening server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host or address to bind; empty means every interface.
    pub host: String,
    /// TCP port to bind; `0` picks an ephemeral port.
    pub port: u16,
    /// Receive timeout between shutdown checks, per session.
    pub poll_interval: Duration,
    /// Listen backlog.
    pub request_queue_size: u32,
    /// Bytes read per `recv` call.
    pub receive_buffer_size: usize,
    /// Upper bound on a single blocked write to a peer.
    pub write_timeout: Duration,
    /// How long `stop` waits for sessions before abandoning them.
    pub shutdown_grace: Duration,
    /// Log output settings for the binary.
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Builds a configuration for the given address with default timings.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Overrides the session poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Host to bind after normalising the empty "any interface" form.
    #[must_use]
    pub fn bind_host(&self) -> &str {
        normalise_bind_host(&self.host)
    }

    /// Rejects settings that would make the listener misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_interval("poll_interval", self.poll_interval)?;
        require_interval("write_timeout", self.write_timeout)?;
        require_size("receive_buffer_size", self.receive_buffer_size)?;
        if self.request_queue_size == 0 {
            return Err(ConfigError::ZeroSize {
                field: "request_queue_size",
            });
        }
        if i32::try_from(self.request_queue_size).is_err() {
            return Err(ConfigError::BacklogTooLarge {
                value: self.request_queue_size,
            });
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SERVER_HOST.to_owned(),
            port: DEFAULT_PORT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_queue_size: DEFAULT_REQUEST_QUEUE_SIZE,
            receive_buffer_size: DEFAULT_SERVER_RECEIVE_BUFFER,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            logging: LoggingConfig::default(),
        }
    }
}

/// Settings for a connecting client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server host name or address.
    pub host: String,
    /// Server TCP port.
    pub port: u16,
    /// Receive timeout between shutdown checks.
    pub time_out: Duration,
    /// Bytes read per `recv` call.
    pub receive_buffer_size: usize,
    /// Log output settings for the binary.
    pub logging: LoggingConfig,
}

impl ClientConfig {
    /// Builds a configuration for the given server with default timings.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Overrides the receive timeout.
    #[must_use]
    pub const fn with_time_out(mut self, time_out: Duration) -> Self {
        self.time_out = time_out;
        self
    }

    /// Human-readable `host:port` form of the server address.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Rejects settings that would make the client misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_interval("time_out", self.time_out)?;
        require_size("receive_buffer_size", self.receive_buffer_size)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CLIENT_HOST.to_owned(),
            port: DEFAULT_PORT,
            time_out: DEFAULT_CLIENT_TIMEOUT,
            receive_buffer_size: DEFAULT_CLIENT_RECEIVE_BUFFER,
            logging: LoggingConfig::default(),
        }
    }
}

fn require_interval(field: &'static str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::ZeroInterval { field });
    }
    Ok(())
}

fn require_size(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::ZeroSize { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_defaults_match_reference_values() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 4000);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.receive_buffer_size, 1024);
        assert_eq!(config.bind_host(), "0.0.0.0");
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn client_defaults_match_reference_values() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint(), "127.0.0.1:4000");
        assert_eq!(config.time_out, Duration::from_millis(500));
        assert_eq!(config.receive_buffer_size, 2048);
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let config = ServerConfig::default().with_poll_interval(Duration::ZERO);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroInterval {
                field: "poll_interval"
            })
        );
    }

    #[test]
    fn oversized_backlog_is_rejected() {
        let config = ServerConfig {
            request_queue_size: u32::MAX,
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BacklogTooLarge { .. })
        ));
    }

    #[test]
    fn zero_client_buffer_is_rejected() {
        let config = ClientConfig {
            receive_buffer_size: 0,
            ..ClientConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroSize {
                field: "receive_buffer_size"
            })
        );
    }
}
