//! Command-line and environment layering for the binaries.
//!
//! Each flag can also be supplied through a `TETHER_*` environment variable;
//! explicit flags win over the environment, which wins over the defaults.

use std::time::Duration;

use clap::Args;

use crate::defaults::{
    DEFAULT_CLIENT_HOST, DEFAULT_CLIENT_RECEIVE_BUFFER, DEFAULT_LOG_FILTER, DEFAULT_PORT,
    DEFAULT_REQUEST_QUEUE_SIZE, DEFAULT_SERVER_HOST, DEFAULT_SERVER_RECEIVE_BUFFER,
    DEFAULT_WRITE_TIMEOUT,
};
use crate::{ClientConfig, LogFormat, LoggingConfig, ServerConfig, parse_seconds};

/// Logging flags shared by both binaries.
#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    /// Emits log records to stderr.
    #[arg(long = "log", env = "TETHER_LOG")]
    pub enabled: bool,
    /// Log filter expression, for example `info` or `tetherd=debug`.
    #[arg(long, env = "TETHER_LOG_FILTER", default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,
    /// Log record format (`compact` or `json`).
    #[arg(long, env = "TETHER_LOG_FORMAT", default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

impl LoggingArgs {
    /// Converts the parsed flags into a [`LoggingConfig`].
    #[must_use]
    pub fn into_config(self) -> LoggingConfig {
        LoggingConfig {
            enabled: self.enabled,
            filter: self.log_filter,
            format: self.log_format,
        }
    }
}

/// Flags accepted by the server binary.
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Host or address to listen on; empty listens on every interface.
    #[arg(long, env = "TETHER_HOST", default_value = DEFAULT_SERVER_HOST)]
    pub host: String,
    /// Port to listen on.
    #[arg(long, env = "TETHER_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Seconds each session waits for data before re-checking for shutdown.
    #[arg(
        long,
        env = "TETHER_POLL_INTERVAL",
        value_name = "SECONDS",
        value_parser = parse_seconds,
        default_value = "0.5"
    )]
    pub poll_interval: Duration,
    /// Listen backlog for pending connections.
    #[arg(long, env = "TETHER_REQUEST_QUEUE_SIZE", default_value_t = DEFAULT_REQUEST_QUEUE_SIZE)]
    pub request_queue_size: u32,
    /// Seconds `stop` waits for sessions to finish.
    #[arg(long, value_name = "SECONDS", value_parser = parse_seconds, default_value = "2")]
    pub shutdown_grace: Duration,
    /// Logging flags.
    #[command(flatten)]
    pub logging: LoggingArgs,
}

impl ServerArgs {
    /// Converts the parsed flags into a [`ServerConfig`].
    #[must_use]
    pub fn into_config(self) -> ServerConfig {
        ServerConfig {
            host: self.host,
            port: self.port,
            poll_interval: self.poll_interval,
            request_queue_size: self.request_queue_size,
            receive_buffer_size: DEFAULT_SERVER_RECEIVE_BUFFER,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            shutdown_grace: self.shutdown_grace,
            logging: self.logging.into_config(),
        }
    }
}

/// Flags accepted by the client binary.
#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Server host name or address.
    #[arg(long, env = "TETHER_HOST", default_value = DEFAULT_CLIENT_HOST)]
    pub host: String,
    /// Server port.
    #[arg(long, env = "TETHER_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Seconds the receive path waits for data before re-checking for shutdown.
    #[arg(
        long = "timeout",
        env = "TETHER_TIMEOUT",
        value_name = "SECONDS",
        value_parser = parse_seconds,
        default_value = "0.5"
    )]
    pub time_out: Duration,
    /// Logging flags.
    #[command(flatten)]
    pub logging: LoggingArgs,
}

impl ClientArgs {
    /// Converts the parsed flags into a [`ClientConfig`].
    #[must_use]
    pub fn into_config(self) -> ClientConfig {
        ClientConfig {
            host: self.host,
            port: self.port,
            time_out: self.time_out,
            receive_buffer_size: DEFAULT_CLIENT_RECEIVE_BUFFER,
            logging: self.logging.into_config(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct ServerCli {
        #[command(flatten)]
        server: ServerArgs,
    }

    #[derive(Parser, Debug)]
    struct ClientCli {
        #[command(flatten)]
        client: ClientArgs,
    }

    #[test]
    fn server_flags_override_defaults() {
        let cli = ServerCli::try_parse_from([
            "tetherd",
            "--host",
            "127.0.0.1",
            "--port",
            "0",
            "--poll-interval",
            "0.1",
            "--log",
            "--log-format",
            "json",
        ])
        .expect("arguments parse");
        let config = cli.server.into_config();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 0);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert!(config.logging.enabled);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn client_timeout_flag_is_parsed_in_seconds() {
        let cli = ClientCli::try_parse_from(["tether", "--timeout", "1.5"]).expect("arguments parse");
        let config = cli.client.into_config();
        assert_eq!(config.time_out, Duration::from_millis(1500));
        assert_eq!(config.receive_buffer_size, 2048);
    }

    #[test]
    fn zero_poll_interval_flag_is_rejected() {
        let result = ServerCli::try_parse_from(["tetherd", "--poll-interval", "0"]);
        assert!(result.is_err(), "zero interval should fail to parse");
    }
}
