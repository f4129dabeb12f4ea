//! Structured telemetry initialisation for the binaries.
//!
//! The libraries never install a subscriber themselves; they report through
//! the reporter they were constructed with. Only the binaries call
//! [`initialise`], and only when logging is enabled.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing_subscriber::fmt::{self, time::UtcTime};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry};

use tether_config::{LogFormat, LoggingConfig};

type OutputLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Format chosen by the first successful installation.
static INSTALLED: OnceCell<LogFormat> = OnceCell::new();

/// Proof that the global subscriber is in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Output format of the installed subscriber.
    #[must_use]
    pub const fn format(self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter is not a valid directive list.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Another subscriber already owns the process.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[source] TryInitError),
}

/// Installs the process-wide subscriber on the first call.
///
/// Later calls leave the installed subscriber alone and report the format
/// it was installed with, whatever `config` asks for.
pub fn initialise(config: &LoggingConfig) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED
        .get_or_try_init(|| install(config))
        .map(|format| TelemetryHandle { format: *format })
}

fn install(config: &LoggingConfig) -> Result<LogFormat, TelemetryError> {
    let filter = parse_filter(&config.filter)?;
    tracing_subscriber::registry()
        .with(output_layer(config.format).with_filter(filter))
        .try_init()
        .map_err(TelemetryError::Subscriber)?;
    Ok(config.format)
}

fn parse_filter(directives: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directives).map_err(|error| TelemetryError::Filter(error.to_string()))
}

fn output_layer(format: LogFormat) -> OutputLayer {
    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(UtcTime::rfc_3339())
        .with_thread_names(true);
    match format {
        LogFormat::Json => layer.json().flatten_event(true).boxed(),
        LogFormat::Compact => layer
            .compact()
            .with_ansi(io::stderr().is_terminal())
            .boxed(),
    }
}
