//! Command-line runtime for the `tetherd` binary.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use thiserror::Error;

use tether_config::ServerArgs;
use tether_core::TelemetryError;
use tether_core::telemetry;

use crate::dispatch::HandlerSource;
use crate::handlers::{BroadcastHandler, HelloHandler, SendHandler};
use crate::reporter::{NoopServerReporter, ServerReporter, StructuredServerReporter};
use crate::server::Server;
use crate::signal::{ShutdownSignal, SignalError};
use crate::transport::ListenerError;

/// Built-in handler selected on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum HandlerKind {
    /// Echo each chunk back to its sender.
    #[default]
    Send,
    /// Relay each chunk to every client.
    Broadcast,
    /// Broadcast a greeting built from each chunk.
    Hello,
}

impl HandlerKind {
    /// Builds the handler source, shared or per connection.
    #[must_use]
    pub fn source(self, per_connection: bool) -> HandlerSource {
        match (self, per_connection) {
            (Self::Send, false) => HandlerSource::shared(SendHandler),
            (Self::Send, true) => HandlerSource::per_connection(|| SendHandler),
            (Self::Broadcast, false) => HandlerSource::shared(BroadcastHandler),
            (Self::Broadcast, true) => HandlerSource::per_connection(|| BroadcastHandler),
            (Self::Hello, false) => HandlerSource::shared(HelloHandler),
            (Self::Hello, true) => HandlerSource::per_connection(|| HelloHandler),
        }
    }
}

/// Arguments of the `tetherd` binary.
#[derive(Parser, Debug)]
#[command(name = "tetherd", version, about = "Threaded TCP message server")]
pub struct Cli {
    /// Server settings.
    #[command(flatten)]
    pub server: ServerArgs,
    /// Handler applied to every received chunk.
    #[arg(long, value_enum, default_value_t = HandlerKind::Send)]
    pub handler: HandlerKind,
    /// Builds a fresh handler for each connection instead of sharing one.
    #[arg(long)]
    pub per_connection: bool,
}

/// Failures that end the binary with a non-zero status.
#[derive(Debug, Error)]
pub enum AppError {
    /// The telemetry subscriber could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// The listener failed to start or stop.
    #[error(transparent)]
    Listener(#[from] ListenerError),
    /// Signal handlers could not be installed.
    #[error(transparent)]
    Signal(#[from] SignalError),
}

/// Parses `args`, serves until `signal` fires, and reports failures on
/// `stderr`.
pub fn run<I, T, E>(args: I, stderr: &mut E, signal: &dyn ShutdownSignal) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) if error.use_stderr() => {
            let _ = write!(stderr, "{}", error.render());
            return ExitCode::FAILURE;
        }
        Err(error) => {
            // Help and version output belongs on stdout.
            let _ = error.print();
            return ExitCode::SUCCESS;
        }
    };
    match serve(cli, signal) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report(stderr, &error);
            ExitCode::FAILURE
        }
    }
}

fn serve(cli: Cli, signal: &dyn ShutdownSignal) -> Result<(), AppError> {
    let config = cli.server.into_config();
    let reporter: Arc<dyn ServerReporter> = if config.logging.enabled {
        telemetry::initialise(&config.logging)?;
        Arc::new(StructuredServerReporter::new())
    } else {
        Arc::new(NoopServerReporter)
    };
    let handle = Server::new(config, cli.handler.source(cli.per_connection))
        .with_reporter(reporter)
        .start()?;
    let waited = signal.wait();
    handle.stop()?;
    waited.map_err(AppError::from)
}

fn report<E: Write>(stderr: &mut E, error: &AppError) {
    let _ = writeln!(stderr, "tetherd: {error}");
}
