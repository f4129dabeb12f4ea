//! Command-line runtime for the `tether` binary.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use thiserror::Error;

use tether_config::ClientArgs;
use tether_core::TelemetryError;
use tether_core::telemetry;

use crate::connection::{Client, Disconnect};
use crate::console::ConsoleStep;
use crate::errors::ClientError;
use crate::observer::Observer;
use crate::observers::{EchoObserver, LogDebugObserver, LogInfoObserver};
use crate::reporter::{ClientReporter, NoopClientReporter, StructuredClientReporter};

/// Built-in observer selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ObserverKind {
    /// Print each message on standard output.
    Echo,
    /// Log each message at debug level.
    Debug,
    /// Log each message at info level.
    Info,
}

impl ObserverKind {
    /// Observers used when none is named.
    pub const DEFAULTS: [Self; 2] = [Self::Echo, Self::Debug];

    /// Builds the observer.
    #[must_use]
    pub fn build(self) -> Arc<dyn Observer> {
        match self {
            Self::Echo => Arc::new(EchoObserver::stdout()),
            Self::Debug => Arc::new(LogDebugObserver),
            Self::Info => Arc::new(LogInfoObserver),
        }
    }
}

/// Arguments of the `tether` binary.
#[derive(Parser, Debug)]
#[command(name = "tether", version, about = "Console client for a Tether server")]
pub struct Cli {
    /// Client settings.
    #[command(flatten)]
    pub client: ClientArgs,
    /// Observer applied to every received message; repeat to add more.
    /// Defaults to `echo` and `debug`.
    #[arg(long = "observer", value_enum)]
    pub observers: Vec<ObserverKind>,
}

impl Cli {
    /// Observers to register, in order, applying the defaults.
    #[must_use]
    pub fn observer_kinds(&self) -> Vec<ObserverKind> {
        if self.observers.is_empty() {
            ObserverKind::DEFAULTS.to_vec()
        } else {
            self.observers.clone()
        }
    }
}

/// Failures that end the binary with a non-zero status.
#[derive(Debug, Error)]
pub enum AppError {
    /// The telemetry subscriber could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// Connecting or running the client failed.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Parses `args`, connects, and drives `console` until it or the server
/// ends the session. Failures are reported on `stderr`.
pub fn run<I, T, E, W>(args: I, stderr: &mut E, console: ConsoleStep<W>) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    E: Write,
    W: Write,
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
    match converse(&cli, console) {
        Ok(Disconnect::ReceiveFailed(kind)) => {
            let _ = writeln!(stderr, "tether: connection lost: {kind}");
            ExitCode::FAILURE
        }
        Ok(Disconnect::Local | Disconnect::ServerClosed) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "tether: {error}");
            ExitCode::FAILURE
        }
    }
}

fn converse<W: Write>(cli: &Cli, console: ConsoleStep<W>) -> Result<Disconnect, AppError> {
    let config = cli.client.clone().into_config();
    let mut prompt = console.with_poll_interval(config.time_out);
    let reporter: Arc<dyn ClientReporter> = if config.logging.enabled {
        telemetry::initialise(&config.logging)?;
        Arc::new(StructuredClientReporter::new())
    } else {
        Arc::new(NoopClientReporter)
    };
    let client = cli
        .observer_kinds()
        .into_iter()
        .fold(Client::new(config).with_reporter(reporter), |client, kind| {
            client.with_observer(kind.build())
        });
    let summary = client
        .connect()?
        .run(|connection| prompt.step(connection))?;
    Ok(summary.disconnect)
}
