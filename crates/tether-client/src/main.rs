//! Entry point for the `tether` console client.
//!
//! Delegates to [`tether_client::run`], which connects to the server and
//! forwards each line typed on standard input until end of input or until
//! the server closes the connection.

use std::io::{self, StderrLock};
use std::process::ExitCode;

use tether_client::console::ConsoleStep;

fn main() -> ExitCode {
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    tether_client::run(std::env::args_os(), &mut stderr, ConsoleStep::stdio())
}
