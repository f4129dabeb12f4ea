//! Entry point for the `tetherd` server.
//!
//! Delegates to [`tetherd::run`], which parses flags, starts the listener,
//! and stops it once `SIGINT` or `SIGTERM` arrives.

use std::io::{self, StderrLock};
use std::process::ExitCode;

use tetherd::SystemShutdownSignal;

fn main() -> ExitCode {
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    tetherd::run(std::env::args_os(), &mut stderr, &SystemShutdownSignal)
}
