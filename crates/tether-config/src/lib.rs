//! Shared configuration for the Tether server and client.
//!
//! Both binaries resolve their settings from command-line flags layered over
//! `TETHER_*` environment variables and the defaults in [`defaults`]. The
//! resolved [`ServerConfig`] and [`ClientConfig`] values are plain data: the
//! libraries accept them directly so embedding applications can build them in
//! code without going through the argument parser.

mod cli;
pub mod defaults;
mod duration;
mod errors;
mod logging;
mod settings;

pub use cli::{ClientArgs, LoggingArgs, ServerArgs};
pub use duration::{DurationParseError, parse_seconds};
pub use errors::ConfigError;
pub use logging::{LogFormat, LogFormatParseError, LoggingConfig};
pub use settings::{ClientConfig, ServerConfig};
