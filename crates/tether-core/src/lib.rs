//! Primitives shared by the Tether server and client.
//!
//! Both sides of the connection run the same polling discipline: every loop
//! blocks only inside a timeout-bounded receive, and re-checks a
//! [`ShutdownFlag`] whenever that receive times out. This crate holds that
//! discipline ([`ReceiveBuffer`], [`Received`]) together with address
//! resolution and the one-time telemetry installation used by both binaries.

mod address;
mod panic;
mod receive;
mod shutdown;
pub mod telemetry;

pub use address::{resolve_socket_addr, shutdown_stream};
pub use panic::panic_message;
pub use receive::{ReceiveBuffer, Received};
pub use shutdown::{ShutdownFlag, ShutdownGuard};
pub use telemetry::{TelemetryError, TelemetryHandle};
