//! Behavioural suites for the server over loopback sockets.

mod server_behaviour;
mod support;
