//! Integration tests for the `tetherd` binary entry point.
//!
//! Covers argument handling and start-up failures; serving behaviour is
//! exercised by the library suites.

use std::net::TcpListener;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;

#[test]
fn help_lists_the_handler_choices() {
    let mut command = cargo_bin_cmd!("tetherd");
    command.arg("--help");
    command
        .assert()
        .success()
        .stdout(contains("--handler"))
        .stdout(contains("--per-connection"));
}

#[test]
fn zero_request_queue_exits_with_failure() {
    let mut command = cargo_bin_cmd!("tetherd");
    command.args(["--host", "127.0.0.1", "--port", "0", "--request-queue-size", "0"]);
    command
        .assert()
        .failure()
        .stderr(contains("request_queue_size must be greater than zero"));
}

#[test]
fn occupied_port_exits_with_failure() {
    let occupied = TcpListener::bind(("127.0.0.1", 0)).expect("reserve port");
    let port = occupied.local_addr().expect("reserved address").port();

    let mut command = cargo_bin_cmd!("tetherd");
    command.args(["--host", "127.0.0.1", "--port", &port.to_string()]);
    command
        .assert()
        .failure()
        .stderr(contains("failed to bind TCP listener"));
}

#[test]
fn non_numeric_poll_interval_is_rejected() {
    let mut command = cargo_bin_cmd!("tetherd");
    command.args(["--poll-interval", "soon"]);
    command
        .assert()
        .failure()
        .stderr(contains("is not a number of seconds"));
}
