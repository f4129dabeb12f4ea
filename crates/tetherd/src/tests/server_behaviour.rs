//! Behavioural scenarios for the server lifecycle.

use std::cell::RefCell;
use std::net::TcpStream;
use std::sync::Arc;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::dispatch::HandlerSource;
use crate::handlers::BroadcastHandler;
use crate::transport::test_utils::read_available;
use crate::transport::{ServerHandle, StopReport};

use super::support::{
    RecordingServerReporter, closed_by_server, connect_clients, send, start_server, wait_until,
};

struct ServerWorld {
    handle: Option<ServerHandle>,
    clients: Vec<TcpStream>,
    report: Option<StopReport>,
}

impl ServerWorld {
    const fn new() -> Self {
        Self {
            handle: None,
            clients: Vec::new(),
            report: None,
        }
    }

    fn handle(&self) -> &ServerHandle {
        self.handle.as_ref().expect("server should be running")
    }
}

impl Drop for ServerWorld {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.stop();
        }
    }
}

#[fixture]
fn world() -> RefCell<ServerWorld> {
    RefCell::new(ServerWorld::new())
}

#[given("a broadcasting server is running")]
fn given_broadcasting_server(world: &RefCell<ServerWorld>) {
    let reporter = Arc::new(RecordingServerReporter::default());
    let handle = start_server(HandlerSource::shared(BroadcastHandler), reporter);
    world.borrow_mut().handle = Some(handle);
}

#[when("{count} clients connect")]
fn when_clients_connect(world: &RefCell<ServerWorld>, count: usize) {
    let clients = connect_clients(world.borrow().handle(), count);
    world.borrow_mut().clients = clients;
}

#[when("the first client sends {payload}")]
fn when_first_client_sends(world: &RefCell<ServerWorld>, payload: String) {
    let text = payload.trim_matches('"').to_owned();
    let mut state = world.borrow_mut();
    let sender = state.clients.first_mut().expect("at least one client");
    send(sender, text.as_bytes());
}

#[when("the last client disconnects")]
fn when_last_client_disconnects(world: &RefCell<ServerWorld>) {
    let departed = world.borrow_mut().clients.pop();
    drop(departed);
}

#[when("the server is stopped")]
fn when_server_is_stopped(world: &RefCell<ServerWorld>) {
    let handle = world.borrow_mut().handle.take().expect("server should be running");
    let report = handle.stop().expect("stop server");
    world.borrow_mut().report = Some(report);
}

#[then("every client receives {payload}")]
fn then_every_client_receives(world: &RefCell<ServerWorld>, payload: String) {
    let text = payload.trim_matches('"').to_owned();
    for client in &mut world.borrow_mut().clients {
        assert_eq!(read_available(client), text.as_bytes());
    }
}

#[then("the server tracks {count} connection")]
fn then_server_tracks(world: &RefCell<ServerWorld>, count: usize) {
    let state = world.borrow();
    assert!(
        wait_until(|| state.handle().connection_count() == count),
        "expected {count} connections, found {}",
        state.handle().connection_count()
    );
}

#[then("every client is disconnected")]
fn then_every_client_is_disconnected(world: &RefCell<ServerWorld>) {
    for client in &mut world.borrow_mut().clients {
        assert!(closed_by_server(client), "client socket left open");
    }
}

#[then("no session was abandoned")]
fn then_no_session_abandoned(world: &RefCell<ServerWorld>) {
    let report = world.borrow().report.expect("server should have stopped");
    assert_eq!(report.abandoned, 0);
}

#[scenario(
    path = "tests/features/server_sessions.feature",
    name = "Broadcasting reaches every connected client"
)]
fn broadcasting_reaches_every_client(world: RefCell<ServerWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/server_sessions.feature",
    name = "A departed client is removed from the registry"
)]
fn departed_client_is_removed(world: RefCell<ServerWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/server_sessions.feature",
    name = "Stopping the server closes every client"
)]
fn stopping_closes_every_client(world: RefCell<ServerWorld>) {
    drop(world);
}
