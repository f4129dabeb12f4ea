//! Built-in message handlers.
//!
//! Each handler treats the incoming bytes as opaque apart from
//! [`HelloHandler`], which decodes them as lossy UTF-8.

use crate::dispatch::{HandlerError, MessageHandler};
use crate::transport::ConnectionSession;

/// Echoes every chunk back to the connection that sent it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SendHandler;

impl MessageHandler for SendHandler {
    fn handle(&self, data: &[u8], session: &ConnectionSession) -> Result<(), HandlerError> {
        session.send(data)?;
        Ok(())
    }
}

/// Sends every chunk to all connected clients, the sender included.
#[derive(Debug, Default, Clone, Copy)]
pub struct BroadcastHandler;

impl MessageHandler for BroadcastHandler {
    fn handle(&self, data: &[u8], session: &ConnectionSession) -> Result<(), HandlerError> {
        session.broadcast(data);
        Ok(())
    }
}

/// Greets everyone with `<session name>: Hello <text>!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HelloHandler;

impl HelloHandler {
    /// Builds the greeting broadcast for `data` received on `session_name`.
    #[must_use]
    pub fn greeting(session_name: &str, data: &[u8]) -> String {
        let text = String::from_utf8_lossy(data);
        format!("{session_name}: Hello {}!", text.trim())
    }
}

impl MessageHandler for HelloHandler {
    fn handle(&self, data: &[u8], session: &ConnectionSession) -> Result<(), HandlerError> {
        let greeting = Self::greeting(session.name(), data);
        session.broadcast(greeting.as_bytes());
        Ok(())
    }
}
