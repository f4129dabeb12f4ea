//! Convenience builder tying configuration, handler, and reporter together.

use std::sync::Arc;

use tether_config::ServerConfig;

use crate::dispatch::HandlerSource;
use crate::reporter::{NoopServerReporter, ServerReporter};
use crate::transport::{ListenerError, ServerHandle, ServerListener};

/// A configured but not yet started server.
///
/// ```no_run
/// use tetherd::{HandlerSource, Server, handlers::SendHandler};
/// use tether_config::ServerConfig;
///
/// let handle = Server::new(ServerConfig::new("127.0.0.1", 4000), HandlerSource::shared(SendHandler))
///     .start()
///     .expect("start server");
/// handle.stop().expect("stop server");
/// ```
pub struct Server {
    config: ServerConfig,
    handlers: HandlerSource,
    reporter: Arc<dyn ServerReporter>,
}

impl Server {
    /// Builds a server that reports nothing.
    #[must_use]
    pub fn new(config: ServerConfig, handlers: HandlerSource) -> Self {
        Self {
            config,
            handlers,
            reporter: Arc::new(NoopServerReporter),
        }
    }

    /// Replaces the lifecycle reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ServerReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Settings the server will bind with.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Binds the listener and starts accepting connections.
    pub fn start(self) -> Result<ServerHandle, ListenerError> {
        ServerListener::bind(&self.config)?.start(self.handlers, self.reporter)
    }
}
