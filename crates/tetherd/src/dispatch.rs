//! Handler extension point invoked by sessions for every received chunk.
//!
//! A handler sees the raw bytes of one `recv` call together with the
//! [`ConnectionSession`] that produced them, and reacts by replying to the
//! sender, broadcasting, or both. It runs inline on the session thread, so a
//! slow handler delays only its own connection's next receive.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;

use tether_core::panic_message;

use crate::transport::{ConnectionSession, RegistryError};

/// Failure raised by a handler. Closes the connection that triggered it.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A reply could not be delivered.
    #[error("failed to deliver reply: {0}")]
    Delivery(#[from] RegistryError),
    /// The handler rejected the input.
    #[error("rejected input: {reason}")]
    Rejected {
        /// Why the input was refused.
        reason: String,
    },
    /// The handler panicked.
    #[error("handler panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
}

impl HandlerError {
    /// Builds a [`HandlerError::Rejected`] error.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// Strategy applied to each chunk a session receives.
///
/// A single instance may serve every session concurrently (see
/// [`HandlerSource::Shared`]), so implementations must synchronise any
/// mutable state they hold unless they are built per connection.
pub trait MessageHandler: Send + Sync {
    /// Handles one chunk from `session`.
    fn handle(&self, data: &[u8], session: &ConnectionSession) -> Result<(), HandlerError>;
}

impl<T> MessageHandler for Arc<T>
where
    T: MessageHandler + ?Sized,
{
    fn handle(&self, data: &[u8], session: &ConnectionSession) -> Result<(), HandlerError> {
        (**self).handle(data, session)
    }
}

type HandlerFactory = dyn Fn() -> Box<dyn MessageHandler> + Send + Sync;

/// How the listener obtains a handler for each accepted connection.
#[derive(Clone)]
pub enum HandlerSource {
    /// One instance serves every session.
    Shared(Arc<dyn MessageHandler>),
    /// A fresh instance is constructed for each session.
    PerConnection(Arc<HandlerFactory>),
}

impl HandlerSource {
    /// Shares `handler` across all sessions.
    #[must_use]
    pub fn shared<H>(handler: H) -> Self
    where
        H: MessageHandler + 'static,
    {
        Self::Shared(Arc::new(handler))
    }

    /// Builds a new handler with `factory` for every session.
    #[must_use]
    pub fn per_connection<F, H>(factory: F) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: MessageHandler + 'static,
    {
        Self::PerConnection(Arc::new(move || Box::new(factory()) as Box<dyn MessageHandler>))
    }

    /// Resolves the handler for one newly accepted connection.
    pub(crate) fn resolve(&self) -> Arc<dyn MessageHandler> {
        match self {
            Self::Shared(handler) => Arc::clone(handler),
            Self::PerConnection(factory) => Arc::from(factory()),
        }
    }
}

impl fmt::Debug for HandlerSource {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared(_) => formatter.write_str("HandlerSource::Shared"),
            Self::PerConnection(_) => formatter.write_str("HandlerSource::PerConnection"),
        }
    }
}

/// Runs `handler` and converts a panic into [`HandlerError::Panicked`].
pub(crate) fn dispatch(
    handler: &dyn MessageHandler,
    data: &[u8],
    session: &ConnectionSession,
) -> Result<(), HandlerError> {
    match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(data, session))) {
        Ok(result) => result,
        Err(payload) => Err(HandlerError::Panicked {
            message: panic_message(payload.as_ref()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting;

    impl MessageHandler for Counting {
        fn handle(&self, _data: &[u8], _session: &ConnectionSession) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    #[test]
    fn shared_source_reuses_one_instance() {
        let source = HandlerSource::shared(Counting);
        let first = source.resolve();
        let second = source.resolve();
        assert!(std::ptr::addr_eq(Arc::as_ptr(&first), Arc::as_ptr(&second)));
    }

    #[test]
    fn per_connection_source_builds_fresh_instances() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let source = HandlerSource::per_connection(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Counting
        });
        let first = source.resolve();
        let second = source.resolve();
        assert!(!std::ptr::addr_eq(Arc::as_ptr(&first), Arc::as_ptr(&second)));
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn rejected_errors_render_reason() {
        let error = HandlerError::rejected("not utf-8");
        assert_eq!(error.to_string(), "rejected input: not utf-8");
    }
}
