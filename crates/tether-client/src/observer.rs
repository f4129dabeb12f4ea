//! Observer extension point and the ordered registry that drives it.

use std::any;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;

use tether_core::panic_message;

use crate::reporter::{ClientReporter, NoopClientReporter};

/// Where and when a message arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveContext {
    /// Address of the server that sent the message.
    pub server: SocketAddr,
    /// One-based index of the chunk on this connection.
    pub sequence: u64,
}

/// Failure raised by an observer. Logged and skipped.
#[derive(Debug, Error)]
pub enum ObserverError {
    /// Writing the message out failed.
    #[error("failed to write message: {0}")]
    Write(#[from] io::Error),
    /// The observer refused the message.
    #[error("rejected message: {reason}")]
    Rejected {
        /// Why the message was refused.
        reason: String,
    },
    /// The observer panicked.
    #[error("observer panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
}

impl ObserverError {
    /// Builds an [`ObserverError::Rejected`] error.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// Reacts to every message the client receives.
///
/// Observers run synchronously on the receive thread in registration order.
pub trait Observer: Send + Sync {
    /// Handles one received chunk.
    fn notify(&self, context: &ReceiveContext, message: &[u8]) -> Result<(), ObserverError>;

    /// Name used in diagnostics.
    fn name(&self) -> &str {
        any::type_name::<Self>()
    }
}

/// Ordered list of observers.
///
/// Populated during setup and only read while the receive path runs.
pub struct ObserverRegistry {
    observers: Vec<Arc<dyn Observer>>,
    reporter: Arc<dyn ClientReporter>,
}

impl ObserverRegistry {
    /// Builds an empty registry reporting to `reporter`.
    #[must_use]
    pub fn new(reporter: Arc<dyn ClientReporter>) -> Self {
        Self {
            observers: Vec::new(),
            reporter,
        }
    }

    pub(crate) fn set_reporter(&mut self, reporter: Arc<dyn ClientReporter>) {
        self.reporter = reporter;
    }

    /// Appends `observer`. Registering the same instance twice is reported
    /// and ignored; returns whether the observer was added.
    pub fn register(&mut self, observer: Arc<dyn Observer>) -> bool {
        if self.position(&observer).is_some() {
            self.reporter.observer_already_registered(observer.name());
            return false;
        }
        self.observers.push(observer);
        true
    }

    /// Removes `observer` by identity. Returns whether it was present.
    pub fn unregister(&mut self, observer: &Arc<dyn Observer>) -> bool {
        match self.position(observer) {
            Some(index) => {
                self.observers.remove(index);
                true
            }
            None => {
                self.reporter.observer_not_registered(observer.name());
                false
            }
        }
    }

    /// Delivers `message` to every observer in order.
    ///
    /// A failing or panicking observer is reported and the rest still run.
    /// Returns the number of observers that succeeded.
    pub fn notify_all(&self, context: &ReceiveContext, message: &[u8]) -> usize {
        let mut delivered = 0;
        for observer in &self.observers {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                observer.notify(context, message)
            }))
            .unwrap_or_else(|payload| {
                Err(ObserverError::Panicked {
                    message: panic_message(payload.as_ref()),
                })
            });
            match outcome {
                Ok(()) => delivered += 1,
                Err(error) => self.reporter.observer_failed(observer.name(), &error),
            }
        }
        delivered
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Reports whether no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    fn position(&self, observer: &Arc<dyn Observer>) -> Option<usize> {
        self.observers
            .iter()
            .position(|existing| std::ptr::addr_eq(Arc::as_ptr(existing), Arc::as_ptr(observer)))
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new(Arc::new(NoopClientReporter))
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_list()
            .entries(self.observers.iter().map(|observer| observer.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rstest::{fixture, rstest};

    #[derive(Default)]
    struct RecordingReporter {
        warnings: Mutex<Vec<String>>,
        failures: AtomicUsize,
    }

    impl ClientReporter for RecordingReporter {
        fn connected(&self, _server: SocketAddr) {}

        fn observer_failed(&self, _observer: &str, _error: &ObserverError) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }

        fn observer_already_registered(&self, observer: &str) {
            self.warn(format!("duplicate {observer}"));
        }

        fn observer_not_registered(&self, observer: &str) {
            self.warn(format!("missing {observer}"));
        }

        fn server_closed(&self, _server: SocketAddr) {}

        fn receive_failed(&self, _error: &io::Error) {}

        fn close_failed(&self, _error: &io::Error) {}

        fn disconnected(&self, _server: SocketAddr, _reason: &crate::Disconnect) {}
    }

    impl RecordingReporter {
        fn warn(&self, warning: String) {
            self.warnings
                .lock()
                .expect("warnings mutex poisoned")
                .push(warning);
        }
    }

    struct Tagged {
        tag: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Observer for Tagged {
        fn notify(&self, _context: &ReceiveContext, _message: &[u8]) -> Result<(), ObserverError> {
            self.log.lock().expect("log mutex poisoned").push(self.tag);
            Ok(())
        }

        fn name(&self) -> &str {
            self.tag
        }
    }

    struct Failing;

    impl Observer for Failing {
        fn notify(&self, _context: &ReceiveContext, _message: &[u8]) -> Result<(), ObserverError> {
            Err(ObserverError::rejected("always"))
        }
    }

    struct Panicking;

    impl Observer for Panicking {
        fn notify(&self, _context: &ReceiveContext, _message: &[u8]) -> Result<(), ObserverError> {
            panic!("observer exploded");
        }
    }

    fn context() -> ReceiveContext {
        ReceiveContext {
            server: SocketAddr::from(([127, 0, 0, 1], 4000)),
            sequence: 1,
        }
    }

    fn tagged(tag: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<dyn Observer> {
        Arc::new(Tagged {
            tag,
            log: Arc::clone(log),
        })
    }

    #[fixture]
    fn reporter() -> Arc<RecordingReporter> {
        Arc::new(RecordingReporter::default())
    }

    #[rstest]
    fn observers_run_in_registration_order(reporter: Arc<RecordingReporter>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ObserverRegistry::new(reporter);
        registry.register(tagged("A", &log));
        registry.register(tagged("B", &log));

        assert_eq!(registry.notify_all(&context(), b"x"), 2);
        assert_eq!(*log.lock().expect("log mutex poisoned"), vec!["A", "B"]);
    }

    #[rstest]
    #[case::error(Arc::new(Failing) as Arc<dyn Observer>)]
    #[case::panic(Arc::new(Panicking) as Arc<dyn Observer>)]
    fn failing_observers_do_not_stop_later_ones(
        reporter: Arc<RecordingReporter>,
        #[case] faulty: Arc<dyn Observer>,
    ) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ObserverRegistry::new(Arc::clone(&reporter) as Arc<dyn ClientReporter>);
        registry.register(faulty);
        registry.register(tagged("after", &log));

        assert_eq!(registry.notify_all(&context(), b"x"), 1);
        assert_eq!(*log.lock().expect("log mutex poisoned"), vec!["after"]);
        assert_eq!(reporter.failures.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    fn duplicate_registration_keeps_one_entry(reporter: Arc<RecordingReporter>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let observer = tagged("A", &log);
        let mut registry = ObserverRegistry::new(Arc::clone(&reporter) as Arc<dyn ClientReporter>);

        assert!(registry.register(Arc::clone(&observer)));
        assert!(!registry.register(observer));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            *reporter.warnings.lock().expect("warnings mutex poisoned"),
            vec!["duplicate A".to_owned()]
        );
    }

    #[rstest]
    fn unregister_removes_by_identity(reporter: Arc<RecordingReporter>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = tagged("A", &log);
        let twin = tagged("A", &log);
        let mut registry = ObserverRegistry::new(Arc::clone(&reporter) as Arc<dyn ClientReporter>);
        registry.register(Arc::clone(&first));

        assert!(!registry.unregister(&twin));
        assert!(registry.unregister(&first));
        assert!(registry.is_empty());
        assert_eq!(
            *reporter.warnings.lock().expect("warnings mutex poisoned"),
            vec!["missing A".to_owned()]
        );
    }
}
