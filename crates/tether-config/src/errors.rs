use thiserror::Error;

/// Configuration values that cannot be used to start a server or client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A receive or shutdown interval was zero.
    #[error("{field} must be greater than zero")]
    ZeroInterval {
        /// Name of the offending setting.
        field: &'static str,
    },
    /// A buffer or queue size was zero.
    #[error("{field} must be greater than zero")]
    ZeroSize {
        /// Name of the offending setting.
        field: &'static str,
    },
    /// The listen backlog does not fit the platform's socket API.
    #[error("request queue size {value} exceeds the supported maximum")]
    BacklogTooLarge {
        /// Configured backlog.
        value: u32,
    },
}
