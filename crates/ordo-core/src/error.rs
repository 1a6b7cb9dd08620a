//! Error types and result aliases for ordo.
//!
//! Errors raised while describing a deployment batch: platform configuration
//! and change-type lookups. Ordering failures live in `ordo-sort`.

/// The result type used throughout ordo.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building the deployment model.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Platform configuration could not be loaded.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the invalid setting.
        message: String,
    },

    /// A change type name is not registered with the platform.
    #[error("unknown change type: {name}")]
    UnknownChangeType {
        /// The name that was looked up.
        name: String,
    },
}

impl Error {
    /// Creates a new configuration error with the given message.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new unknown change type error.
    #[must_use]
    pub fn unknown_change_type(name: impl Into<String>) -> Self {
        Self::UnknownChangeType { name: name.into() }
    }
}
