//! Error types for the reconciliation engine
//!
//! Every remote-store failure propagates unmodified except `NotFound`,
//! which the lifecycle controller interprets per ownership mode.

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the reconciliation engine
#[derive(Error, Debug)]
pub enum Error {
    /// Transport failure reported by a remote object store
    #[error("Transport error: {0}")]
    Transport(String),

    /// Authentication or authorization failure
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Remote object not found
    #[error("Object not found: {0}")]
    NotFound(String),

    /// An adopted object does not exist on the remote side
    #[error("Adopted object {0} does not exist; nothing to manage")]
    MissingAdoptedObject(String),

    /// Caller misuse: malformed import identity, missing required
    /// attribute, or an operation invalid for the current lifecycle phase
    #[error("Usage error: {0}")]
    Usage(String),

    /// Remote store refused a write because of a conflicting object
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Attribute schema violations (wrong JSON type for an attribute, etc.)
    #[error("Schema error: {0}")]
    Schema(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Tracked state store errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Store-specific error
    #[error("Store error ({store}): {message}")]
    Store {
        /// Store name
        store: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a usage error
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a schema error
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a store-specific error
    pub fn store(store: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            store: store.into(),
            message: message.into(),
        }
    }

    /// Whether this error is the remote store's "not found" signal
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
