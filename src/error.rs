//! Error types for the modal routing engine.

use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to (de)serialize stored value for '{key}': {message}")]
    Serialization { key: String, message: String },
}

/// Session-history errors
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History traversal out of range: position {position} + delta {delta} (length {length})")]
    OutOfRange {
        position: i64,
        delta: i64,
        length: usize,
    },

    #[error("History event stream closed before the traversal settled")]
    EventStreamClosed,
}

/// Errors surfaced by the modal controller, the registry and the route setup
#[derive(Debug, Error)]
pub enum ModalError {
    #[error("Modal already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Modal already open: {0}")]
    AlreadyOpen(String),

    #[error("Modal not open: {0}")]
    NotOpen(String),

    #[error("Modal options already settled for '{0}'; setup was invoked twice without teardown")]
    AlreadySettled(String),

    #[error("Query key '{key}' uses the reserved modal prefix '{prefix}'")]
    ReservedQueryKey { key: String, prefix: String },

    #[error("Invalid route configuration: {0}")]
    InvalidRouteConfiguration(String),

    #[error("Cannot decide which modal to set up for '{name}': candidates {candidates:?}")]
    MultipleModalsAmbiguous {
        name: String,
        candidates: Vec<String>,
    },

    #[error("No base route found for modal: {0}")]
    NoBaseRouteFound(String),

    #[error("History tag not found: {0}")]
    TagNotFound(String),

    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for ModalError {
    fn from(err: config::ConfigError) -> Self {
        ModalError::ConfigError(err.to_string())
    }
}
