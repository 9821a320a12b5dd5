//! Error types for gamechat

use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Bridge error types
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Listener socket path is held by a live listener or cannot be reclaimed
    #[error("Address in use: {0}")]
    AddressInUse(String),

    /// Binding the listener failed
    #[error("Bind failed: {0}")]
    Bind(String),

    /// IPC communication error
    #[error("IPC error: {0}")]
    IpcError(String),

    /// Dispatcher could not deliver an event to the chat platform
    #[error("Dispatch error: {0}")]
    DispatchError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Invalid configuration
    #[error("Config error: {0}")]
    ConfigError(String),
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::SerializationError(err.to_string())
    }
}

/// Why a protocol line did not produce an event.
///
/// Rejections are the normal outcome for malformed or unknown input and are
/// never escalated past the parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Line had no event type token, or the token is not an integer
    #[error("invalid event type: {0:?}")]
    InvalidEventType(String),

    /// Event id is not in the active catalog
    #[error("unknown event type: {0}")]
    UnknownEventType(u32),

    /// Fixed-arity event received the wrong number of arguments
    #[error("{kind} expects {expected} argument(s), got {got}")]
    Arity {
        kind: &'static str,
        expected: usize,
        got: usize,
    },

    /// Numeric field did not parse
    #[error("invalid number for {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    /// Free-text event without the `;` separator
    #[error("missing ';' separator")]
    MissingSeparator,

    /// Required `;`-delimited field absent
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Name shorter than the minimum length after sanitizing
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    /// Message empty after sanitizing
    #[error("empty message")]
    EmptyMessage,
}
