//! Error handling for moonview
//!
//! Provides error types for the two fallible layers of the subsystem:
//! - Transport errors (connection/websocket related)
//! - RPC errors (call correlation and server responses)
//!
//! Missing state-store paths are deliberately *not* errors; the store
//! answers those with the JSON null sentinel.
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Transport error type
///
/// Represents failures of the persistent websocket connection to the
/// printer controller API.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// Endpoint URL could not be parsed
    #[error("Invalid endpoint URL: {url}")]
    InvalidUrl {
        /// The URL that failed to parse.
        url: String,
    },

    /// Connection attempt failed
    #[error("Failed to connect to {url}: {reason}")]
    ConnectFailed {
        /// The endpoint that refused the connection.
        url: String,
        /// The reason the connection failed.
        reason: String,
    },

    /// An established connection was lost
    #[error("Connection lost: {reason}")]
    ConnectionLost {
        /// The reason the connection dropped.
        reason: String,
    },

    /// An outbound frame could not be sent
    #[error("Failed to send frame: {reason}")]
    SendFailed {
        /// The reason the send failed.
        reason: String,
    },

    /// The transport task has shut down
    #[error("Transport is closed")]
    Closed,
}

/// RPC error type
///
/// The typed outcome delivered to a caller when a request cannot complete
/// with a result payload. Failure-to-fire is never silent: a purged call
/// observes [`RpcError::Disconnected`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcError {
    /// The connection dropped while the call was outstanding.
    ///
    /// Pending calls are purged on disconnect, never retried across a
    /// reconnect.
    #[error("Connection dropped before a response arrived")]
    Disconnected,

    /// The server answered with an error payload
    #[error("Server error {code}: {message}")]
    Server {
        /// The JSON-RPC error code.
        code: i64,
        /// The server-provided error message.
        message: String,
    },

    /// A response frame could not be decoded
    #[error("Malformed response: {reason}")]
    MalformedResponse {
        /// The reason the response could not be decoded.
        reason: String,
    },
}

/// Main error type for moonview
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// RPC error
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a transport error
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Check if this error was caused by a connection drop
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Error::Transport(TransportError::ConnectionLost { .. })
                | Error::Transport(TransportError::Closed)
                | Error::Rpc(RpcError::Disconnected)
        )
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
