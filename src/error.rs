//! Error handling for the Air Sentinel crate.
//!
//! Two error types live here. [`SentinelError`] is returned by operations that
//! have a caller to report to (relay startup, configuration, reading sources).
//! [`FeedError`] is never returned: the live-feed client delivers it to its
//! registered error listeners instead.

/// A specialized `Result` type for Air Sentinel operations.
pub type Result<T> = std::result::Result<T, SentinelError>;

/// The main error type for Air Sentinel operations.
#[derive(Debug, thiserror::Error)]
pub enum SentinelError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Coordinates outside the valid latitude/longitude range
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SentinelError {
    /// Create a new invalid-coordinates error
    pub fn invalid_coordinates(msg: impl Into<String>) -> Self {
        Self::InvalidCoordinates(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// A failure reported by the live-feed client to its error listeners.
///
/// The display strings are what dashboards show to users, so they are kept
/// short and stable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeedError {
    /// No auth token was available when the connection was initialised
    #[error("No authentication token found")]
    MissingCredential,

    /// An inbound frame could not be parsed as a feed message
    #[error("Invalid message format")]
    InvalidMessage,

    /// The data source sent an explicit error notice
    #[error("{0}")]
    Remote(String),

    /// The transport failed while connecting or while open
    #[error("WebSocket connection error: {0}")]
    Connection(String),

    /// A location update was requested while the socket was not open
    #[error("WebSocket is not connected")]
    NotConnected,

    /// The location update could not be handed to the socket
    #[error("Failed to send location update")]
    SendFailed,

    /// The retry budget ran out; the client will not reconnect on its own
    #[error("WebSocket connection failed after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },
}
