//! Error taxonomy for the mock conductor.

use conductor_wire::WireError;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Result type alias using [`ConductorError`].
pub type Result<T> = std::result::Result<T, ConductorError>;

/// Errors surfaced by the mock conductor.
///
/// Registration-time misuse (`UnknownRequestType`) and broadcast misuse
/// (`NoAppInterfaces`) surface only to the test code driving the mock.
/// `NoMatchingResponse` is converted into a wire-level `error` reply by
/// the dispatcher and never tears down a connection.
#[derive(Debug, Error)]
pub enum ConductorError {
    /// A response was registered under a tag outside the fixed vocabulary.
    #[error("Unknown request type: {0}")]
    UnknownRequestType(String),

    /// No tier held a usable response for the derived key.
    #[error("No more responses for: {0}")]
    NoMatchingResponse(String),

    /// A signal broadcast was requested with zero app-side connections.
    #[error("broadcast_app_signal called with no app interfaces attached")]
    NoAppInterfaces,

    /// Frame encode/decode failure.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Socket-level I/O failure (bind, accept).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket protocol failure.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
}
