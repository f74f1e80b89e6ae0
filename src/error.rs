//! Error types for danmu-client.

use thiserror::Error;

use crate::session::SessionState;

/// Main error type for all danmu operations.
#[derive(Debug, Error)]
pub enum DanmuError {
    /// Dialing the danmu server failed.
    #[error("Connection error: {0}")]
    Connection(#[source] std::io::Error),

    /// Login, login acknowledgement or group join failed.
    #[error("Room join error: {0}")]
    RoomJoin(String),

    /// Reading a frame header or body failed (includes EOF and read timeout).
    #[error("Read error: {0}")]
    Read(#[source] std::io::Error),

    /// A body segment is missing its `@=` separator.
    #[error("Malformed body: {0}")]
    MalformedBody(String),

    /// Writing a request or heartbeat failed.
    #[error("Write error: {0}")]
    Write(String),

    /// Protocol error (short header, bad length, oversized frame).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Operation not allowed in the current session state.
    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// State the session was in.
        state: SessionState,
    },

    /// The session was closed.
    #[error("Connection closed")]
    ConnectionClosed,
}

/// Result type alias using DanmuError.
pub type Result<T> = std::result::Result<T, DanmuError>;
