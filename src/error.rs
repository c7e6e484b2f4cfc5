//! Crate-wide error types
//!
//! Every fallible public API returns [`Result`]. Component-level errors
//! (registry, session, engine) convert into [`Error`] via `From` so callers
//! can use `?` across layer boundaries.

use crate::engine::EngineError;
use crate::registry::RegistryError;
use crate::session::SessionError;

/// Convenience result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Signaling channel errors
#[derive(Debug)]
pub enum ProtocolError {
    /// A wire message could not be parsed
    Malformed(String),
    /// A single frame exceeded the configured maximum size
    FrameTooLarge(usize),
    /// The peer closed the connection mid-exchange
    ConnectionClosed,
    /// A response arrived that no pending request was waiting for
    UnexpectedResponse(u64),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::Malformed(msg) => write!(f, "malformed message: {}", msg),
            ProtocolError::FrameTooLarge(size) => write!(f, "frame too large: {} bytes", size),
            ProtocolError::ConnectionClosed => write!(f, "connection closed"),
            ProtocolError::UnexpectedResponse(id) => {
                write!(f, "unexpected response for request {}", id)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Socket-level I/O failure
    Io(std::io::Error),
    /// Signaling channel failure
    Protocol(ProtocolError),
    /// Media engine rejected a request
    Engine(EngineError),
    /// Session registry failure
    Registry(RegistryError),
    /// Per-connection transport state failure
    Session(SessionError),
    /// The remote peer answered with an error payload
    Remote(String),
    /// A signaling request did not complete within the configured timeout
    TimedOut(&'static str),
    /// An operation was attempted in the wrong negotiation phase
    InvalidState(String),
    /// The target room has no producers to consume
    NoBroadcaster,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::Protocol(e) => write!(f, "protocol error: {}", e),
            Error::Engine(e) => write!(f, "engine error: {}", e),
            Error::Registry(e) => write!(f, "registry error: {}", e),
            Error::Session(e) => write!(f, "session error: {}", e),
            Error::Remote(msg) => write!(f, "remote error: {}", msg),
            Error::TimedOut(op) => write!(f, "operation timed out: {}", op),
            Error::InvalidState(msg) => write!(f, "invalid state: {}", msg),
            Error::NoBroadcaster => write!(f, "no broadcaster available"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Protocol(e) => Some(e),
            Error::Engine(e) => Some(e),
            Error::Registry(e) => Some(e),
            Error::Session(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

impl From<EngineError> for Error {
    fn from(e: EngineError) -> Self {
        Error::Engine(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e)
    }
}

impl From<SessionError> for Error {
    fn from(e: SessionError) -> Self {
        Error::Session(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Protocol(ProtocolError::Malformed(e.to_string()))
    }
}
