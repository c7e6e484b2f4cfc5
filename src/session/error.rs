//! Session error types
//!
//! Failures of per-connection transport operations. `Display` output is what
//! goes into the wire-level error payload, so the fixed texts stay fixed and
//! wrapped engine/registry errors pass their own message through.

use crate::engine::{EngineError, TransportId};
use crate::registry::RegistryError;

/// Error type for per-connection transport operations
#[derive(Debug, Clone)]
pub enum SessionError {
    /// No transport with this id on this connection
    TransportNotFound(TransportId),
    /// Operation attempted before the transport completed its connect step
    NotReady(TransportId),
    /// A send-direction operation on a receive transport, or vice versa
    DirectionMismatch(TransportId),
    /// The media engine rejected the request
    Engine(EngineError),
    /// The session registry rejected the request
    Registry(RegistryError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::TransportNotFound(_) => write!(f, "transport not found"),
            SessionError::NotReady(_) => write!(f, "transport not connected"),
            SessionError::DirectionMismatch(_) => write!(f, "transport direction mismatch"),
            SessionError::Engine(e) => write!(f, "{}", e),
            SessionError::Registry(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Engine(e) => Some(e),
            SessionError::Registry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EngineError> for SessionError {
    fn from(e: EngineError) -> Self {
        SessionError::Engine(e)
    }
}

impl From<RegistryError> for SessionError {
    fn from(e: RegistryError) -> Self {
        SessionError::Registry(e)
    }
}
