//! Engine error types

use super::types::{ProducerId, TransportId};

/// Error type for media engine operations
#[derive(Debug, Clone)]
pub enum EngineError {
    /// The engine could not allocate a transport (e.g. port exhaustion)
    AllocationFailed(String),
    /// The consumer's capabilities cannot receive the producer's encoding
    CapabilityMismatch,
    /// A parameter blob was rejected by the engine
    InvalidParameters(String),
    /// The engine has no transport with this id
    TransportNotFound(TransportId),
    /// The engine has no producer with this id
    ProducerNotFound(ProducerId),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::AllocationFailed(msg) => write!(f, "transport allocation failed: {}", msg),
            EngineError::CapabilityMismatch => write!(f, "incompatible rtp capabilities"),
            EngineError::InvalidParameters(msg) => write!(f, "invalid parameters: {}", msg),
            EngineError::TransportNotFound(id) => write!(f, "engine transport not found: {}", id),
            EngineError::ProducerNotFound(id) => write!(f, "engine producer not found: {}", id),
        }
    }
}

impl std::error::Error for EngineError {}
