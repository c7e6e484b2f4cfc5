//! Registry error types
//!
//! Error types for session registry operations. `Display` output doubles as
//! the wire-level error message, so the texts stay fixed.

use crate::engine::{ProducerId, RoomId};

/// Error type for registry operations
#[derive(Debug, Clone)]
pub enum RegistryError {
    /// Room not found
    RoomNotFound(RoomId),
    /// Producer not registered in the target room
    ProducerNotFound(ProducerId),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::RoomNotFound(_) => write!(f, "room not found"),
            RegistryError::ProducerNotFound(_) => write!(f, "producer not found in room"),
        }
    }
}

impl std::error::Error for RegistryError {}
