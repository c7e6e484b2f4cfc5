//! Client configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::engine::RoomId;
use crate::protocol::DEFAULT_MAX_FRAME_SIZE;

/// Signaling client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Signaling server address
    pub server_addr: SocketAddr,

    /// Room to join
    pub room_id: RoomId,

    /// Per-request timeout; an expired request fails with `TimedOut` and is
    /// never retried
    pub request_timeout: Duration,

    /// Maximum size of a single signaling frame in bytes
    pub max_frame_size: usize,
}

impl ClientConfig {
    /// Create a config for a server address and room
    pub fn new(server_addr: SocketAddr, room_id: impl Into<String>) -> Self {
        Self {
            server_addr,
            room_id: RoomId::new(room_id),
            request_timeout: Duration::from_secs(10),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Set the per-request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the maximum signaling frame size
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }
}
