//! Connection context
//!
//! Per-connection server-side state: the transport broker plus the
//! bookkeeping needed to tear the connection down. Teardown closes the
//! connection's transports on the engine and removes its producers from the
//! registry, so listeners cannot keep referencing producers whose owning
//! connection is gone.

use std::net::SocketAddr;

use crate::engine::{MediaEngine, ProducerId, RoomId};
use crate::registry::SessionRegistry;

use super::broker::TransportBroker;

/// State owned by one signaling connection's task
pub struct ConnectionContext {
    /// Unique session id
    pub session_id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// This connection's transport mapping
    pub broker: TransportBroker,

    /// Producers this connection registered, by room
    produced: Vec<(RoomId, ProducerId)>,
}

impl ConnectionContext {
    /// Create a fresh context
    pub fn new(session_id: u64, peer_addr: SocketAddr) -> Self {
        Self {
            session_id,
            peer_addr,
            broker: TransportBroker::new(),
            produced: Vec::new(),
        }
    }

    /// Remember a producer for teardown
    pub fn record_producer(&mut self, room_id: RoomId, producer_id: ProducerId) {
        self.produced.push((room_id, producer_id));
    }

    /// Producers registered by this connection
    pub fn produced(&self) -> &[(RoomId, ProducerId)] {
        &self.produced
    }

    /// Tear the connection down
    ///
    /// Removes this connection's producers from the registry first so no
    /// listener can pick one up while its transport is closing, then closes
    /// every transport on the engine.
    pub async fn teardown<E: MediaEngine>(&mut self, engine: &E, registry: &SessionRegistry) {
        for (room_id, producer_id) in self.produced.drain(..) {
            registry.remove_producer(&room_id, &producer_id).await;
        }
        self.broker.close_all(engine).await;

        tracing::info!(
            session_id = self.session_id,
            peer = %self.peer_addr,
            "Connection torn down"
        );
    }
}
