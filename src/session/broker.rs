//! Transport broker
//!
//! Per-connection mapping of transport id to transport state. The broker
//! mediates every transport operation against the media engine and enforces
//! the precondition ladder: the id must resolve on this connection, the
//! transport must have completed its connect step, and the operation must
//! match the transport's direction.
//!
//! The wire protocol carries no direction field, so direction is latched on
//! first use: the first produce makes a transport send-only, the first
//! consume makes it receive-only.

use std::collections::HashMap;

use crate::engine::{
    ConsumerParameters, DtlsParameters, MediaEngine, MediaKind, ProducerId, RoomId,
    RtpCapabilities, RtpParameters, TransportId, TransportParameters,
};
use crate::registry::{RegistryError, SessionRegistry};

use super::error::SessionError;

/// Direction a transport carries media in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportDirection {
    /// Client to server (producing)
    Send,
    /// Server to client (consuming)
    Receive,
}

/// Broker-side state of one transport
#[derive(Debug)]
pub struct TransportEntry {
    /// Engine-assigned id
    pub id: TransportId,

    /// Whether the connect step has completed
    pub connected: bool,

    /// Direction, latched on first produce/consume
    pub direction: Option<TransportDirection>,
}

/// Per-connection transport mapping
///
/// Owned exclusively by its connection task; no locking needed. Transports
/// created here are unreachable from any other connection.
pub struct TransportBroker {
    transports: HashMap<TransportId, TransportEntry>,
}

impl TransportBroker {
    /// Create an empty broker
    pub fn new() -> Self {
        Self {
            transports: HashMap::new(),
        }
    }

    /// Number of transports on this connection
    pub fn transport_count(&self) -> usize {
        self.transports.len()
    }

    /// Look up a transport entry
    pub fn get(&self, id: &TransportId) -> Option<&TransportEntry> {
        self.transports.get(id)
    }

    /// Ask the engine for a new transport and store it under its id
    pub async fn create<E: MediaEngine>(
        &mut self,
        engine: &E,
    ) -> Result<TransportParameters, SessionError> {
        let params = engine.create_transport().await?;
        self.transports.insert(
            params.id.clone(),
            TransportEntry {
                id: params.id.clone(),
                connected: false,
                direction: None,
            },
        );
        Ok(params)
    }

    /// Complete DTLS setup for a previously created transport
    pub async fn connect<E: MediaEngine>(
        &mut self,
        engine: &E,
        id: &TransportId,
        dtls_parameters: &DtlsParameters,
    ) -> Result<(), SessionError> {
        if !self.transports.contains_key(id) {
            return Err(SessionError::TransportNotFound(id.clone()));
        }

        engine.connect_transport(id, dtls_parameters).await?;

        if let Some(entry) = self.transports.get_mut(id) {
            entry.connected = true;
        }
        Ok(())
    }

    /// Attach a send-direction source; latches the transport as send
    ///
    /// The caller is responsible for registering the returned producer id
    /// into the session registry before replying to the peer.
    pub async fn produce<E: MediaEngine>(
        &mut self,
        engine: &E,
        id: &TransportId,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<ProducerId, SessionError> {
        let entry = self
            .transports
            .get_mut(id)
            .ok_or_else(|| SessionError::TransportNotFound(id.clone()))?;
        if !entry.connected {
            return Err(SessionError::NotReady(id.clone()));
        }
        if entry.direction == Some(TransportDirection::Receive) {
            return Err(SessionError::DirectionMismatch(id.clone()));
        }

        let producer_id = engine.produce(id, kind, rtp_parameters).await?;

        // Only latch once the engine accepted the source.
        if let Some(entry) = self.transports.get_mut(id) {
            entry.direction = Some(TransportDirection::Send);
        }
        Ok(producer_id)
    }

    /// Attach a receive-direction sink; latches the transport as receive
    ///
    /// The producer must already be registered in the target room; that check
    /// runs before any engine call, so a stale producer id never allocates an
    /// engine-level consumer.
    pub async fn consume<E: MediaEngine>(
        &mut self,
        engine: &E,
        registry: &SessionRegistry,
        id: &TransportId,
        producer_id: &ProducerId,
        remote_capabilities: &RtpCapabilities,
        room_id: &RoomId,
    ) -> Result<ConsumerParameters, SessionError> {
        let entry = self
            .transports
            .get(id)
            .ok_or_else(|| SessionError::TransportNotFound(id.clone()))?;
        if !entry.connected {
            return Err(SessionError::NotReady(id.clone()));
        }
        if entry.direction == Some(TransportDirection::Send) {
            return Err(SessionError::DirectionMismatch(id.clone()));
        }

        if !registry.has_producer(room_id, producer_id).await {
            return Err(SessionError::Registry(RegistryError::ProducerNotFound(
                producer_id.clone(),
            )));
        }

        let params = engine.consume(id, producer_id, remote_capabilities).await?;

        if let Some(entry) = self.transports.get_mut(id) {
            entry.direction = Some(TransportDirection::Receive);
        }
        Ok(params)
    }

    /// Close every transport on the engine and clear the mapping
    pub async fn close_all<E: MediaEngine>(&mut self, engine: &E) {
        for id in self.transports.keys() {
            engine.close_transport(id).await;
        }
        self.transports.clear();
    }
}

impl Default for TransportBroker {
    fn default() -> Self {
        Self::new()
    }
}
