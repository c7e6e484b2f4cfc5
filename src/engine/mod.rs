//! Media engine boundary
//!
//! The SFU media plane (RTP routing, ICE, DTLS, codec handling) is an
//! external collaborator. This crate only orchestrates sessions against it,
//! shuttling engine-issued parameter blobs between peers unmodified. The
//! [`MediaEngine`] trait is that seam: the signaling server is generic over
//! it, and [`LoopbackEngine`] provides an in-process implementation that
//! fabricates negotiation parameters so the whole handshake can run without
//! a real media stack.

pub mod error;
pub mod loopback;
pub mod types;

pub use error::EngineError;
pub use loopback::{EngineConfig, LoopbackEngine};
pub use types::{
    ConsumerId, ConsumerParameters, DtlsParameters, IceCandidates, IceParameters, MediaKind,
    ProducerId, RoomId, RtpCapabilities, RtpParameters, TransportId, TransportParameters,
};

use std::future::Future;

/// External media engine consumed by the signaling server
///
/// Implementations hold their own transport/producer state keyed by the ids
/// they assign; the broker layer only tracks ids plus per-connection
/// negotiation state. All methods may be called concurrently from different
/// connection tasks.
pub trait MediaEngine: Send + Sync + 'static {
    /// Router-level capabilities, fixed when the engine starts
    fn router_capabilities(&self) -> RtpCapabilities;

    /// Allocate a new transport bound to the engine's listen configuration
    ///
    /// May fail (e.g. port exhaustion); the failure is surfaced to the
    /// requesting peer and never retried automatically.
    fn create_transport(
        &self,
    ) -> impl Future<Output = Result<TransportParameters, EngineError>> + Send;

    /// Complete DTLS setup for a previously created transport
    fn connect_transport(
        &self,
        id: &TransportId,
        dtls_parameters: &DtlsParameters,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Attach a send-direction media source to a transport
    fn produce(
        &self,
        transport_id: &TransportId,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> impl Future<Output = Result<ProducerId, EngineError>> + Send;

    /// Attach a receive-direction sink for an existing producer
    ///
    /// `remote_capabilities` are the consuming peer's capabilities; the
    /// engine rejects the request when they cannot receive the producer's
    /// encoding.
    fn consume(
        &self,
        transport_id: &TransportId,
        producer_id: &ProducerId,
        remote_capabilities: &RtpCapabilities,
    ) -> impl Future<Output = Result<ConsumerParameters, EngineError>> + Send;

    /// Close a transport and release everything attached to it
    fn close_transport(&self, id: &TransportId) -> impl Future<Output = ()> + Send;
}
