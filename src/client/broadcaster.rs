//! Broadcaster flow
//!
//! Drives one client through the publish path: join, load the local device,
//! create a send transport, connect it, produce the audio track.

use tokio::sync::mpsc;

use crate::engine::{MediaKind, ProducerId, TransportId};
use crate::error::{Error, Result};

use super::config::ClientConfig;
use super::connector::SignalingClient;
use super::device::MediaDevice;
use super::negotiation::{NegotiationPhase, NegotiationState};

/// Events from the broadcaster flow
#[derive(Debug)]
pub enum BroadcastEvent {
    /// Room joined, device loaded
    CapabilitiesLoaded,

    /// Send transport allocated on the server
    TransportCreated(TransportId),

    /// DTLS setup completed
    Connected,

    /// Audio is being published under this producer id
    Producing(ProducerId),

    /// Flow failed; the attempt is over and the caller's controls should be
    /// restored to a retryable state
    Error(String),

    /// Signaling channel dropped
    Disconnected,
}

/// Publishes one audio track into a room
///
/// # Example
/// ```no_run
/// use sfu_rs::client::{Broadcaster, ClientConfig, StaticDevice};
///
/// # async fn example() -> sfu_rs::error::Result<()> {
/// let config = ClientConfig::new("127.0.0.1:5001".parse().unwrap(), "poc_room");
/// let (mut broadcaster, mut events) = Broadcaster::new(config, StaticDevice::opus());
///
/// tokio::spawn(async move {
///     while let Some(event) = events.recv().await {
///         println!("Event: {:?}", event);
///     }
/// });
///
/// let producer_id = broadcaster.run().await?;
/// println!("producing audio as {}", producer_id);
/// # Ok(())
/// # }
/// ```
pub struct Broadcaster<D: MediaDevice> {
    config: ClientConfig,
    device: D,
    state: NegotiationState,
    event_tx: mpsc::Sender<BroadcastEvent>,
    client: Option<SignalingClient>,
    transport_id: Option<TransportId>,
    producer_id: Option<ProducerId>,
}

impl<D: MediaDevice> Broadcaster<D> {
    /// Create a broadcaster
    ///
    /// Returns the driver and a receiver for flow events.
    pub fn new(config: ClientConfig, device: D) -> (Self, mpsc::Receiver<BroadcastEvent>) {
        let (tx, rx) = mpsc::channel(16);

        let broadcaster = Self {
            config,
            device,
            state: NegotiationState::new(),
            event_tx: tx,
            client: None,
            transport_id: None,
            producer_id: None,
        };

        (broadcaster, rx)
    }

    /// Run the publish flow to completion
    ///
    /// The flow is not reentrant: a second call while one is underway or
    /// after success fails with `InvalidState`. On failure the state resets
    /// so the caller may retry explicitly; nothing retries on its own.
    pub async fn run(&mut self) -> Result<ProducerId> {
        if self.state.phase() != NegotiationPhase::Idle {
            return Err(Error::InvalidState(format!(
                "broadcast already started ({})",
                self.state.phase()
            )));
        }

        match self.drive().await {
            Ok(producer_id) => Ok(producer_id),
            Err(e) => {
                let _ = self.event_tx.send(BroadcastEvent::Error(e.to_string())).await;
                self.client = None;
                self.state.reset();
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> Result<ProducerId> {
        let room_id = self.config.room_id.clone();
        let mut client = SignalingClient::connect(&self.config).await?;

        let capabilities = client.join_room(&room_id).await?;
        self.device.load(&capabilities)?;
        self.state.capabilities_loaded()?;
        let _ = self.event_tx.send(BroadcastEvent::CapabilitiesLoaded).await;

        let transport = client.create_transport(&room_id).await?;
        self.state.transport_created()?;
        let _ = self
            .event_tx
            .send(BroadcastEvent::TransportCreated(transport.id.clone()))
            .await;

        // Suspension point: the transport is ready to connect, and the flow
        // holds here until the connect round-trip resolves.
        client
            .connect_transport(&transport.id, &self.device.dtls_parameters())
            .await?;
        self.state.connected()?;
        let _ = self.event_tx.send(BroadcastEvent::Connected).await;

        // Suspension point: ready to send; the producer id exists only once
        // the produce round-trip resolves.
        let producer_id = client
            .produce(
                &transport.id,
                MediaKind::Audio,
                self.device.audio_rtp_parameters(),
                &room_id,
            )
            .await?;
        self.state.producing()?;
        let _ = self
            .event_tx
            .send(BroadcastEvent::Producing(producer_id.clone()))
            .await;

        tracing::info!(room = %room_id, producer = %producer_id, "Broadcasting audio");

        // Keep the channel open: dropping it would tear the producer down
        // server-side.
        self.client = Some(client);
        self.transport_id = Some(transport.id);
        self.producer_id = Some(producer_id.clone());
        Ok(producer_id)
    }

    /// Current negotiation phase
    pub fn phase(&self) -> NegotiationPhase {
        self.state.phase()
    }

    /// Producer id once the flow reached `Producing`
    pub fn producer_id(&self) -> Option<&ProducerId> {
        self.producer_id.as_ref()
    }

    /// Send transport id once the flow reached `TransportCreated`
    pub fn transport_id(&self) -> Option<&TransportId> {
        self.transport_id.as_ref()
    }

    /// Borrow the local device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Stop broadcasting and close the signaling channel
    pub async fn disconnect(&mut self) {
        self.client = None;
        self.producer_id = None;
        self.transport_id = None;
        self.state.reset();
        let _ = self.event_tx.send(BroadcastEvent::Disconnected).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testutil::spawn_server;
    use crate::client::StaticDevice;
    use crate::engine::RoomId;

    #[tokio::test]
    async fn test_full_broadcast_flow() {
        let (addr, server) = spawn_server().await;
        let config = ClientConfig::new(addr, "demo");
        let (mut broadcaster, mut events) = Broadcaster::new(config, StaticDevice::opus());

        let producer_id = broadcaster.run().await.unwrap();
        assert_eq!(broadcaster.phase(), NegotiationPhase::Producing);

        // Events arrive in flow order.
        assert!(matches!(events.recv().await, Some(BroadcastEvent::CapabilitiesLoaded)));
        assert!(matches!(events.recv().await, Some(BroadcastEvent::TransportCreated(_))));
        assert!(matches!(events.recv().await, Some(BroadcastEvent::Connected)));
        match events.recv().await {
            Some(BroadcastEvent::Producing(id)) => assert_eq!(id, producer_id),
            other => panic!("expected Producing, got {:?}", other),
        }

        // The producer is registered server-side.
        let room = RoomId::new("demo");
        assert_eq!(server.registry().list_producers(&room).await, vec![producer_id]);
    }

    #[tokio::test]
    async fn test_run_is_not_reentrant() {
        let (addr, _server) = spawn_server().await;
        let config = ClientConfig::new(addr, "demo");
        let (mut broadcaster, _events) = Broadcaster::new(config, StaticDevice::opus());

        broadcaster.run().await.unwrap();
        let result = broadcaster.run().await;
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_failed_flow_resets_for_retry() {
        // No server listening: connect fails immediately.
        let config = ClientConfig::new("127.0.0.1:9".parse().unwrap(), "demo");
        let (mut broadcaster, mut events) = Broadcaster::new(config, StaticDevice::opus());

        assert!(broadcaster.run().await.is_err());
        assert_eq!(broadcaster.phase(), NegotiationPhase::Idle);
        assert!(matches!(events.recv().await, Some(BroadcastEvent::Error(_))));
    }

    #[tokio::test]
    async fn test_disconnect_tears_down_producer() {
        let (addr, server) = spawn_server().await;
        let config = ClientConfig::new(addr, "demo");
        let (mut broadcaster, _events) = Broadcaster::new(config, StaticDevice::opus());

        broadcaster.run().await.unwrap();
        let room = RoomId::new("demo");
        assert_eq!(server.registry().producer_count(&room).await, 1);

        broadcaster.disconnect().await;

        // Teardown runs in the server's connection task; wait for it.
        for _ in 0..50 {
            if server.registry().producer_count(&room).await == 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(server.registry().producer_count(&room).await, 0);
    }
}
