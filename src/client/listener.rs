//! Listener flow
//!
//! Drives one client through the consume path: join, load the local device,
//! check the room actually has a broadcaster, then create a receive
//! transport, connect it, and consume the first producer. The producer check
//! runs before any transport exists so an empty room never costs a transport
//! that would never carry media.

use tokio::sync::mpsc;

use crate::engine::{ConsumerParameters, ProducerId, TransportId};
use crate::error::{Error, Result};

use super::config::ClientConfig;
use super::connector::SignalingClient;
use super::device::MediaDevice;
use super::negotiation::{NegotiationPhase, NegotiationState};

/// Events from the listener flow
#[derive(Debug)]
pub enum ListenEvent {
    /// Room joined, device loaded
    CapabilitiesLoaded,

    /// Producers visible in the room at flow start
    ProducersListed(Vec<ProducerId>),

    /// Receive transport allocated on the server
    TransportCreated(TransportId),

    /// DTLS setup completed
    Connected,

    /// Audio is being consumed from this producer
    Consuming(ProducerId),

    /// Flow failed; terminal for this attempt
    Error(String),

    /// Signaling channel dropped
    Disconnected,
}

/// Consumes one audio track from a room's broadcaster
pub struct Listener<D: MediaDevice> {
    config: ClientConfig,
    device: D,
    state: NegotiationState,
    event_tx: mpsc::Sender<ListenEvent>,
    client: Option<SignalingClient>,
    consumer: Option<ConsumerParameters>,
}

impl<D: MediaDevice> Listener<D> {
    /// Create a listener
    ///
    /// Returns the driver and a receiver for flow events.
    pub fn new(config: ClientConfig, device: D) -> (Self, mpsc::Receiver<ListenEvent>) {
        let (tx, rx) = mpsc::channel(16);

        let listener = Self {
            config,
            device,
            state: NegotiationState::new(),
            event_tx: tx,
            client: None,
            consumer: None,
        };

        (listener, rx)
    }

    /// Run the consume flow to completion
    ///
    /// Fails with [`Error::NoBroadcaster`] when the room has no producers —
    /// checked before a transport is created. Not reentrant; a failed flow
    /// resets so the caller may retry explicitly.
    pub async fn run(&mut self) -> Result<ConsumerParameters> {
        if self.state.phase() != NegotiationPhase::Idle {
            return Err(Error::InvalidState(format!(
                "listen already started ({})",
                self.state.phase()
            )));
        }

        match self.drive().await {
            Ok(parameters) => Ok(parameters),
            Err(e) => {
                let _ = self.event_tx.send(ListenEvent::Error(e.to_string())).await;
                self.client = None;
                self.state.reset();
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> Result<ConsumerParameters> {
        let room_id = self.config.room_id.clone();
        let mut client = SignalingClient::connect(&self.config).await?;

        let capabilities = client.join_room(&room_id).await?;
        self.device.load(&capabilities)?;
        self.state.capabilities_loaded()?;
        let _ = self.event_tx.send(ListenEvent::CapabilitiesLoaded).await;

        let producers = client.get_producers(&room_id).await?;
        let _ = self
            .event_tx
            .send(ListenEvent::ProducersListed(producers.clone()))
            .await;
        let producer_id = match producers.first() {
            Some(id) => id.clone(),
            None => {
                tracing::info!(room = %room_id, "No broadcaster in room, aborting");
                return Err(Error::NoBroadcaster);
            }
        };

        let transport = client.create_transport(&room_id).await?;
        self.state.transport_created()?;
        let _ = self
            .event_tx
            .send(ListenEvent::TransportCreated(transport.id.clone()))
            .await;

        // Suspension point: connect round-trip.
        client
            .connect_transport(&transport.id, &self.device.dtls_parameters())
            .await?;
        self.state.connected()?;
        let _ = self.event_tx.send(ListenEvent::Connected).await;

        let parameters = client
            .consume(
                &transport.id,
                &producer_id,
                &self.device.rtp_capabilities()?,
                &room_id,
            )
            .await?;
        self.device.attach_consumer(&parameters)?;
        self.state.consuming()?;
        let _ = self
            .event_tx
            .send(ListenEvent::Consuming(parameters.producer_id.clone()))
            .await;

        tracing::info!(
            room = %room_id,
            producer = %parameters.producer_id,
            consumer = %parameters.id,
            "Consuming audio"
        );

        self.client = Some(client);
        self.consumer = Some(parameters.clone());
        Ok(parameters)
    }

    /// Current negotiation phase
    pub fn phase(&self) -> NegotiationPhase {
        self.state.phase()
    }

    /// Consumer parameters once the flow reached `Consuming`
    pub fn consumer(&self) -> Option<&ConsumerParameters> {
        self.consumer.as_ref()
    }

    /// Borrow the local device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Stop listening and close the signaling channel
    pub async fn disconnect(&mut self) {
        self.client = None;
        self.consumer = None;
        self.state.reset();
        let _ = self.event_tx.send(ListenEvent::Disconnected).await;
    }
}
