//! Client side of the signaling channel
//!
//! `SignalingClient` owns the TCP connection and the correlation of
//! responses to pending requests. A background task reads frames and
//! resolves the oneshot each request parked on; callers only ever see the
//! operation payload. Error payloads are checked here, before any other
//! field is trusted.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::engine::{
    ConsumerParameters, DtlsParameters, MediaKind, ProducerId, RoomId, RtpCapabilities,
    RtpParameters, TransportId, TransportParameters,
};
use crate::error::{Error, ProtocolError, Result};
use crate::protocol::{
    write_frame, FrameReader, JoinedRoom, ProducerCreated, Request, RequestBody, Response,
};

use super::config::ClientConfig;

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Response>>>>;

/// Client endpoint of the signaling channel
pub struct SignalingClient {
    write_half: OwnedWriteHalf,
    pending: PendingMap,
    next_id: u64,
    request_timeout: std::time::Duration,
    read_task: JoinHandle<()>,
}

impl SignalingClient {
    /// Connect to the signaling server
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let socket = TcpStream::connect(config.server_addr).await?;
        socket.set_nodelay(true)?;
        let (read_half, write_half) = socket.into_split();

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader = FrameReader::new(read_half, config.max_frame_size);
        let read_task = tokio::spawn(read_loop(reader, Arc::clone(&pending)));

        tracing::debug!(server = %config.server_addr, "Signaling channel connected");

        Ok(Self {
            write_half,
            pending,
            next_id: 1,
            request_timeout: config.request_timeout,
            read_task,
        })
    }

    /// Issue one request and await its matched response payload
    async fn request(&mut self, body: RequestBody) -> Result<serde_json::Value> {
        let op = body.op();
        let id = self.next_id;
        self.next_id += 1;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if let Err(e) = write_frame(&mut self.write_half, &Request { id, body }).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        match timeout(self.request_timeout, rx).await {
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(Error::TimedOut(op))
            }
            // The read task dropped our sender: connection gone.
            Ok(Err(_)) => Err(ProtocolError::ConnectionClosed.into()),
            Ok(Ok(response)) => response.into_result(),
        }
    }

    /// Join a room; returns its shared router capabilities
    pub async fn join_room(&mut self, room_id: &RoomId) -> Result<RtpCapabilities> {
        let data = self
            .request(RequestBody::JoinRoom {
                room_id: room_id.clone(),
            })
            .await?;
        let joined: JoinedRoom = serde_json::from_value(data)?;
        Ok(joined.rtp_capabilities)
    }

    /// Ask the server to allocate a transport
    pub async fn create_transport(&mut self, room_id: &RoomId) -> Result<TransportParameters> {
        let data = self
            .request(RequestBody::CreateTransport {
                room_id: room_id.clone(),
            })
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Complete DTLS setup for a server-side transport
    pub async fn connect_transport(
        &mut self,
        transport_id: &TransportId,
        dtls_parameters: &DtlsParameters,
    ) -> Result<()> {
        self.request(RequestBody::ConnectTransport {
            transport_id: transport_id.clone(),
            dtls_parameters: dtls_parameters.clone(),
        })
        .await?;
        Ok(())
    }

    /// Publish a media source; returns the engine-assigned producer id
    pub async fn produce(
        &mut self,
        transport_id: &TransportId,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
        room_id: &RoomId,
    ) -> Result<ProducerId> {
        let data = self
            .request(RequestBody::Produce {
                transport_id: transport_id.clone(),
                kind,
                rtp_parameters,
                room_id: room_id.clone(),
            })
            .await?;
        let created: ProducerCreated = serde_json::from_value(data)?;
        Ok(created.id)
    }

    /// List a room's producers in registration order
    pub async fn get_producers(&mut self, room_id: &RoomId) -> Result<Vec<ProducerId>> {
        let data = self
            .request(RequestBody::GetProducers {
                room_id: room_id.clone(),
            })
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Ask the server to create a consumer for an existing producer
    pub async fn consume(
        &mut self,
        transport_id: &TransportId,
        producer_id: &ProducerId,
        rtp_capabilities: &RtpCapabilities,
        room_id: &RoomId,
    ) -> Result<ConsumerParameters> {
        let data = self
            .request(RequestBody::Consume {
                transport_id: transport_id.clone(),
                producer_id: producer_id.clone(),
                rtp_capabilities: rtp_capabilities.clone(),
                room_id: room_id.clone(),
            })
            .await?;
        Ok(serde_json::from_value(data)?)
    }
}

impl Drop for SignalingClient {
    fn drop(&mut self) {
        self.read_task.abort();
    }
}

async fn read_loop(mut reader: FrameReader<OwnedReadHalf>, pending: PendingMap) {
    loop {
        match reader.next_frame().await {
            Ok(Some(frame)) => {
                let response: Response = match serde_json::from_value(frame) {
                    Ok(response) => response,
                    Err(e) => {
                        tracing::warn!(error = %e, "Dropping unparseable response");
                        continue;
                    }
                };

                match pending.lock().await.remove(&response.id) {
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    None => {
                        tracing::warn!(id = response.id, "Response with no pending request");
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "Signaling channel read failed");
                break;
            }
        }
    }

    // Waiters see ConnectionClosed once their senders drop.
    pending.lock().await.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testutil::spawn_server;
    use crate::engine::MediaEngine;
    use serde_json::json;
    use std::time::Duration;

    fn dtls() -> DtlsParameters {
        DtlsParameters::new(json!({"role": "client", "fingerprints": []}))
    }

    fn rtp() -> RtpParameters {
        RtpParameters::new(json!({"codecs": [{"mimeType": "audio/opus"}]}))
    }

    #[tokio::test]
    async fn test_join_room_idempotent_over_wire() {
        let (addr, _server) = spawn_server().await;
        let config = ClientConfig::new(addr, "demo");
        let mut client = SignalingClient::connect(&config).await.unwrap();

        let first = client.join_room(&config.room_id).await.unwrap();
        let second = client.join_room(&config.room_id).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_consume_with_fabricated_transport_id() {
        let (addr, server) = spawn_server().await;
        let config = ClientConfig::new(addr, "demo");
        let mut client = SignalingClient::connect(&config).await.unwrap();

        client.join_room(&config.room_id).await.unwrap();
        let result = client
            .consume(
                &TransportId::new("fabricated"),
                &ProducerId::new("p1"),
                &server.engine().router_capabilities(),
                &config.room_id,
            )
            .await;

        assert!(matches!(result, Err(Error::Remote(ref m)) if m == "transport not found"));
    }

    #[tokio::test]
    async fn test_produce_before_connect_fails_not_ready() {
        let (addr, _server) = spawn_server().await;
        let config = ClientConfig::new(addr, "demo");
        let mut client = SignalingClient::connect(&config).await.unwrap();

        client.join_room(&config.room_id).await.unwrap();
        let transport = client.create_transport(&config.room_id).await.unwrap();

        let result = client
            .produce(&transport.id, MediaKind::Audio, rtp(), &config.room_id)
            .await;
        assert!(matches!(result, Err(Error::Remote(ref m)) if m == "transport not connected"));
    }

    #[tokio::test]
    async fn test_get_producers_on_untouched_room_is_empty() {
        let (addr, _server) = spawn_server().await;
        let config = ClientConfig::new(addr, "empty");
        let mut client = SignalingClient::connect(&config).await.unwrap();

        let producers = client.get_producers(&RoomId::new("empty")).await.unwrap();
        assert!(producers.is_empty());
    }

    #[tokio::test]
    async fn test_produce_into_unknown_room() {
        let (addr, _server) = spawn_server().await;
        let config = ClientConfig::new(addr, "demo");
        let mut client = SignalingClient::connect(&config).await.unwrap();

        client.join_room(&config.room_id).await.unwrap();
        let transport = client.create_transport(&config.room_id).await.unwrap();
        client.connect_transport(&transport.id, &dtls()).await.unwrap();

        let result = client
            .produce(&transport.id, MediaKind::Audio, rtp(), &RoomId::new("ghost"))
            .await;
        assert!(matches!(result, Err(Error::Remote(ref m)) if m == "room not found"));
    }

    #[tokio::test]
    async fn test_request_timeout_against_mute_server() {
        // A listener that accepts and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            std::future::pending::<()>().await;
        });

        let config =
            ClientConfig::new(addr, "demo").request_timeout(Duration::from_millis(100));
        let mut client = SignalingClient::connect(&config).await.unwrap();

        let result = client.join_room(&config.room_id).await;
        assert!(matches!(result, Err(Error::TimedOut("joinRoom"))));
    }

    #[tokio::test]
    async fn test_malformed_request_keeps_channel_alive() {
        let (addr, _server) = spawn_server().await;
        let config = ClientConfig::new(addr, "demo");
        let mut client = SignalingClient::connect(&config).await.unwrap();

        // Hand-craft a request with a known op but a broken payload.
        let id = client.next_id;
        client.next_id += 1;
        let (tx, rx) = oneshot::channel();
        client.pending.lock().await.insert(id, tx);
        write_frame(
            &mut client.write_half,
            &json!({"id": id, "op": "produce", "data": {"bogus": true}}),
        )
        .await
        .unwrap();

        let response = rx.await.unwrap();
        assert!(response.error_message().unwrap().starts_with("malformed request"));

        // The same connection still serves well-formed requests.
        client.join_room(&config.room_id).await.unwrap();
    }
}
