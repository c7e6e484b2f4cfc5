//! Per-connection request handling
//!
//! One task per signaling connection: read a frame, dispatch it against the
//! broker and registry, write the response. Every operation failure becomes
//! an `{"error": ...}` payload on the wire — a connection handler never
//! crashes on a bad request, and one connection's failure cannot reach
//! another connection or room.

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::json;
use tokio::net::TcpStream;

use crate::engine::{
    DtlsParameters, MediaEngine, MediaKind, ProducerId, RoomId, RtpCapabilities, RtpParameters,
    TransportId,
};
use crate::error::{ProtocolError, Result};
use crate::protocol::{
    write_frame, FrameReader, JoinedRoom, ProducerCreated, Request, RequestBody, Response,
    TransportConnected,
};
use crate::registry::{RegistryError, SessionRegistry};
use crate::server::config::ServerConfig;
use crate::session::ConnectionContext;

fn payload<T: serde::Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| json!({ "error": e.to_string() }))
}

/// Handler for one signaling connection
pub struct Connection<E: MediaEngine> {
    ctx: ConnectionContext,
    socket: TcpStream,
    config: ServerConfig,
    engine: Arc<E>,
    registry: Arc<SessionRegistry>,
}

impl<E: MediaEngine> Connection<E> {
    /// Create a handler for an accepted socket
    pub fn new(
        session_id: u64,
        socket: TcpStream,
        peer_addr: SocketAddr,
        config: ServerConfig,
        engine: Arc<E>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            ctx: ConnectionContext::new(session_id, peer_addr),
            socket,
            config,
            engine,
            registry,
        }
    }

    /// Serve the connection until the peer disconnects
    ///
    /// Always tears the connection's state down on exit, whether the peer
    /// closed cleanly or the channel failed.
    pub async fn run(mut self) -> Result<()> {
        let (read_half, mut write_half) = self.socket.into_split();
        let mut reader = FrameReader::new(read_half, self.config.max_frame_size);

        let result = loop {
            let frame = match reader.next_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            };

            let response = match serde_json::from_value::<Request>(frame.clone()) {
                Ok(request) => {
                    tracing::debug!(
                        session_id = self.ctx.session_id,
                        op = request.body.op(),
                        "Request received"
                    );
                    let data = Self::dispatch(
                        &mut self.ctx,
                        &self.engine,
                        &self.registry,
                        request.body,
                    )
                    .await;
                    Response { id: request.id, data }
                }
                // Keep the channel alive when the shape is wrong but the
                // correlation id is recoverable; otherwise the peer's pending
                // request could never resolve.
                Err(e) => match frame.get("id").and_then(|id| id.as_u64()) {
                    Some(id) => {
                        tracing::warn!(
                            session_id = self.ctx.session_id,
                            error = %e,
                            "Malformed request"
                        );
                        Response::error(id, format!("malformed request: {}", e))
                    }
                    None => break Err(ProtocolError::Malformed(e.to_string()).into()),
                },
            };

            if let Err(e) = write_frame(&mut write_half, &response).await {
                break Err(e);
            }
        };

        self.ctx.teardown(self.engine.as_ref(), &self.registry).await;
        result
    }

    async fn dispatch(
        ctx: &mut ConnectionContext,
        engine: &Arc<E>,
        registry: &Arc<SessionRegistry>,
        body: RequestBody,
    ) -> serde_json::Value {
        match body {
            RequestBody::JoinRoom { room_id } => Self::join_room(registry, &room_id).await,
            RequestBody::CreateTransport { room_id } => {
                Self::create_transport(ctx, engine, &room_id).await
            }
            RequestBody::ConnectTransport {
                transport_id,
                dtls_parameters,
            } => Self::connect_transport(ctx, engine, &transport_id, &dtls_parameters).await,
            RequestBody::Produce {
                transport_id,
                kind,
                rtp_parameters,
                room_id,
            } => {
                Self::produce(ctx, engine, registry, &transport_id, kind, rtp_parameters, &room_id)
                    .await
            }
            RequestBody::GetProducers { room_id } => {
                let producers = registry.list_producers(&room_id).await;
                payload(&producers)
            }
            RequestBody::Consume {
                transport_id,
                producer_id,
                rtp_capabilities,
                room_id,
            } => {
                Self::consume(
                    ctx,
                    engine,
                    registry,
                    &transport_id,
                    &producer_id,
                    &rtp_capabilities,
                    &room_id,
                )
                .await
            }
        }
    }

    async fn join_room(registry: &SessionRegistry, room_id: &RoomId) -> serde_json::Value {
        let rtp_capabilities = registry.join(room_id).await;
        payload(&JoinedRoom { rtp_capabilities })
    }

    async fn create_transport(
        ctx: &mut ConnectionContext,
        engine: &Arc<E>,
        room_id: &RoomId,
    ) -> serde_json::Value {
        match ctx.broker.create(engine.as_ref()).await {
            Ok(params) => {
                tracing::info!(
                    session_id = ctx.session_id,
                    room = %room_id,
                    transport = %params.id,
                    "Transport created"
                );
                payload(&params)
            }
            Err(e) => {
                tracing::warn!(session_id = ctx.session_id, error = %e, "Transport allocation failed");
                json!({ "error": e.to_string() })
            }
        }
    }

    async fn connect_transport(
        ctx: &mut ConnectionContext,
        engine: &Arc<E>,
        transport_id: &TransportId,
        dtls_parameters: &DtlsParameters,
    ) -> serde_json::Value {
        match ctx
            .broker
            .connect(engine.as_ref(), transport_id, dtls_parameters)
            .await
        {
            Ok(()) => {
                tracing::debug!(
                    session_id = ctx.session_id,
                    transport = %transport_id,
                    "Transport connected"
                );
                payload(&TransportConnected { connected: true })
            }
            Err(e) => json!({ "error": e.to_string() }),
        }
    }

    async fn produce(
        ctx: &mut ConnectionContext,
        engine: &Arc<E>,
        registry: &Arc<SessionRegistry>,
        transport_id: &TransportId,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
        room_id: &RoomId,
    ) -> serde_json::Value {
        // Verify the room up front so a bogus room id never leaves an
        // orphan producer on the engine.
        if !registry.has_room(room_id).await {
            return json!({ "error": RegistryError::RoomNotFound(room_id.clone()).to_string() });
        }

        let producer_id = match ctx
            .broker
            .produce(engine.as_ref(), transport_id, kind, rtp_parameters)
            .await
        {
            Ok(id) => id,
            Err(e) => return json!({ "error": e.to_string() }),
        };

        // Registration must complete before the response goes out: any peer
        // that lists producers after our reply sees this producer.
        if let Err(e) = registry
            .register_producer(room_id, producer_id.clone(), kind, ctx.session_id)
            .await
        {
            return json!({ "error": e.to_string() });
        }
        ctx.record_producer(room_id.clone(), producer_id.clone());

        payload(&ProducerCreated { id: producer_id })
    }

    async fn consume(
        ctx: &mut ConnectionContext,
        engine: &Arc<E>,
        registry: &Arc<SessionRegistry>,
        transport_id: &TransportId,
        producer_id: &ProducerId,
        rtp_capabilities: &RtpCapabilities,
        room_id: &RoomId,
    ) -> serde_json::Value {
        match ctx
            .broker
            .consume(
                engine.as_ref(),
                registry,
                transport_id,
                producer_id,
                rtp_capabilities,
                room_id,
            )
            .await
        {
            Ok(params) => {
                tracing::info!(
                    session_id = ctx.session_id,
                    room = %room_id,
                    producer = %producer_id,
                    consumer = %params.id,
                    "Consumer created"
                );
                payload(&params)
            }
            Err(e) => {
                tracing::warn!(
                    session_id = ctx.session_id,
                    room = %room_id,
                    producer = %producer_id,
                    error = %e,
                    "Consume failed"
                );
                json!({ "error": e.to_string() })
            }
        }
    }
}
