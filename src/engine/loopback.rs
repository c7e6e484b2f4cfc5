//! In-process media engine
//!
//! `LoopbackEngine` implements [`MediaEngine`](super::MediaEngine) without a
//! real media plane: it allocates ports from a fixed range, fabricates
//! ICE/DTLS negotiation blobs, and mirrors producer encodings into consumer
//! parameters. It exists so the full join/connect/produce/consume handshake
//! can be exercised end-to-end in tests and local development.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};

use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::error::EngineError;
use super::types::{
    ConsumerId, ConsumerParameters, DtlsParameters, IceCandidates, IceParameters, MediaKind,
    ProducerId, RtpCapabilities, RtpParameters, TransportId, TransportParameters,
};
use super::MediaEngine;

/// Network listen configuration for the engine
///
/// Deployment-time constants: the address transports bind to, the address
/// announced to remote peers (when behind NAT), and the RTC port range.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Address transports listen on
    pub listen_ip: IpAddr,

    /// Address announced to peers instead of `listen_ip` (NAT setups)
    pub announced_ip: Option<IpAddr>,

    /// First RTC port (inclusive)
    pub rtc_port_min: u16,

    /// Last RTC port (inclusive)
    pub rtc_port_max: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            listen_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            announced_ip: None,
            rtc_port_min: 10000,
            rtc_port_max: 10100,
        }
    }
}

impl EngineConfig {
    /// Set the listen address
    pub fn listen_ip(mut self, ip: IpAddr) -> Self {
        self.listen_ip = ip;
        self
    }

    /// Set the announced address
    pub fn announced_ip(mut self, ip: IpAddr) -> Self {
        self.announced_ip = Some(ip);
        self
    }

    /// Set the RTC port range (inclusive on both ends)
    pub fn rtc_port_range(mut self, min: u16, max: u16) -> Self {
        self.rtc_port_min = min;
        self.rtc_port_max = max;
        self
    }

    fn advertised_ip(&self) -> IpAddr {
        self.announced_ip.unwrap_or(self.listen_ip)
    }
}

struct TransportRecord {
    port: u16,
    connected: bool,
    producers: Vec<ProducerId>,
}

struct ProducerRecord {
    kind: MediaKind,
    rtp_parameters: RtpParameters,
    mime_type: String,
}

#[derive(Default)]
struct EngineState {
    transports: HashMap<TransportId, TransportRecord>,
    producers: HashMap<ProducerId, ProducerRecord>,
    consumer_count: usize,
}

/// In-process [`MediaEngine`] implementation
pub struct LoopbackEngine {
    config: EngineConfig,
    capabilities: RtpCapabilities,
    state: Mutex<EngineState>,
}

impl LoopbackEngine {
    /// Create an engine with default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with custom listen configuration
    pub fn with_config(config: EngineConfig) -> Self {
        // Same fixed codec list the router is created with: opus, 48kHz, stereo.
        let capabilities = RtpCapabilities::new(json!({
            "codecs": [
                {
                    "kind": "audio",
                    "mimeType": "audio/opus",
                    "clockRate": 48000,
                    "channels": 2,
                }
            ]
        }));

        Self {
            config,
            capabilities,
            state: Mutex::new(EngineState::default()),
        }
    }

    /// Number of live transports
    pub async fn transport_count(&self) -> usize {
        self.state.lock().await.transports.len()
    }

    /// Number of consumers created over the engine's lifetime
    pub async fn consumer_count(&self) -> usize {
        self.state.lock().await.consumer_count
    }

    /// Whether the engine currently holds a producer with this id
    pub async fn has_producer(&self, id: &ProducerId) -> bool {
        self.state.lock().await.producers.contains_key(id)
    }

    fn allocate_port(&self, state: &EngineState) -> Result<u16, EngineError> {
        let in_use: Vec<u16> = state.transports.values().map(|t| t.port).collect();
        (self.config.rtc_port_min..=self.config.rtc_port_max)
            .find(|port| !in_use.contains(port))
            .ok_or_else(|| {
                EngineError::AllocationFailed(format!(
                    "no ports available in {}-{}",
                    self.config.rtc_port_min, self.config.rtc_port_max
                ))
            })
    }

    fn fabricate_parameters(&self, id: &TransportId, port: u16) -> TransportParameters {
        let ip = self.config.advertised_ip();
        // Fingerprint derived from the transport id: stable per transport,
        // unique across transports.
        let digest = id.as_str().replace('-', "");
        let fingerprint: String = digest
            .as_bytes()
            .chunks(2)
            .take(16)
            .map(|pair| String::from_utf8_lossy(pair).to_uppercase())
            .collect::<Vec<_>>()
            .join(":");

        TransportParameters {
            id: id.clone(),
            ice_parameters: IceParameters::new(json!({
                "usernameFragment": format!("uf-{}", id),
                "password": format!("pw-{}", id),
                "iceLite": true,
            })),
            ice_candidates: IceCandidates::new(json!([
                {
                    "foundation": "udpcandidate",
                    "ip": ip.to_string(),
                    "port": port,
                    "priority": 1076302079u32,
                    "protocol": "udp",
                    "type": "host",
                }
            ])),
            dtls_parameters: DtlsParameters::new(json!({
                "role": "auto",
                "fingerprints": [
                    {"algorithm": "sha-256", "value": fingerprint}
                ],
            })),
        }
    }

    fn mime_type_of(kind: MediaKind, rtp_parameters: &RtpParameters) -> String {
        rtp_parameters
            .as_value()
            .get("codecs")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("mimeType"))
            .and_then(|m| m.as_str())
            .map(str::to_owned)
            .unwrap_or_else(|| match kind {
                MediaKind::Audio => "audio/opus".to_owned(),
                MediaKind::Video => "video/vp8".to_owned(),
            })
    }

    fn capabilities_support(remote: &RtpCapabilities, mime_type: &str) -> bool {
        remote
            .as_value()
            .get("codecs")
            .and_then(|c| c.as_array())
            .map(|codecs| {
                codecs.iter().any(|codec| {
                    codec
                        .get("mimeType")
                        .and_then(|m| m.as_str())
                        .map(|m| m.eq_ignore_ascii_case(mime_type))
                        .unwrap_or(false)
                })
            })
            .unwrap_or(false)
    }
}

impl Default for LoopbackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaEngine for LoopbackEngine {
    fn router_capabilities(&self) -> RtpCapabilities {
        self.capabilities.clone()
    }

    async fn create_transport(&self) -> Result<TransportParameters, EngineError> {
        let mut state = self.state.lock().await;
        let port = self.allocate_port(&state)?;
        let id = TransportId::new(Uuid::new_v4().to_string());

        state.transports.insert(
            id.clone(),
            TransportRecord {
                port,
                connected: false,
                producers: Vec::new(),
            },
        );

        tracing::debug!(transport = %id, port = port, "Loopback transport allocated");
        Ok(self.fabricate_parameters(&id, port))
    }

    async fn connect_transport(
        &self,
        id: &TransportId,
        dtls_parameters: &DtlsParameters,
    ) -> Result<(), EngineError> {
        if !dtls_parameters.as_value().is_object() {
            return Err(EngineError::InvalidParameters(
                "dtls parameters must be an object".to_owned(),
            ));
        }

        let mut state = self.state.lock().await;
        let transport = state
            .transports
            .get_mut(id)
            .ok_or_else(|| EngineError::TransportNotFound(id.clone()))?;
        transport.connected = true;

        tracing::debug!(transport = %id, "Loopback transport connected");
        Ok(())
    }

    async fn produce(
        &self,
        transport_id: &TransportId,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<ProducerId, EngineError> {
        let mut state = self.state.lock().await;
        let transport = state
            .transports
            .get_mut(transport_id)
            .ok_or_else(|| EngineError::TransportNotFound(transport_id.clone()))?;
        if !transport.connected {
            return Err(EngineError::InvalidParameters(
                "transport not connected".to_owned(),
            ));
        }

        let id = ProducerId::new(Uuid::new_v4().to_string());
        transport.producers.push(id.clone());

        let mime_type = Self::mime_type_of(kind, &rtp_parameters);
        state.producers.insert(
            id.clone(),
            ProducerRecord {
                kind,
                rtp_parameters,
                mime_type,
            },
        );

        tracing::debug!(transport = %transport_id, producer = %id, kind = %kind, "Loopback producer created");
        Ok(id)
    }

    async fn consume(
        &self,
        transport_id: &TransportId,
        producer_id: &ProducerId,
        remote_capabilities: &RtpCapabilities,
    ) -> Result<ConsumerParameters, EngineError> {
        let mut state = self.state.lock().await;
        let transport = state
            .transports
            .get(transport_id)
            .ok_or_else(|| EngineError::TransportNotFound(transport_id.clone()))?;
        if !transport.connected {
            return Err(EngineError::InvalidParameters(
                "transport not connected".to_owned(),
            ));
        }

        let producer = state
            .producers
            .get(producer_id)
            .ok_or_else(|| EngineError::ProducerNotFound(producer_id.clone()))?;

        if !Self::capabilities_support(remote_capabilities, &producer.mime_type) {
            return Err(EngineError::CapabilityMismatch);
        }

        let params = ConsumerParameters {
            id: ConsumerId::new(Uuid::new_v4().to_string()),
            producer_id: producer_id.clone(),
            kind: producer.kind,
            rtp_parameters: producer.rtp_parameters.clone(),
        };
        state.consumer_count += 1;

        tracing::debug!(
            transport = %transport_id,
            producer = %producer_id,
            consumer = %params.id,
            "Loopback consumer created"
        );
        Ok(params)
    }

    async fn close_transport(&self, id: &TransportId) {
        let mut state = self.state.lock().await;
        if let Some(transport) = state.transports.remove(id) {
            for producer_id in &transport.producers {
                state.producers.remove(producer_id);
            }
            tracing::debug!(
                transport = %id,
                producers = transport.producers.len(),
                "Loopback transport closed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio_rtp_parameters() -> RtpParameters {
        RtpParameters::new(json!({
            "codecs": [{"mimeType": "audio/opus", "clockRate": 48000, "channels": 2}]
        }))
    }

    #[tokio::test]
    async fn test_create_and_connect_transport() {
        let engine = LoopbackEngine::new();

        let params = engine.create_transport().await.unwrap();
        assert_eq!(engine.transport_count().await, 1);
        assert!(params.ice_parameters.as_value().get("usernameFragment").is_some());

        engine
            .connect_transport(&params.id, &DtlsParameters::new(json!({"role": "client"})))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_port_exhaustion() {
        let config = EngineConfig::default().rtc_port_range(10000, 10001);
        let engine = LoopbackEngine::with_config(config);

        engine.create_transport().await.unwrap();
        engine.create_transport().await.unwrap();

        let result = engine.create_transport().await;
        assert!(matches!(result, Err(EngineError::AllocationFailed(_))));
    }

    #[tokio::test]
    async fn test_port_released_on_close() {
        let config = EngineConfig::default().rtc_port_range(10000, 10000);
        let engine = LoopbackEngine::with_config(config);

        let params = engine.create_transport().await.unwrap();
        engine.close_transport(&params.id).await;

        // The single port is free again.
        engine.create_transport().await.unwrap();
    }

    #[tokio::test]
    async fn test_produce_requires_connected_transport() {
        let engine = LoopbackEngine::new();
        let params = engine.create_transport().await.unwrap();

        let result = engine
            .produce(&params.id, MediaKind::Audio, audio_rtp_parameters())
            .await;
        assert!(matches!(result, Err(EngineError::InvalidParameters(_))));
    }

    #[tokio::test]
    async fn test_consume_mirrors_producer_kind() {
        let engine = LoopbackEngine::new();

        let send = engine.create_transport().await.unwrap();
        engine
            .connect_transport(&send.id, &DtlsParameters::new(json!({})))
            .await
            .unwrap();
        let producer_id = engine
            .produce(&send.id, MediaKind::Audio, audio_rtp_parameters())
            .await
            .unwrap();

        let recv = engine.create_transport().await.unwrap();
        engine
            .connect_transport(&recv.id, &DtlsParameters::new(json!({})))
            .await
            .unwrap();

        let consumer = engine
            .consume(&recv.id, &producer_id, &engine.router_capabilities())
            .await
            .unwrap();
        assert_eq!(consumer.kind, MediaKind::Audio);
        assert_eq!(consumer.producer_id, producer_id);
        assert_eq!(engine.consumer_count().await, 1);
    }

    #[tokio::test]
    async fn test_consume_capability_mismatch() {
        let engine = LoopbackEngine::new();

        let send = engine.create_transport().await.unwrap();
        engine
            .connect_transport(&send.id, &DtlsParameters::new(json!({})))
            .await
            .unwrap();
        let producer_id = engine
            .produce(&send.id, MediaKind::Audio, audio_rtp_parameters())
            .await
            .unwrap();

        let recv = engine.create_transport().await.unwrap();
        engine
            .connect_transport(&recv.id, &DtlsParameters::new(json!({})))
            .await
            .unwrap();

        let video_only = RtpCapabilities::new(json!({
            "codecs": [{"kind": "video", "mimeType": "video/vp8", "clockRate": 90000}]
        }));
        let result = engine.consume(&recv.id, &producer_id, &video_only).await;
        assert!(matches!(result, Err(EngineError::CapabilityMismatch)));
        assert_eq!(engine.consumer_count().await, 0);
    }

    #[tokio::test]
    async fn test_close_transport_drops_its_producers() {
        let engine = LoopbackEngine::new();

        let send = engine.create_transport().await.unwrap();
        engine
            .connect_transport(&send.id, &DtlsParameters::new(json!({})))
            .await
            .unwrap();
        let producer_id = engine
            .produce(&send.id, MediaKind::Audio, audio_rtp_parameters())
            .await
            .unwrap();
        assert!(engine.has_producer(&producer_id).await);

        engine.close_transport(&send.id).await;
        assert!(!engine.has_producer(&producer_id).await);
    }
}
