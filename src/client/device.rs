//! Client-local media device boundary
//!
//! The client's own media stack (capture, WebRTC transport internals) is as
//! external to this crate as the server's engine. [`MediaDevice`] is the
//! seam: the negotiation drivers pull local DTLS/RTP parameters from it at
//! each suspension point and hand consumer parameters back to it.
//!
//! [`StaticDevice`] answers with canned parameter blobs; it is what tests
//! and local development run against.

use serde_json::json;

use crate::engine::{
    ConsumerParameters, DtlsParameters, RtpCapabilities, RtpParameters,
};
use crate::error::{Error, Result};

/// Client-local media stack consumed by the negotiation drivers
pub trait MediaDevice: Send {
    /// Load the room's router capabilities into the device
    ///
    /// Must complete before any transport is created; every later call on
    /// the device may assume it.
    fn load(&mut self, router_capabilities: &RtpCapabilities) -> Result<()>;

    /// Whether `load` has completed
    fn loaded(&self) -> bool;

    /// The device's receive capabilities, sent with consume requests
    fn rtp_capabilities(&self) -> Result<RtpCapabilities>;

    /// Local DTLS parameters for the connect step
    fn dtls_parameters(&self) -> DtlsParameters;

    /// Local encoding parameters of the audio track to publish
    fn audio_rtp_parameters(&self) -> RtpParameters;

    /// Attach a server-created consumer to local playback
    fn attach_consumer(&mut self, parameters: &ConsumerParameters) -> Result<()>;
}

/// [`MediaDevice`] implementation with canned parameter blobs
pub struct StaticDevice {
    router_capabilities: Option<RtpCapabilities>,
    capabilities_override: Option<RtpCapabilities>,
    dtls_parameters: DtlsParameters,
    audio_rtp_parameters: RtpParameters,
    consumers: Vec<ConsumerParameters>,
}

impl StaticDevice {
    /// Device publishing an opus track, mirroring whatever capabilities the
    /// router advertises
    pub fn opus() -> Self {
        Self {
            router_capabilities: None,
            capabilities_override: None,
            dtls_parameters: DtlsParameters::new(json!({
                "role": "client",
                "fingerprints": [
                    {"algorithm": "sha-256", "value": "F0:CA:FE:F0:CA:FE"}
                ],
            })),
            audio_rtp_parameters: RtpParameters::new(json!({
                "codecs": [
                    {"mimeType": "audio/opus", "clockRate": 48000, "channels": 2, "payloadType": 100}
                ],
                "encodings": [{"ssrc": 1111}],
            })),
            consumers: Vec::new(),
        }
    }

    /// Force the receive capabilities instead of mirroring the router's
    ///
    /// Lets tests provoke a capability mismatch.
    pub fn with_capabilities(mut self, capabilities: RtpCapabilities) -> Self {
        self.capabilities_override = Some(capabilities);
        self
    }

    /// Consumers attached so far
    pub fn consumers(&self) -> &[ConsumerParameters] {
        &self.consumers
    }
}

impl MediaDevice for StaticDevice {
    fn load(&mut self, router_capabilities: &RtpCapabilities) -> Result<()> {
        self.router_capabilities = Some(router_capabilities.clone());
        Ok(())
    }

    fn loaded(&self) -> bool {
        self.router_capabilities.is_some()
    }

    fn rtp_capabilities(&self) -> Result<RtpCapabilities> {
        if let Some(ref capabilities) = self.capabilities_override {
            return Ok(capabilities.clone());
        }
        self.router_capabilities
            .clone()
            .ok_or_else(|| Error::InvalidState("device not loaded".to_owned()))
    }

    fn dtls_parameters(&self) -> DtlsParameters {
        self.dtls_parameters.clone()
    }

    fn audio_rtp_parameters(&self) -> RtpParameters {
        self.audio_rtp_parameters.clone()
    }

    fn attach_consumer(&mut self, parameters: &ConsumerParameters) -> Result<()> {
        self.consumers.push(parameters.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_require_load() {
        let device = StaticDevice::opus();
        assert!(!device.loaded());
        assert!(matches!(device.rtp_capabilities(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_load_mirrors_router_capabilities() {
        let mut device = StaticDevice::opus();
        let caps = RtpCapabilities::new(json!({"codecs": [{"mimeType": "audio/opus"}]}));

        device.load(&caps).unwrap();
        assert!(device.loaded());
        assert_eq!(device.rtp_capabilities().unwrap(), caps);
    }

    #[test]
    fn test_capabilities_override_wins() {
        let forced = RtpCapabilities::new(json!({"codecs": [{"mimeType": "video/vp8"}]}));
        let mut device = StaticDevice::opus().with_capabilities(forced.clone());

        device
            .load(&RtpCapabilities::new(json!({"codecs": []})))
            .unwrap();
        assert_eq!(device.rtp_capabilities().unwrap(), forced);
    }
}
