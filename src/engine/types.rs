//! Identifier and parameter types crossing the engine boundary
//!
//! Ids (`RoomId`, `TransportId`, `ProducerId`, `ConsumerId`) and the media
//! kind are first-class to this crate. Everything else the engine emits
//! (ICE/DTLS/RTP parameter blobs) is opaque structured data shuttled between
//! peers unmodified, so those are thin newtypes over `serde_json::Value`.

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap an existing id string
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The id as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

id_type!(
    /// Opaque room identifier, chosen by clients
    RoomId
);
id_type!(
    /// Engine-assigned transport identifier
    TransportId
);
id_type!(
    /// Engine-assigned producer identifier
    ProducerId
);
id_type!(
    /// Engine-assigned consumer identifier
    ConsumerId
);

/// Media kind carried by a producer or consumer
///
/// This system broadcasts audio only, but the kind field is passed through
/// the wire verbatim, so both variants exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Audio track
    Audio,
    /// Video track
    Video,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

macro_rules! blob_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub serde_json::Value);

        impl $name {
            /// Wrap an engine-issued value
            pub fn new(value: serde_json::Value) -> Self {
                Self(value)
            }

            /// Borrow the inner value
            pub fn as_value(&self) -> &serde_json::Value {
                &self.0
            }
        }
    };
}

blob_type!(
    /// Codec/parameter set a router or peer supports
    RtpCapabilities
);
blob_type!(
    /// Encoding parameters of a single media source or sink
    RtpParameters
);
blob_type!(
    /// ICE username fragment / password pair for a transport
    IceParameters
);
blob_type!(
    /// ICE candidate list for a transport
    IceCandidates
);
blob_type!(
    /// DTLS role and fingerprints for a transport
    DtlsParameters
);

/// Negotiation parameters for a freshly allocated transport
///
/// Returned by [`MediaEngine::create_transport`](super::MediaEngine::create_transport)
/// and relayed to the remote peer verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportParameters {
    /// Engine-assigned transport id
    pub id: TransportId,
    /// ICE parameters of the server-side endpoint
    pub ice_parameters: IceParameters,
    /// ICE candidates of the server-side endpoint
    pub ice_candidates: IceCandidates,
    /// DTLS parameters of the server-side endpoint
    pub dtls_parameters: DtlsParameters,
}

/// Parameters of a created consumer, relayed to the consuming peer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerParameters {
    /// Engine-assigned consumer id
    pub id: ConsumerId,
    /// Producer this consumer is bound to
    pub producer_id: ProducerId,
    /// Media kind, mirrors the producer's
    pub kind: MediaKind,
    /// Receive-side encoding parameters
    pub rtp_parameters: RtpParameters,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_serde_transparent() {
        let id = TransportId::new("t1");
        let encoded = serde_json::to_string(&id).unwrap();
        assert_eq!(encoded, "\"t1\"");

        let decoded: TransportId = serde_json::from_str("\"t2\"").unwrap();
        assert_eq!(decoded.as_str(), "t2");
    }

    #[test]
    fn test_media_kind_wire_format() {
        assert_eq!(serde_json::to_string(&MediaKind::Audio).unwrap(), "\"audio\"");
        let kind: MediaKind = serde_json::from_str("\"audio\"").unwrap();
        assert_eq!(kind, MediaKind::Audio);
    }

    #[test]
    fn test_transport_parameters_camel_case() {
        let params = TransportParameters {
            id: TransportId::new("t1"),
            ice_parameters: IceParameters::new(json!({"usernameFragment": "u"})),
            ice_candidates: IceCandidates::new(json!([])),
            dtls_parameters: DtlsParameters::new(json!({"role": "server"})),
        };

        let value = serde_json::to_value(&params).unwrap();
        assert!(value.get("iceParameters").is_some());
        assert!(value.get("iceCandidates").is_some());
        assert!(value.get("dtlsParameters").is_some());
    }

    #[test]
    fn test_blob_passes_through_unmodified() {
        let blob = json!({"fingerprints": [{"algorithm": "sha-256", "value": "AA:BB"}]});
        let dtls = DtlsParameters::new(blob.clone());
        let round_tripped: DtlsParameters =
            serde_json::from_value(serde_json::to_value(&dtls).unwrap()).unwrap();
        assert_eq!(round_tripped.as_value(), &blob);
    }
}
