//! Signaling wire messages
//!
//! A request names one of the six operations and carries its payload; every
//! request gets exactly one response, matched by the channel-level `id`. The
//! application never sees the id — correlation belongs to the channel.
//!
//! Failures are data: an error response carries `{"error": "<message>"}` as
//! its payload, and callers must check for it before trusting any other
//! field.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::engine::{
    DtlsParameters, MediaKind, ProducerId, RoomId, RtpCapabilities, RtpParameters, TransportId,
};
use crate::error::Error;

/// A signaling request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Channel-level correlation id
    pub id: u64,

    /// Operation and payload
    #[serde(flatten)]
    pub body: RequestBody,
}

/// The six signaling operations with their fixed request shapes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "data")]
pub enum RequestBody {
    /// Join a room, creating it on first use
    #[serde(rename = "joinRoom", rename_all = "camelCase")]
    JoinRoom {
        /// Target room
        room_id: RoomId,
    },

    /// Allocate a transport on the server
    #[serde(rename = "createTransport", rename_all = "camelCase")]
    CreateTransport {
        /// Room the transport will serve
        room_id: RoomId,
    },

    /// Complete DTLS setup for a transport
    #[serde(rename = "connectTransport", rename_all = "camelCase")]
    ConnectTransport {
        /// Transport to connect
        transport_id: TransportId,
        /// Remote peer's DTLS parameters, passed through to the engine
        dtls_parameters: DtlsParameters,
    },

    /// Attach a media source to a send transport
    #[serde(rename = "produce", rename_all = "camelCase")]
    Produce {
        /// Transport carrying the source
        transport_id: TransportId,
        /// Media kind
        kind: MediaKind,
        /// Source encoding, passed through to the engine
        rtp_parameters: RtpParameters,
        /// Room the producer is published into
        room_id: RoomId,
    },

    /// List a room's producers
    #[serde(rename = "getProducers", rename_all = "camelCase")]
    GetProducers {
        /// Target room
        room_id: RoomId,
    },

    /// Attach a sink for an existing producer
    #[serde(rename = "consume", rename_all = "camelCase")]
    Consume {
        /// Transport carrying the sink
        transport_id: TransportId,
        /// Producer to consume
        producer_id: ProducerId,
        /// Consuming peer's capabilities, passed through to the engine
        rtp_capabilities: RtpCapabilities,
        /// Room the producer lives in
        room_id: RoomId,
    },
}

impl RequestBody {
    /// Operation name, for logging
    pub fn op(&self) -> &'static str {
        match self {
            RequestBody::JoinRoom { .. } => "joinRoom",
            RequestBody::CreateTransport { .. } => "createTransport",
            RequestBody::ConnectTransport { .. } => "connectTransport",
            RequestBody::Produce { .. } => "produce",
            RequestBody::GetProducers { .. } => "getProducers",
            RequestBody::Consume { .. } => "consume",
        }
    }
}

/// A signaling response
///
/// `data` is the operation's success payload, or `{"error": "<message>"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Correlation id of the request this answers
    pub id: u64,

    /// Success payload or error object
    pub data: serde_json::Value,
}

impl Response {
    /// Build a success response
    pub fn ok(id: u64, data: serde_json::Value) -> Self {
        Self { id, data }
    }

    /// Build an error response; `message` becomes the wire-visible text
    pub fn error(id: u64, message: impl std::fmt::Display) -> Self {
        Self {
            id,
            data: json!({ "error": message.to_string() }),
        }
    }

    /// The error message, if this is an error response
    pub fn error_message(&self) -> Option<&str> {
        self.data.get("error").and_then(|e| e.as_str())
    }

    /// Split into success payload or remote error
    pub fn into_result(self) -> Result<serde_json::Value, Error> {
        match self.error_message() {
            Some(message) => Err(Error::Remote(message.to_owned())),
            None => Ok(self.data),
        }
    }
}

/// `joinRoom` success payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedRoom {
    /// Shared router capabilities for the room
    pub rtp_capabilities: RtpCapabilities,
}

/// `connectTransport` success payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConnected {
    /// Always true on success
    pub connected: bool,
}

/// `produce` success payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerCreated {
    /// Engine-assigned producer id
    pub id: ProducerId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let request = Request {
            id: 7,
            body: RequestBody::JoinRoom {
                room_id: RoomId::new("demo"),
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["op"], "joinRoom");
        assert_eq!(value["data"]["roomId"], "demo");
    }

    #[test]
    fn test_produce_request_field_names() {
        let raw = json!({
            "id": 3,
            "op": "produce",
            "data": {
                "transportId": "t1",
                "kind": "audio",
                "rtpParameters": {"codecs": []},
                "roomId": "demo",
            }
        });

        let request: Request = serde_json::from_value(raw).unwrap();
        match request.body {
            RequestBody::Produce {
                transport_id,
                kind,
                room_id,
                ..
            } => {
                assert_eq!(transport_id.as_str(), "t1");
                assert_eq!(kind, MediaKind::Audio);
                assert_eq!(room_id.as_str(), "demo");
            }
            other => panic!("wrong body: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_op_rejected() {
        let raw = json!({"id": 1, "op": "teleport", "data": {}});
        assert!(serde_json::from_value::<Request>(raw).is_err());
    }

    #[test]
    fn test_error_response_is_data() {
        let response = Response::error(9, "transport not found");
        assert_eq!(response.error_message(), Some("transport not found"));

        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(encoded["data"]["error"], "transport not found");

        let result = response.into_result();
        assert!(matches!(result, Err(Error::Remote(ref m)) if m == "transport not found"));
    }

    #[test]
    fn test_ok_response_passes_payload_through() {
        let response = Response::ok(2, json!(["p1", "p2"]));
        assert!(response.error_message().is_none());
        assert_eq!(response.into_result().unwrap(), json!(["p1", "p2"]));
    }
}
