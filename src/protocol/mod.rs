//! Signaling channel protocol
//!
//! A bidirectional request/response protocol over one persistent connection.
//! Frames are newline-terminated JSON; each request carries a correlation id
//! that the channel layer matches to exactly one response. Six operations
//! drive the registry and broker: `joinRoom`, `createTransport`,
//! `connectTransport`, `produce`, `getProducers`, `consume`.
//!
//! Errors never raise a distinct wire-level signal — they are data, an
//! `{"error": "<message>"}` payload the caller must check first.

pub mod framing;
pub mod message;

pub use framing::{write_frame, FrameReader, DEFAULT_MAX_FRAME_SIZE};
pub use message::{
    JoinedRoom, ProducerCreated, Request, RequestBody, Response, TransportConnected,
};
