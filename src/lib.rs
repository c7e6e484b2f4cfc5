//! # sfu-rs
//!
//! Session orchestration for one-to-many audio broadcast over a
//! selective-forwarding media router: one broadcaster publishes a single
//! audio track, any number of listeners consume it.
//!
//! The crate owns the state and ordering between client negotiation and the
//! media engine — rooms, producers, per-connection transports, and the
//! join → create transport → connect → produce/consume handshake replayed
//! on both sides of the signaling channel. The media plane itself (RTP,
//! ICE, DTLS, codecs) lives behind the [`MediaEngine`](engine::MediaEngine)
//! trait.
//!
//! ## Server
//!
//! ```no_run
//! use sfu_rs::engine::LoopbackEngine;
//! use sfu_rs::{ServerConfig, SfuServer};
//!
//! # async fn example() -> sfu_rs::error::Result<()> {
//! let server = SfuServer::new(ServerConfig::default(), LoopbackEngine::new());
//! server.run().await
//! # }
//! ```
//!
//! ## Broadcaster
//!
//! ```no_run
//! use sfu_rs::client::{Broadcaster, ClientConfig, StaticDevice};
//!
//! # async fn example() -> sfu_rs::error::Result<()> {
//! let config = ClientConfig::new("127.0.0.1:5001".parse().unwrap(), "poc_room");
//! let (mut broadcaster, _events) = Broadcaster::new(config, StaticDevice::opus());
//! let producer_id = broadcaster.run().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Listener
//!
//! ```no_run
//! use sfu_rs::client::{ClientConfig, Listener, StaticDevice};
//!
//! # async fn example() -> sfu_rs::error::Result<()> {
//! let config = ClientConfig::new("127.0.0.1:5001".parse().unwrap(), "poc_room");
//! let (mut listener, _events) = Listener::new(config, StaticDevice::opus());
//! let consumer = listener.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;

pub use client::{Broadcaster, ClientConfig, Listener};
pub use engine::{LoopbackEngine, MediaEngine};
pub use error::{Error, Result};
pub use registry::SessionRegistry;
pub use server::{ServerConfig, SfuServer};
