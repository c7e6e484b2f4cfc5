//! Signaling server
//!
//! TCP accept loop, per-connection request dispatch, and configuration.

pub mod config;
pub mod connection;
pub mod listener;

pub use config::ServerConfig;
pub use connection::Connection;
pub use listener::SfuServer;
