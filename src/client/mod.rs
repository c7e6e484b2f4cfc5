//! Signaling client
//!
//! Client-side counterpart of the server: the signaling channel endpoint,
//! the local media device seam, and the two negotiation drivers
//! ([`Broadcaster`] publishes one audio track, [`Listener`] consumes one).

pub mod broadcaster;
pub mod config;
pub mod connector;
pub mod device;
pub mod listener;
pub mod negotiation;

pub use broadcaster::{BroadcastEvent, Broadcaster};
pub use config::ClientConfig;
pub use connector::SignalingClient;
pub use device::{MediaDevice, StaticDevice};
pub use listener::{ListenEvent, Listener};
pub use negotiation::{NegotiationPhase, NegotiationState};

#[cfg(test)]
pub(crate) mod testutil {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use tokio::net::TcpListener;

    use crate::engine::LoopbackEngine;
    use crate::server::{ServerConfig, SfuServer};

    /// Install a test-writer subscriber once; `RUST_LOG` controls the level.
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// Bind a loopback-engine server on an ephemeral port and serve it in
    /// the background.
    pub async fn spawn_server() -> (SocketAddr, Arc<SfuServer<LoopbackEngine>>) {
        init_tracing();
        let server = Arc::new(SfuServer::new(ServerConfig::default(), LoopbackEngine::new()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let serving = Arc::clone(&server);
        tokio::spawn(async move {
            let _ = serving.serve(listener).await;
        });

        (addr, server)
    }
}
