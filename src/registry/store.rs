//! Session registry implementation
//!
//! The process-wide mapping of room id to room state. Owned explicitly (no
//! global singleton) and shared by reference into the signaling layer.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::engine::{MediaKind, ProducerId, RoomId, RtpCapabilities};

use super::error::RegistryError;
use super::room::{ProducerEntry, Room};

/// Process-wide room/producer registry
///
/// Thread-safe via `RwLock`: one lock for the room map, one per room. A
/// producer registered under a room's write lock is visible to every reader
/// that acquires the lock afterwards, which is what keeps registration ahead
/// of external visibility.
pub struct SessionRegistry {
    /// Map of room id to room entry
    rooms: RwLock<HashMap<RoomId, Arc<RwLock<Room>>>>,

    /// Shared capability set handed to every room at creation
    capabilities: RtpCapabilities,
}

impl SessionRegistry {
    /// Create a registry around the engine's router capabilities
    pub fn new(capabilities: RtpCapabilities) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            capabilities,
        }
    }

    /// Join a room, creating it on first use
    ///
    /// Idempotent per room id: every join returns the same capability set.
    pub async fn join(&self, room_id: &RoomId) -> RtpCapabilities {
        {
            let rooms = self.rooms.read().await;
            if let Some(room_arc) = rooms.get(room_id) {
                return room_arc.read().await.capabilities.clone();
            }
        }

        let mut rooms = self.rooms.write().await;
        // A concurrent join may have created the room between the locks.
        let room_arc = rooms
            .entry(room_id.clone())
            .or_insert_with(|| {
                tracing::info!(room = %room_id, "Room created");
                Arc::new(RwLock::new(Room::new(self.capabilities.clone())))
            })
            .clone();
        drop(rooms);
        let capabilities = room_arc.read().await.capabilities.clone();
        capabilities
    }

    /// Register a producer into a room
    ///
    /// Fails with `RoomNotFound` if the room was never joined. Callers must
    /// complete this before exposing the producer id to any peer.
    pub async fn register_producer(
        &self,
        room_id: &RoomId,
        producer_id: ProducerId,
        kind: MediaKind,
        owner_session: u64,
    ) -> Result<(), RegistryError> {
        let rooms = self.rooms.read().await;
        let room_arc = rooms
            .get(room_id)
            .ok_or_else(|| RegistryError::RoomNotFound(room_id.clone()))?;

        let mut room = room_arc.write().await;
        room.insert_producer(ProducerEntry {
            id: producer_id.clone(),
            kind,
            owner_session,
        });

        tracing::info!(
            room = %room_id,
            producer = %producer_id,
            session_id = owner_session,
            producers = room.producer_count(),
            "Producer registered"
        );
        Ok(())
    }

    /// Snapshot of a room's producer ids in registration order
    ///
    /// An unknown or empty room yields an empty vec, not an error.
    pub async fn list_producers(&self, room_id: &RoomId) -> Vec<ProducerId> {
        let rooms = self.rooms.read().await;
        match rooms.get(room_id) {
            Some(room_arc) => room_arc.read().await.producer_ids(),
            None => Vec::new(),
        }
    }

    /// Whether a producer is registered in a room
    pub async fn has_producer(&self, room_id: &RoomId, producer_id: &ProducerId) -> bool {
        let rooms = self.rooms.read().await;
        match rooms.get(room_id) {
            Some(room_arc) => room_arc.read().await.has_producer(producer_id),
            None => false,
        }
    }

    /// Whether a room exists
    pub async fn has_room(&self, room_id: &RoomId) -> bool {
        self.rooms.read().await.contains_key(room_id)
    }

    /// Remove a producer from a room
    ///
    /// No-op when the room or producer is already gone; connection teardown
    /// calls this for every producer the connection registered.
    pub async fn remove_producer(&self, room_id: &RoomId, producer_id: &ProducerId) {
        let rooms = self.rooms.read().await;
        if let Some(room_arc) = rooms.get(room_id) {
            let mut room = room_arc.write().await;
            if room.remove_producer(producer_id).is_some() {
                tracing::info!(
                    room = %room_id,
                    producer = %producer_id,
                    producers = room.producer_count(),
                    "Producer removed"
                );
            }
        }
    }

    /// Number of producers currently registered in a room
    pub async fn producer_count(&self, room_id: &RoomId) -> usize {
        let rooms = self.rooms.read().await;
        match rooms.get(room_id) {
            Some(room_arc) => room_arc.read().await.producer_count(),
            None => 0,
        }
    }

    /// Total number of rooms
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(RtpCapabilities::new(json!({
            "codecs": [{"kind": "audio", "mimeType": "audio/opus"}]
        })))
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let registry = registry();
        let room = RoomId::new("demo");

        let first = registry.join(&room).await;
        let second = registry.join(&room).await;

        assert_eq!(first, second);
        assert_eq!(registry.room_count().await, 1);
    }

    #[tokio::test]
    async fn test_register_requires_room() {
        let registry = registry();
        let result = registry
            .register_producer(&RoomId::new("ghost"), ProducerId::new("p1"), MediaKind::Audio, 1)
            .await;
        assert!(matches!(result, Err(RegistryError::RoomNotFound(_))));
    }

    #[tokio::test]
    async fn test_registered_producer_is_listed() {
        let registry = registry();
        let room = RoomId::new("demo");
        registry.join(&room).await;

        registry
            .register_producer(&room, ProducerId::new("p1"), MediaKind::Audio, 1)
            .await
            .unwrap();

        let listed = registry.list_producers(&room).await;
        assert_eq!(listed, vec![ProducerId::new("p1")]);
        assert!(registry.has_producer(&room, &ProducerId::new("p1")).await);
    }

    #[tokio::test]
    async fn test_unknown_room_lists_empty() {
        let registry = registry();
        assert!(registry.list_producers(&RoomId::new("empty")).await.is_empty());
        assert!(!registry.has_producer(&RoomId::new("empty"), &ProducerId::new("p1")).await);
    }

    #[tokio::test]
    async fn test_remove_producer() {
        let registry = registry();
        let room = RoomId::new("demo");
        registry.join(&room).await;
        registry
            .register_producer(&room, ProducerId::new("p1"), MediaKind::Audio, 1)
            .await
            .unwrap();

        registry.remove_producer(&room, &ProducerId::new("p1")).await;
        assert!(registry.list_producers(&room).await.is_empty());

        // Room survives with no producers; it can still be joined.
        assert!(registry.has_room(&room).await);
        registry.remove_producer(&room, &ProducerId::new("p1")).await;
    }

    #[tokio::test]
    async fn test_concurrent_joins_create_one_room() {
        let registry = Arc::new(registry());
        let room = RoomId::new("demo");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            let room = room.clone();
            handles.push(tokio::spawn(async move { registry.join(&room).await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.room_count().await, 1);
    }
}
