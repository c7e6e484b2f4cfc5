//! Per-room state
//!
//! A room groups one shared capability set with the producers currently
//! publishing into it. Rooms are created lazily on first join and live for
//! the rest of the process.

use std::collections::HashMap;

use crate::engine::{MediaKind, ProducerId, RtpCapabilities};

/// A producer registered room-wide
#[derive(Debug, Clone)]
pub struct ProducerEntry {
    /// Engine-assigned producer id
    pub id: ProducerId,

    /// Media kind of the source
    pub kind: MediaKind,

    /// Session id of the connection that registered it
    pub owner_session: u64,
}

/// Entry for a single room in the registry
pub struct Room {
    /// Shared router capabilities, fixed at room creation
    pub capabilities: RtpCapabilities,

    /// Registered producers, keyed by engine-assigned id
    producers: HashMap<ProducerId, ProducerEntry>,

    /// Registration order, so listings are deterministic per room
    order: Vec<ProducerId>,
}

impl Room {
    /// Create an empty room with the shared capability set
    pub fn new(capabilities: RtpCapabilities) -> Self {
        Self {
            capabilities,
            producers: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Insert a producer; a re-registration under the same id replaces the
    /// entry but keeps its original position
    pub fn insert_producer(&mut self, entry: ProducerEntry) {
        if self.producers.insert(entry.id.clone(), entry.clone()).is_none() {
            self.order.push(entry.id);
        }
    }

    /// Remove a producer; returns the entry if it was present
    pub fn remove_producer(&mut self, id: &ProducerId) -> Option<ProducerEntry> {
        let removed = self.producers.remove(id);
        if removed.is_some() {
            self.order.retain(|p| p != id);
        }
        removed
    }

    /// Whether the room holds a producer with this id
    pub fn has_producer(&self, id: &ProducerId) -> bool {
        self.producers.contains_key(id)
    }

    /// Get a producer entry
    pub fn producer(&self, id: &ProducerId) -> Option<&ProducerEntry> {
        self.producers.get(id)
    }

    /// Snapshot of producer ids in registration order
    pub fn producer_ids(&self) -> Vec<ProducerId> {
        self.order.clone()
    }

    /// Number of registered producers
    pub fn producer_count(&self) -> usize {
        self.producers.len()
    }
}
