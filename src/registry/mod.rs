//! Session registry
//!
//! Process-wide mapping of room to shared capabilities and registered
//! producers. In-memory only; lifetime is the process.
//!
//! The correctness-critical property lives here: a producer is registered
//! under its room's write lock before the produce response is sent, so a
//! listener that lists producers after a successful produce always sees it.

pub mod error;
pub mod room;
pub mod store;

pub use error::RegistryError;
pub use room::{ProducerEntry, Room};
pub use store::SessionRegistry;
