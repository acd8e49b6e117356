//! Persistence layer: a backend-agnostic key to JSON-blob store plus the
//! error type shared by its implementations.

pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;
pub mod snapshot_store;
pub mod storage;
