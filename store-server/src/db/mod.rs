//! Database layer
//!
//! Embedded redb document store. One table per aggregate plus the
//! provider-reference index and counters.

pub mod storage;

pub use storage::{StorageError, StorageResult, StorageStats, StoreStorage};
