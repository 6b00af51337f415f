//! store
//!
//! The key-value substrate a lock coordinates through.
//!
//! # Architecture
//!
//! The [`Store`] trait captures the four primitives the lock algorithm
//! needs: reads/writes, atomic set-if-all-absent, an optimistic watch, and
//! a transactional delete that commits only on an unchanged snapshot.
//!
//! # Modules
//!
//! - `traits`: the `Store` trait and [`StoreError`]
//! - [`redis`]: implementation over a live Redis connection
//! - [`memory`]: in-memory implementation for deterministic tests

pub mod memory;
pub mod redis;
pub mod traits;

pub use memory::MemoryStore;
pub use redis::RedisStore;
pub use traits::{Store, StoreError};
