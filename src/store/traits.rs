//! store::traits
//!
//! Store trait definition for the key-value substrate a lock coordinates
//! through.
//!
//! # Design
//!
//! The lock algorithm needs exactly four capabilities from a store:
//!
//! - plain reads and writes of string values,
//! - an atomic "set N keys only if all are currently absent" (the sole
//!   linearization point for acquisition),
//! - an optimistic watch over a set of keys,
//! - a transactional delete that commits only if no watched key changed
//!   since the watch began (the sole linearization point for release and
//!   stale-lock reclaim).
//!
//! This is the Redis WATCH/MULTI/EXEC model; a store with native
//! compare-and-swap can satisfy the same contract. Implementations are
//! connection-shaped: methods take `&mut self` because watch state lives on
//! the connection, and each `Lock` owns its own store handle.
//!
//! # Example
//!
//! ```
//! use relock::store::{MemoryStore, Store};
//!
//! let mut store = MemoryStore::new();
//! assert!(store.set_if_all_absent(&[("a", "1"), ("b", "2")])?);
//! // A second attempt fails: "a" already exists.
//! assert!(!store.set_if_all_absent(&[("a", "9"), ("c", "3")])?);
//! assert_eq!(store.get("a")?, Some("1".to_string()));
//! # Ok::<(), relock::StoreError>(())
//! ```

use thiserror::Error;

/// Errors from store operations.
///
/// The lock layer never retries these; they propagate to the caller
/// unchanged. Only lock contention is retried.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Could not reach the store (refused, dropped, I/O failure).
    #[error("store connection error: {0}")]
    Connection(String),

    /// The store rejected or failed a command.
    #[error("store command failed: {0}")]
    Command(String),
}

/// Key-value substrate with optimistic-transaction support.
///
/// See the [module docs](self) for the contract each method must honor.
pub trait Store {
    /// Read the current value of `key`, if present.
    fn get(&mut self, key: &str) -> Result<Option<String>, StoreError>;

    /// Unconditionally write `value` at `key`.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Atomically set every entry, but only if every key is currently
    /// absent. Returns `true` iff all keys were absent and are now set;
    /// on `false` nothing was written.
    fn set_if_all_absent(&mut self, entries: &[(&str, &str)]) -> Result<bool, StoreError>;

    /// Begin watching `keys` for modification. The next
    /// [`delete_if_unchanged`](Store::delete_if_unchanged) commits only if
    /// none of the watched keys changed in the meantime.
    fn watch(&mut self, keys: &[&str]) -> Result<(), StoreError>;

    /// Discard any active watch. Safe to call when nothing is watched,
    /// and safe to call after a transaction already consumed the watch.
    fn unwatch(&mut self) -> Result<(), StoreError>;

    /// Transactionally delete all `keys`. Returns `true` iff the
    /// transaction committed; `false` iff it aborted because a watched key
    /// changed since [`watch`](Store::watch). An aborted transaction
    /// deletes nothing. Consumes the active watch either way.
    fn delete_if_unchanged(&mut self, keys: &[&str]) -> Result<bool, StoreError>;
}
