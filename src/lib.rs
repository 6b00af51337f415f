//! Relock - cooperative distributed locks on Redis
//!
//! Relock lets independent processes and hosts coordinate exclusive access to
//! a named resource through a shared Redis, with no central lock manager: the
//! store's optimistic transactions are the coordination substrate.
//!
//! # Architecture
//!
//! - [`lock`] - The lock state machine: acquire, release, extend, reclaim
//! - [`store`] - The key-value seam: a [`Store`] trait with Redis and
//!   in-memory implementations
//! - [`backoff`] - Bounded retry with exponential backoff
//! - [`errors`] - The crate error type
//!
//! # Correctness Invariants
//!
//! 1. Acquisition linearizes on a single atomic set-if-both-absent
//! 2. Release and stale reclaim delete only through an unchanged-snapshot
//!    transaction, so racing parties cannot delete a lock out from under a
//!    legitimate holder
//! 3. The two store keys of a lock are always written and deleted as a pair
//! 4. Expiration is lazy; stale records are reclaimed by whoever next
//!    contends for the key
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use relock::{Lock, MemoryStore};
//!
//! let store = MemoryStore::new();
//! let mut lock = Lock::new(store, "user-1");
//! let answer = lock.lock_with(Duration::from_secs(1), || 42)?;
//! assert_eq!(answer, 42);
//! # Ok::<(), relock::LockError>(())
//! ```
//!
//! Against a live Redis, swap the store:
//!
//! ```ignore
//! use relock::{Lock, RedisStore};
//!
//! let store = RedisStore::connect("redis://127.0.0.1/")?;
//! let mut lock = Lock::new(store, "user-1");
//! ```

pub mod backoff;
pub mod errors;
pub mod lock;
pub mod store;

pub use errors::LockError;
pub use lock::{
    default_owner, is_deleteable, is_expired, Lock, LockOptions, DEFAULT_ACQUIRE_TIMEOUT,
    DEFAULT_LIFE,
};
pub use store::{MemoryStore, RedisStore, Store, StoreError};
